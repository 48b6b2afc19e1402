//! # Relay Transport
//!
//! The relay network is an external collaborator: it stores and forwards
//! opaque events with no access control. The core only needs two
//! operations, captured by [`Transport`]. Which relays to use, retries, and
//! timeouts are the implementor's concern.

use std::collections::HashSet;

use bazaar_core::{EventId, EventKind, UnixTimestamp};
use bazaar_crypto::Ed25519PublicKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::event::SignedEvent;

/// Publish/fetch interface to the relay network.
pub trait Transport: Send + Sync {
    /// Publish an event. Publishing an event the relay already holds succeeds.
    fn publish(&self, event: &SignedEvent) -> Result<(), TransportError>;

    /// Fetch every stored event matching `filter`.
    fn fetch(&self, filter: &EventFilter) -> Result<Vec<SignedEvent>, TransportError>;
}

/// Subscription filter. Empty lists match everything; populated lists match
/// any of their entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Accepted kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<EventKind>,
    /// Accepted signers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Ed25519PublicKey>,
    /// Accepted `p`-tag recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<Ed25519PublicKey>,
    /// Minimum `created_at`, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<UnixTimestamp>,
}

impl EventFilter {
    /// Filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gift wraps addressed to `recipient`: the usual inbox subscription.
    pub fn inbox(recipient: Ed25519PublicKey) -> Self {
        Self::new().kind(EventKind::Wrap).recipient(recipient)
    }

    /// Add an accepted kind.
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Add an accepted author.
    pub fn author(mut self, author: Ed25519PublicKey) -> Self {
        self.authors.push(author);
        self
    }

    /// Add an accepted `p`-tag recipient.
    pub fn recipient(mut self, recipient: Ed25519PublicKey) -> Self {
        self.recipients.push(recipient);
        self
    }

    /// Only events created at or after `since`.
    pub fn since(mut self, since: UnixTimestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// Whether `event` passes this filter.
    pub fn matches(&self, event: &SignedEvent) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&event.pubkey) {
            return false;
        }
        if !self.recipients.is_empty()
            && !event.recipients().any(|p| self.recipients.contains(&p))
        {
            return false;
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        true
    }
}

#[derive(Default)]
struct RelayState {
    events: Vec<SignedEvent>,
    ids: HashSet<EventId>,
}

/// In-process relay. Verifies events on publish, de-duplicates by id, and
/// returns matches in arrival order.
#[derive(Default)]
pub struct MemoryRelay {
    state: RwLock<RelayState>,
}

impl MemoryRelay {
    /// Empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct events stored.
    pub fn len(&self) -> usize {
        self.state.read().events.len()
    }

    /// True when nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.state.read().events.is_empty()
    }

    /// Snapshot of every stored event.
    pub fn events(&self) -> Vec<SignedEvent> {
        self.state.read().events.clone()
    }
}

impl std::fmt::Debug for MemoryRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRelay")
            .field("events", &self.len())
            .finish()
    }
}

impl Transport for MemoryRelay {
    fn publish(&self, event: &SignedEvent) -> Result<(), TransportError> {
        event.verify().map_err(|e| TransportError::Rejected {
            id: event.id.to_string(),
            reason: e.to_string(),
        })?;
        let mut state = self.state.write();
        if state.ids.insert(event.id.clone()) {
            state.events.push(event.clone());
        } else {
            debug!(id = %event.id, "duplicate publish ignored");
        }
        Ok(())
    }

    fn fetch(&self, filter: &EventFilter) -> Result<Vec<SignedEvent>, TransportError> {
        let state = self.state.read();
        Ok(state
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{Tag, Tags};
    use bazaar_crypto::Ed25519KeyPair;

    fn event(signer: &Ed25519KeyPair, kind: EventKind, at: u64, p: Option<&Ed25519PublicKey>) -> SignedEvent {
        let mut tags = Tags::new();
        if let Some(p) = p {
            tags.push(Tag::pair("p", p.to_hex()));
        }
        SignedEvent::sign(signer, UnixTimestamp::from_secs(at), kind, tags, "").unwrap()
    }

    #[test]
    fn publish_dedupes_by_id() {
        let relay = MemoryRelay::new();
        let kp = Ed25519KeyPair::generate();
        let ev = event(&kp, EventKind::Wrap, 10, None);
        relay.publish(&ev).unwrap();
        relay.publish(&ev).unwrap();
        assert_eq!(relay.len(), 1);
    }

    #[test]
    fn publish_rejects_bad_signature() {
        let relay = MemoryRelay::new();
        let kp = Ed25519KeyPair::generate();
        let mut ev = event(&kp, EventKind::Wrap, 10, None);
        ev.content = "changed".into();
        assert!(matches!(
            relay.publish(&ev),
            Err(TransportError::Rejected { .. })
        ));
        assert!(relay.is_empty());
    }

    #[test]
    fn filters_by_kind_author_recipient_and_since() {
        let relay = MemoryRelay::new();
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let carol = Ed25519KeyPair::generate().public_key();

        let to_bob = event(&alice, EventKind::Wrap, 100, Some(&bob.public_key()));
        let to_carol = event(&alice, EventKind::Wrap, 200, Some(&carol));
        let marker = event(&bob, EventKind::DisputeResolution, 300, None);
        for e in [&to_bob, &to_carol, &marker] {
            relay.publish(e).unwrap();
        }

        let inbox = relay.fetch(&EventFilter::inbox(bob.public_key())).unwrap();
        assert_eq!(inbox, vec![to_bob.clone()]);

        let by_bob = relay
            .fetch(&EventFilter::new().author(bob.public_key()))
            .unwrap();
        assert_eq!(by_bob, vec![marker.clone()]);

        let recent = relay
            .fetch(&EventFilter::new().since(UnixTimestamp::from_secs(200)))
            .unwrap();
        assert_eq!(recent, vec![to_carol, marker]);

        assert_eq!(relay.fetch(&EventFilter::new()).unwrap().len(), 3);
    }
}
