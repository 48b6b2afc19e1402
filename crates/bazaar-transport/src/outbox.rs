//! # Outbound Fan-Out
//!
//! One logical message becomes one envelope per reader. With `self_copy`
//! enabled the sender also receives an envelope, so every device holding the
//! sender's key sees the conversation from the relay alone. Each envelope has
//! its own seal and its own ephemeral key.

use bazaar_core::EventId;
use bazaar_crypto::{Ed25519KeyPair, Ed25519PublicKey, EphemeralKeyProvider};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::config::WrapPolicy;
use crate::error::TransportError;
use crate::event::{Rumor, SignedEvent};
use crate::relay::Transport;
use crate::seal::seal;
use crate::wrap::wrap;

/// Envelopes published for one logical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Id of the rumor that was sent.
    pub rumor_id: EventId,
    /// Ids of the published envelopes, recipient copy first.
    pub envelope_ids: Vec<EventId>,
}

/// Seals, wraps, and publishes outgoing rumors.
#[derive(Debug, Clone)]
pub struct Outbox {
    policy: WrapPolicy,
    self_copy: bool,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(WrapPolicy::default())
    }
}

impl Outbox {
    /// Outbox with the given wrap policy and self-copies enabled.
    pub fn new(policy: WrapPolicy) -> Self {
        Self {
            policy,
            self_copy: true,
        }
    }

    /// Enable or disable the sender's own copy.
    pub fn with_self_copy(mut self, self_copy: bool) -> Self {
        self.self_copy = self_copy;
        self
    }

    /// Wrap policy in effect.
    pub fn policy(&self) -> &WrapPolicy {
        &self.policy
    }

    /// Build the envelopes for `rumor` without publishing them.
    ///
    /// # Errors
    ///
    /// [`TransportError::AuthorMismatch`] when `sender` did not author the
    /// rumor; any sealing or wrapping failure.
    pub fn envelopes<R: RngCore + CryptoRng>(
        &self,
        keys: &mut EphemeralKeyProvider<R>,
        rumor: &Rumor,
        sender: &Ed25519KeyPair,
        recipient: &Ed25519PublicKey,
    ) -> Result<Vec<SignedEvent>, TransportError> {
        let sender_pub = sender.public_key();
        if rumor.author() != &sender_pub {
            return Err(TransportError::AuthorMismatch {
                author: rumor.author().to_hex(),
                sender: sender_pub.to_hex(),
            });
        }

        let mut readers = vec![*recipient];
        if self.self_copy && *recipient != sender_pub {
            readers.push(sender_pub);
        }

        readers
            .iter()
            .map(|reader| -> Result<SignedEvent, TransportError> {
                let sealed = seal(rumor, sender, reader)?;
                let ephemeral = keys.next_key()?;
                Ok(wrap(&sealed, ephemeral, reader, &self.policy)?.into_event())
            })
            .collect()
    }

    /// Build and publish the envelopes for `rumor`.
    pub fn send<T, R>(
        &self,
        transport: &T,
        keys: &mut EphemeralKeyProvider<R>,
        rumor: &Rumor,
        sender: &Ed25519KeyPair,
        recipient: &Ed25519PublicKey,
    ) -> Result<SendReceipt, TransportError>
    where
        T: Transport + ?Sized,
        R: RngCore + CryptoRng,
    {
        let envelopes = self.envelopes(keys, rumor, sender, recipient)?;
        let mut envelope_ids = Vec::with_capacity(envelopes.len());
        for envelope in &envelopes {
            transport.publish(envelope)?;
            envelope_ids.push(envelope.id.clone());
        }
        debug!(
            rumor = %rumor.id(),
            recipient = %recipient,
            envelopes = envelope_ids.len(),
            "sent gift-wrapped message"
        );
        Ok(SendReceipt {
            rumor_id: rumor.id().clone(),
            envelope_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{EventFilter, MemoryRelay};
    use crate::unwrap::unwrap;
    use bazaar_core::{EventKind, Tags, UnixTimestamp};

    fn dm(author: &Ed25519KeyPair) -> Rumor {
        Rumor::new(
            author.public_key(),
            UnixTimestamp::now(),
            EventKind::RumorDm,
            Tags::new(),
            "ping",
        )
        .unwrap()
    }

    #[test]
    fn send_publishes_recipient_and_self_copy() {
        let relay = MemoryRelay::new();
        let mut keys = EphemeralKeyProvider::new();
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let rumor = dm(&alice);

        let receipt = Outbox::default()
            .send(&relay, &mut keys, &rumor, &alice, &bob.public_key())
            .unwrap();
        assert_eq!(receipt.envelope_ids.len(), 2);
        assert_eq!(keys.issued_count(), 2);

        let bob_inbox = relay.fetch(&EventFilter::inbox(bob.public_key())).unwrap();
        assert_eq!(bob_inbox.len(), 1);
        assert_eq!(unwrap(&bob_inbox[0], &bob), Some(rumor.clone()));

        let alice_inbox = relay.fetch(&EventFilter::inbox(alice.public_key())).unwrap();
        assert_eq!(alice_inbox.len(), 1);
        assert_eq!(unwrap(&alice_inbox[0], &alice), Some(rumor));

        // Envelopes are independent: neither party can open the other's copy.
        assert_eq!(unwrap(&alice_inbox[0], &bob), None);
        assert_ne!(bob_inbox[0].pubkey, alice_inbox[0].pubkey);
    }

    #[test]
    fn self_copy_disabled_sends_one_envelope() {
        let relay = MemoryRelay::new();
        let mut keys = EphemeralKeyProvider::new();
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let receipt = Outbox::default()
            .with_self_copy(false)
            .send(&relay, &mut keys, &dm(&alice), &alice, &bob.public_key())
            .unwrap();
        assert_eq!(receipt.envelope_ids.len(), 1);
        assert_eq!(relay.len(), 1);
    }

    #[test]
    fn note_to_self_is_not_doubled() {
        let mut keys = EphemeralKeyProvider::new();
        let alice = Ed25519KeyPair::generate();
        let envs = Outbox::default()
            .envelopes(&mut keys, &dm(&alice), &alice, &alice.public_key())
            .unwrap();
        assert_eq!(envs.len(), 1);
    }

    #[test]
    fn sending_someone_elses_rumor_is_refused() {
        let mut keys = EphemeralKeyProvider::new();
        let alice = Ed25519KeyPair::generate();
        let mallory = Ed25519KeyPair::generate();
        let err = Outbox::default()
            .envelopes(&mut keys, &dm(&alice), &mallory, &alice.public_key())
            .unwrap_err();
        assert!(matches!(err, TransportError::AuthorMismatch { .. }));
        assert_eq!(keys.issued_count(), 0);
    }
}
