//! # Dispute Lifecycle
//!
//! A dispute is opened by a `dispute-open` rumor naming the order and the
//! three participants, then accumulates the decrypted thread until the
//! arbiter rules.
//!
//! ## Transition Graph
//!
//! ```text
//! Open ──record_ruling()──▶ Ruled ──close()──▶ Closed
//! ```
//!
//! Only the arbiter can move a dispute out of `Open`, and the ruling is
//! final: a second ruling is rejected with
//! [`ArbitrationError::AlreadyRuled`]. A ruling can also be learned from
//! the stream (the public marker or the arbiter's own ruling message), in
//! which case the observations are merged into one [`Ruling`]. Every
//! transition is appended to the dispute's transition log.
//!
//! ## Opening event
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `["order", orderId]` | disputed order (required) |
//! | `["p", pubkey, "buyer"]` | buyer (required) |
//! | `["p", pubkey, "seller"]` | seller (required) |
//! | `["p", pubkey, "arbiter"]` | arbiter (required) |
//!
//! The dispute id is the opening rumor's id.

use std::collections::BTreeMap;

use bazaar_core::{EventId, EventKind, OrderId, TagError, UnixTimestamp};
use bazaar_crypto::Ed25519PublicKey;
use bazaar_transport::Rumor;
use serde::{Deserialize, Serialize};

use crate::ecash::EcashProof;
use crate::error::ArbitrationError;

const OPEN_EVENT: &str = "dispute-open";

// ── Dispute State ──────────────────────────────────────────────────────

/// The lifecycle state of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisputeState {
    /// Parties and arbiter are exchanging messages.
    Open,
    /// The arbiter has issued a ruling.
    Ruled,
    /// Closed after the ruling (terminal).
    Closed,
}

impl DisputeState {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ruled => "ruled",
            Self::Closed => "closed",
        }
    }

    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Valid target states from this state.
    pub fn valid_transitions(&self) -> &'static [DisputeState] {
        match self {
            Self::Open => &[Self::Ruled],
            Self::Ruled => &[Self::Closed],
            Self::Closed => &[],
        }
    }
}

impl std::fmt::Display for DisputeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Parties ────────────────────────────────────────────────────────────

/// The side a ruling favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    /// The buyer.
    Buyer,
    /// The seller.
    Seller,
}

impl Party {
    /// Wire name, used in the `resolution` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }

    /// Prefix of the ruling message body.
    pub fn ruling_prefix(&self) -> &'static str {
        match self {
            Self::Buyer => "RULING_FOR_BUYER",
            Self::Seller => "RULING_FOR_SELLER",
        }
    }

    /// The other side.
    pub fn opponent(&self) -> Self {
        match self {
            Self::Buyer => Self::Seller,
            Self::Seller => Self::Buyer,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Party {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            other => Err(format!("unknown party {other:?}; expected buyer or seller")),
        }
    }
}

/// Who takes part in a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    /// Buyer.
    pub buyer: Ed25519PublicKey,
    /// Seller.
    pub seller: Ed25519PublicKey,
    /// Designated arbiter, the only key that may rule.
    pub arbiter: Ed25519PublicKey,
}

impl Participants {
    /// Public key of `party`.
    pub fn of(&self, party: Party) -> Ed25519PublicKey {
        match party {
            Party::Buyer => self.buyer,
            Party::Seller => self.seller,
        }
    }

    /// Whether `pk` is one of the three participants.
    pub fn includes(&self, pk: &Ed25519PublicKey) -> bool {
        [self.buyer, self.seller, self.arbiter].contains(pk)
    }
}

// ── Records ────────────────────────────────────────────────────────────

/// One entry in the append-only transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before.
    pub from_state: DisputeState,
    /// State after.
    pub to_state: DisputeState,
    /// When the transition happened.
    pub at: UnixTimestamp,
    /// Event that authorized it, when there is one.
    pub reference: Option<EventId>,
}

/// The arbiter's decision, as recorded on the dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruling {
    /// Winning side.
    pub for_party: Party,
    /// When the ruling was issued.
    pub issued_at: UnixTimestamp,
    /// Id of the public resolution marker, once known.
    pub marker: Option<EventId>,
    /// Id of the private ruling rumor, once delivered or observed.
    pub ruling_rumor: Option<EventId>,
}

impl Ruling {
    /// Whether the private ruling is known to have reached the winner.
    pub fn is_delivered(&self) -> bool {
        self.ruling_rumor.is_some()
    }
}

// ── The Dispute ────────────────────────────────────────────────────────

/// A dispute over one order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispute {
    id: EventId,
    order_id: OrderId,
    participants: Participants,
    opened_by: Ed25519PublicKey,
    opened_at: UnixTimestamp,
    state: DisputeState,
    escrow_token: Option<Vec<EcashProof>>,
    messages: BTreeMap<(UnixTimestamp, EventId), Rumor>,
    ruling: Option<Ruling>,
    transition_log: Vec<TransitionRecord>,
}

impl Dispute {
    /// Open a dispute from a `dispute-open` rumor.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::MalformedTag`] when the rumor is of another kind,
    /// lacks the `order` tag, or does not name all three participants.
    pub fn open(rumor: &Rumor) -> Result<Self, ArbitrationError> {
        if rumor.kind() != EventKind::DisputeOpen {
            return Err(TagError::invalid(
                "kind",
                rumor.kind().to_string(),
                "not a dispute-open event",
            )
            .into());
        }
        let tags = rumor.tags();
        let raw_order = tags
            .value("order")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TagError::missing(OPEN_EVENT, "order"))?;
        let order_id = OrderId::new(raw_order)
            .map_err(|e| TagError::invalid("order", raw_order, e.to_string()))?;

        let mut buyer = None;
        let mut seller = None;
        let mut arbiter = None;
        for tag in tags.all("p") {
            let (Some(raw), Some(role)) = (tag.value(), tag.get(2)) else {
                continue;
            };
            let slot = match role {
                "buyer" => &mut buyer,
                "seller" => &mut seller,
                "arbiter" => &mut arbiter,
                _ => continue,
            };
            if slot.is_none() {
                let pk = Ed25519PublicKey::from_hex(raw)
                    .map_err(|e| TagError::invalid("p", raw, e.to_string()))?;
                *slot = Some(pk);
            }
        }
        let participants = Participants {
            buyer: buyer.ok_or_else(|| TagError::missing(OPEN_EVENT, "p:buyer"))?,
            seller: seller.ok_or_else(|| TagError::missing(OPEN_EVENT, "p:seller"))?,
            arbiter: arbiter.ok_or_else(|| TagError::missing(OPEN_EVENT, "p:arbiter"))?,
        };

        let mut messages = BTreeMap::new();
        messages.insert((rumor.created_at(), rumor.id().clone()), rumor.clone());
        Ok(Self {
            id: rumor.id().clone(),
            order_id,
            participants,
            opened_by: *rumor.author(),
            opened_at: rumor.created_at(),
            state: DisputeState::Open,
            escrow_token: None,
            messages,
            ruling: None,
            transition_log: Vec::new(),
        })
    }

    /// Dispute id (the opening rumor's id).
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Disputed order.
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Buyer, seller, and arbiter.
    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    /// Author of the opening event.
    pub fn opened_by(&self) -> &Ed25519PublicKey {
        &self.opened_by
    }

    /// Timestamp of the opening event.
    pub fn opened_at(&self) -> UnixTimestamp {
        self.opened_at
    }

    /// Current state.
    pub fn state(&self) -> DisputeState {
        self.state
    }

    /// Escrowed proofs, once located.
    pub fn escrow_token(&self) -> Option<&[EcashProof]> {
        self.escrow_token.as_deref()
    }

    /// The ruling, once issued.
    pub fn ruling(&self) -> Option<&Ruling> {
        self.ruling.as_ref()
    }

    /// Append-only transition history.
    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    /// Thread messages ordered by `(created_at, id)`, opening event included.
    pub fn messages(&self) -> impl Iterator<Item = &Rumor> + '_ {
        self.messages.values()
    }

    /// Number of thread messages.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Add a thread message. Returns `false` for a duplicate.
    pub fn add_message(&mut self, rumor: &Rumor) -> bool {
        let key = (rumor.created_at(), rumor.id().clone());
        if self.messages.contains_key(&key) {
            return false;
        }
        self.messages.insert(key, rumor.clone());
        true
    }

    /// Record the escrowed proofs. The first value sticks; later calls
    /// return `false` and change nothing.
    pub fn set_escrow_token(&mut self, proofs: Vec<EcashProof>) -> bool {
        if self.escrow_token.is_some() {
            return false;
        }
        self.escrow_token = Some(proofs);
        true
    }

    /// Transition Open → Ruled.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::AlreadyRuled`] unless the dispute is open.
    pub fn record_ruling(&mut self, ruling: Ruling) -> Result<(), ArbitrationError> {
        if self.state != DisputeState::Open {
            return Err(ArbitrationError::AlreadyRuled {
                dispute_id: self.id.clone(),
            });
        }
        let at = ruling.issued_at;
        let reference = ruling.marker.clone().or_else(|| ruling.ruling_rumor.clone());
        self.transition(DisputeState::Ruled, at, reference)?;
        self.ruling = Some(ruling);
        Ok(())
    }

    /// Merge an observed ruling.
    ///
    /// An open dispute becomes ruled. A ruled or closed dispute fills in
    /// whichever ids it was missing. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::AlreadyRuled`] when the observation favors the
    /// other party. The recorded ruling is kept.
    pub fn observe_ruling(&mut self, observed: Ruling) -> Result<bool, ArbitrationError> {
        let Some(current) = self.ruling.as_mut() else {
            self.record_ruling(observed)?;
            return Ok(true);
        };
        if current.for_party != observed.for_party {
            return Err(ArbitrationError::AlreadyRuled {
                dispute_id: self.id.clone(),
            });
        }
        let mut changed = false;
        if current.marker.is_none() && observed.marker.is_some() {
            current.marker = observed.marker;
            changed = true;
        }
        if current.ruling_rumor.is_none() && observed.ruling_rumor.is_some() {
            current.ruling_rumor = observed.ruling_rumor;
            changed = true;
        }
        Ok(changed)
    }

    /// Transition Ruled → Closed.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::InvalidTransition`] unless the dispute is ruled.
    pub fn close(&mut self, at: UnixTimestamp) -> Result<(), ArbitrationError> {
        self.transition(DisputeState::Closed, at, None)
    }

    fn transition(
        &mut self,
        to: DisputeState,
        at: UnixTimestamp,
        reference: Option<EventId>,
    ) -> Result<(), ArbitrationError> {
        if !self.state.valid_transitions().contains(&to) {
            return Err(ArbitrationError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.transition_log.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            at,
            reference,
        });
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{Tag, Tags};
    use bazaar_crypto::Ed25519KeyPair;

    struct Cast {
        buyer: Ed25519KeyPair,
        seller: Ed25519KeyPair,
        arbiter: Ed25519KeyPair,
    }

    fn cast() -> Cast {
        Cast {
            buyer: Ed25519KeyPair::generate(),
            seller: Ed25519KeyPair::generate(),
            arbiter: Ed25519KeyPair::generate(),
        }
    }

    fn opening(c: &Cast) -> Rumor {
        let tags = Tags::new()
            .with(Tag::pair("order", "o1"))
            .with(Tag::new("p", [c.buyer.public_key().to_hex(), "buyer".into()]))
            .with(Tag::new("p", [c.seller.public_key().to_hex(), "seller".into()]))
            .with(Tag::new("p", [c.arbiter.public_key().to_hex(), "arbiter".into()]));
        Rumor::new(
            c.buyer.public_key(),
            UnixTimestamp::from_secs(100),
            EventKind::DisputeOpen,
            tags,
            "item never arrived",
        )
        .unwrap()
    }

    fn ruling(at: u64) -> Ruling {
        Ruling {
            for_party: Party::Buyer,
            issued_at: UnixTimestamp::from_secs(at),
            marker: Some(EventId::from_bytes(&[2; 32])),
            ruling_rumor: Some(EventId::from_bytes(&[1; 32])),
        }
    }

    #[test]
    fn opens_with_participants_and_thread() {
        let c = cast();
        let r = opening(&c);
        let d = Dispute::open(&r).unwrap();
        assert_eq!(d.id(), r.id());
        assert_eq!(d.order_id().as_str(), "o1");
        assert_eq!(d.state(), DisputeState::Open);
        assert_eq!(d.participants().arbiter, c.arbiter.public_key());
        assert_eq!(d.participants().of(Party::Seller), c.seller.public_key());
        assert_eq!(d.message_count(), 1);
        assert!(d.escrow_token().is_none());
    }

    #[test]
    fn missing_arbiter_is_malformed() {
        let c = cast();
        let tags = Tags::new()
            .with(Tag::pair("order", "o1"))
            .with(Tag::new("p", [c.buyer.public_key().to_hex(), "buyer".into()]))
            .with(Tag::new("p", [c.seller.public_key().to_hex(), "seller".into()]));
        let r = Rumor::new(
            c.buyer.public_key(),
            UnixTimestamp::from_secs(1),
            EventKind::DisputeOpen,
            tags,
            "",
        )
        .unwrap();
        let err = Dispute::open(&r).unwrap_err();
        match err {
            ArbitrationError::MalformedTag(TagError::Missing { tag, .. }) => {
                assert_eq!(tag, "p:arbiter")
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn messages_are_ordered_and_deduplicated() {
        let c = cast();
        let mut d = Dispute::open(&opening(&c)).unwrap();
        let later = Rumor::new(
            c.seller.public_key(),
            UnixTimestamp::from_secs(300),
            EventKind::RumorDm,
            Tags::new(),
            "tracking attached",
        )
        .unwrap();
        let earlier = Rumor::new(
            c.arbiter.public_key(),
            UnixTimestamp::from_secs(200),
            EventKind::RumorDm,
            Tags::new(),
            "please share tracking",
        )
        .unwrap();
        assert!(d.add_message(&later));
        assert!(d.add_message(&earlier));
        assert!(!d.add_message(&later));
        let times: Vec<u64> = d.messages().map(|m| m.created_at().as_secs()).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn escrow_token_is_set_once() {
        let c = cast();
        let mut d = Dispute::open(&opening(&c)).unwrap();
        let p = EcashProof {
            id: "k".into(),
            amount: 1,
            secret: "s".into(),
            c: "c".into(),
        };
        assert!(d.set_escrow_token(vec![p.clone()]));
        assert!(!d.set_escrow_token(Vec::new()));
        assert_eq!(d.escrow_token(), Some(&[p][..]));
    }

    #[test]
    fn ruling_is_final_and_logged() {
        let c = cast();
        let mut d = Dispute::open(&opening(&c)).unwrap();
        assert!(matches!(
            d.close(UnixTimestamp::from_secs(150)),
            Err(ArbitrationError::InvalidTransition { .. })
        ));

        d.record_ruling(ruling(200)).unwrap();
        assert_eq!(d.state(), DisputeState::Ruled);
        assert!(matches!(
            d.record_ruling(ruling(201)),
            Err(ArbitrationError::AlreadyRuled { .. })
        ));
        assert_eq!(d.ruling().unwrap().issued_at.as_secs(), 200);

        d.close(UnixTimestamp::from_secs(300)).unwrap();
        assert!(d.state().is_terminal());
        let path: Vec<_> = d
            .transition_log()
            .iter()
            .map(|t| (t.from_state, t.to_state))
            .collect();
        assert_eq!(
            path,
            vec![
                (DisputeState::Open, DisputeState::Ruled),
                (DisputeState::Ruled, DisputeState::Closed)
            ]
        );
    }

    #[test]
    fn observed_rulings_merge_and_conflicts_are_refused() {
        let c = cast();
        let mut d = Dispute::open(&opening(&c)).unwrap();
        let from_marker = Ruling {
            ruling_rumor: None,
            ..ruling(200)
        };
        assert!(d.observe_ruling(from_marker.clone()).unwrap());
        assert_eq!(d.state(), DisputeState::Ruled);
        assert!(!d.ruling().unwrap().is_delivered());
        assert!(!d.observe_ruling(from_marker).unwrap());

        let from_rumor = Ruling {
            marker: None,
            ..ruling(200)
        };
        assert!(d.observe_ruling(from_rumor).unwrap());
        assert!(d.ruling().unwrap().is_delivered());

        let other_side = Ruling {
            for_party: Party::Seller,
            ..ruling(300)
        };
        assert!(matches!(
            d.observe_ruling(other_side),
            Err(ArbitrationError::AlreadyRuled { .. })
        ));
        assert_eq!(d.ruling().unwrap().for_party, Party::Buyer);
        assert_eq!(d.transition_log().len(), 1);
    }

    #[test]
    fn party_parsing() {
        assert_eq!("Buyer".parse::<Party>().unwrap(), Party::Buyer);
        assert_eq!(Party::Seller.opponent(), Party::Buyer);
        assert!("arbiter".parse::<Party>().is_err());
    }
}
