//! # Dispute Manager
//!
//! Groups decrypted rumors into dispute threads and drives the arbiter's
//! ruling.
//!
//! ## Thread routing
//!
//! A `dispute-open` rumor creates a dispute. Any other rumor joins a thread
//! when it references the dispute with an `e` tag, or when it carries the
//! `dispute-message` subject and the disputed order's `order` tag. Messages
//! that arrive before their opening event are held and attached when it
//! shows up, so the resulting threads do not depend on delivery order.
//!
//! Rulings are rebuilt from the stream too: a `dispute-resolution` marker
//! signed by the dispute's arbiter, or an arbiter-authored
//! `RULING_FOR_<PARTY>:` message in the thread, moves the dispute to
//! `Ruled`. A fresh manager fed the relay history therefore refuses a
//! second ruling just like the one that issued the first.
//!
//! ## Ruling
//!
//! [`DisputeManager::rule`] runs entirely under the dispute's entry lock:
//!
//! 1. Locate the escrow and sign it.
//! 2. Publish the public marker, which carries the outcome but not the
//!    share. If this fails nothing has been released and the dispute stays
//!    open.
//! 3. Record the ruling. From here on only the recorded party can be served.
//! 4. Deliver the share privately to the winner. A failure here returns
//!    [`ArbitrationError::DeliveryPending`]; ruling again for the same party
//!    resends the identical message.

use std::collections::HashMap;

use bazaar_core::{EventId, EventKind, OrderId, Subject, Tag, TagError, Tags, UnixTimestamp};
use bazaar_crypto::{Ed25519KeyPair, EphemeralKeyProvider};
use bazaar_state::QualifyingMessage;
use bazaar_transport::{Outbox, Rumor, SendReceipt, SignedEvent, Transport, TransportError};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::dispute::{Dispute, DisputeState, Participants, Party, Ruling};
use crate::ecash::{EcashProof, EcashToken};
use crate::error::ArbitrationError;
use crate::signer::{sign_partial, RedemptionShare};

/// Result of routing one rumor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisputeIngest {
    /// A new dispute was opened.
    Opened(EventId),
    /// The rumor joined one or more existing threads.
    Appended(Vec<EventId>),
    /// Already known.
    Duplicate,
    /// Refers to a dispute not seen yet; held until it opens.
    Held,
    /// Established the ruling of an existing dispute.
    Ruled(EventId),
    /// Not dispute traffic.
    Ignored,
}

/// What a successful ruling produced.
#[derive(Debug, Clone)]
pub struct RulingReceipt {
    /// The dispute.
    pub dispute_id: EventId,
    /// Winning side.
    pub for_party: Party,
    /// The signed share delivered to the winner.
    pub share: RedemptionShare,
    /// Envelopes carrying the private ruling.
    pub delivery: SendReceipt,
    /// The public resolution marker.
    pub marker: SignedEvent,
}

/// Collaborators a ruling publishes through.
pub struct RulingContext<'a, T: ?Sized, R> {
    /// Relay for the marker and the gift-wrapped delivery.
    pub transport: &'a T,
    /// Source of the envelopes' single-use signing keys.
    pub keys: &'a mut EphemeralKeyProvider<R>,
    /// Wrap policy and self-copy setting for the delivery.
    pub outbox: &'a Outbox,
}

impl<'a, T: ?Sized, R> RulingContext<'a, T, R> {
    /// Bundle the collaborators.
    pub fn new(
        transport: &'a T,
        keys: &'a mut EphemeralKeyProvider<R>,
        outbox: &'a Outbox,
    ) -> Self {
        Self {
            transport,
            keys,
            outbox,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ThreadRef {
    Dispute(EventId),
    Order(OrderId),
}

#[derive(Debug, Default)]
struct Routing {
    by_order: HashMap<OrderId, Vec<EventId>>,
    held: HashMap<ThreadRef, Vec<Rumor>>,
    held_markers: HashMap<EventId, Vec<SignedEvent>>,
}

/// Concurrent store of disputes keyed by dispute id.
#[derive(Debug, Default)]
pub struct DisputeManager {
    disputes: DashMap<EventId, Dispute>,
    routing: Mutex<Routing>,
}

impl DisputeManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one rumor.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::MalformedTag`] for a malformed `dispute-open`
    /// event. Nothing is stored in that case.
    pub fn ingest(&self, rumor: &Rumor) -> Result<DisputeIngest, ArbitrationError> {
        if rumor.kind() == EventKind::DisputeOpen {
            return self.open(rumor);
        }

        let refs = thread_refs(rumor);
        if refs.is_empty() {
            return Ok(DisputeIngest::Ignored);
        }

        let targets = {
            let mut routing = self.routing.lock();
            let mut targets: Vec<EventId> = Vec::new();
            for r in &refs {
                match r {
                    ThreadRef::Dispute(id) if self.disputes.contains_key(id) => {
                        targets.push(id.clone())
                    }
                    ThreadRef::Order(order) => {
                        if let Some(ids) = routing.by_order.get(order) {
                            targets.extend(ids.iter().cloned());
                        }
                    }
                    ThreadRef::Dispute(_) => {}
                }
            }
            targets.sort();
            targets.dedup();
            if targets.is_empty() {
                for r in refs {
                    let held = routing.held.entry(r).or_default();
                    if held.iter().any(|h| h.id() == rumor.id()) {
                        return Ok(DisputeIngest::Duplicate);
                    }
                    held.push(rumor.clone());
                }
                debug!(rumor = %rumor.id(), "holding dispute message for unseen dispute");
                return Ok(DisputeIngest::Held);
            }
            targets
        };

        let mut appended = Vec::new();
        let mut ruled = None;
        for id in targets {
            if let Some(mut dispute) = self.disputes.get_mut(&id) {
                let (added, ruling) = absorb(&mut dispute, rumor);
                if added {
                    appended.push(id.clone());
                }
                if ruling {
                    ruled = Some(id);
                }
            }
        }
        if let Some(id) = ruled {
            Ok(DisputeIngest::Ruled(id))
        } else if appended.is_empty() {
            Ok(DisputeIngest::Duplicate)
        } else {
            Ok(DisputeIngest::Appended(appended))
        }
    }

    /// Apply a public `dispute-resolution` marker.
    ///
    /// Markers for a dispute not seen yet are held until it opens.
    /// Events of other kinds are ignored.
    ///
    /// # Errors
    ///
    /// - [`ArbitrationError::Crypto`] when the signature does not verify.
    /// - [`ArbitrationError::MalformedTag`] without a usable `e` or
    ///   `resolution` tag.
    /// - [`ArbitrationError::NotArbiter`] when signed by anyone but the
    ///   dispute's arbiter.
    /// - [`ArbitrationError::AlreadyRuled`] when it contradicts the
    ///   recorded ruling.
    pub fn ingest_marker(&self, event: &SignedEvent) -> Result<DisputeIngest, ArbitrationError> {
        if event.kind != EventKind::DisputeResolution {
            return Ok(DisputeIngest::Ignored);
        }
        event.verify()?;
        let (dispute_id, _) = parse_marker(event)?;

        {
            let mut routing = self.routing.lock();
            if !self.disputes.contains_key(&dispute_id) {
                let held = routing.held_markers.entry(dispute_id).or_default();
                if held.iter().any(|m| m.id == event.id) {
                    return Ok(DisputeIngest::Duplicate);
                }
                held.push(event.clone());
                debug!(marker = %event.id, "holding resolution marker for unseen dispute");
                return Ok(DisputeIngest::Held);
            }
        }

        let mut dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or_else(|| ArbitrationError::UnknownDispute(dispute_id.clone()))?;
        if apply_marker(&mut dispute, event)? {
            Ok(DisputeIngest::Ruled(dispute_id))
        } else {
            Ok(DisputeIngest::Duplicate)
        }
    }

    /// Apply a batch of markers, logging and skipping the ones refused.
    pub fn ingest_markers<'a, I>(&self, events: I) -> Vec<DisputeIngest>
    where
        I: IntoIterator<Item = &'a SignedEvent>,
    {
        events
            .into_iter()
            .filter_map(|e| match self.ingest_marker(e) {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    warn!(marker = %e.id, error = %err, "skipping resolution marker");
                    None
                }
            })
            .collect()
    }

    /// Route a batch, logging and skipping malformed opening events.
    pub fn ingest_all<'a, I>(&self, rumors: I) -> Vec<DisputeIngest>
    where
        I: IntoIterator<Item = &'a Rumor>,
    {
        rumors
            .into_iter()
            .filter_map(|r| match self.ingest(r) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!(rumor = %r.id(), error = %e, "skipping malformed dispute event");
                    None
                }
            })
            .collect()
    }

    fn open(&self, rumor: &Rumor) -> Result<DisputeIngest, ArbitrationError> {
        let mut dispute = Dispute::open(rumor)?;
        let id = dispute.id().clone();

        let mut routing = self.routing.lock();
        if self.disputes.contains_key(&id) {
            return Ok(DisputeIngest::Duplicate);
        }
        for key in [
            ThreadRef::Dispute(id.clone()),
            ThreadRef::Order(dispute.order_id().clone()),
        ] {
            if let Some(held) = routing.held.remove(&key) {
                for message in &held {
                    absorb(&mut dispute, message);
                }
            }
        }
        for marker in routing.held_markers.remove(&id).unwrap_or_default() {
            if let Err(e) = apply_marker(&mut dispute, &marker) {
                warn!(marker = %marker.id, error = %e, "dropping held resolution marker");
            }
        }
        routing
            .by_order
            .entry(dispute.order_id().clone())
            .or_default()
            .push(id.clone());
        info!(
            dispute = %id,
            order = %dispute.order_id(),
            opened_by = %dispute.opened_by(),
            arbiter = %dispute.participants().arbiter,
            "dispute opened"
        );
        self.disputes.insert(id.clone(), dispute);
        Ok(DisputeIngest::Opened(id))
    }

    /// Snapshot of one dispute.
    pub fn get(&self, dispute_id: &EventId) -> Option<Dispute> {
        self.disputes.get(dispute_id).map(|d| d.value().clone())
    }

    /// Snapshots of the disputes over `order_id`.
    pub fn for_order(&self, order_id: &OrderId) -> Vec<Dispute> {
        let ids = self
            .routing
            .lock()
            .by_order
            .get(order_id)
            .cloned()
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Snapshots of every dispute, oldest first.
    pub fn disputes(&self) -> Vec<Dispute> {
        let mut all: Vec<Dispute> = self.disputes.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| {
            a.opened_at()
                .cmp(&b.opened_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        all
    }

    /// Number of disputes.
    pub fn len(&self) -> usize {
        self.disputes.len()
    }

    /// True when no dispute has been opened.
    pub fn is_empty(&self) -> bool {
        self.disputes.is_empty()
    }

    /// Close a ruled dispute.
    pub fn close(&self, dispute_id: &EventId, at: UnixTimestamp) -> Result<(), ArbitrationError> {
        let mut dispute = self
            .disputes
            .get_mut(dispute_id)
            .ok_or_else(|| ArbitrationError::UnknownDispute(dispute_id.clone()))?;
        dispute.close(at)
    }

    /// Issue the arbiter's ruling for `dispute_id` in favor of `for_party`.
    ///
    /// `history` is the full decrypted message history searched for the
    /// order's escrow payment; the dispute's own thread is searched too.
    ///
    /// A dispute already ruled for `for_party` whose delivery is not known
    /// to have happened is served again with the same ruling message.
    ///
    /// # Errors
    ///
    /// - [`ArbitrationError::UnknownDispute`] for an unseen dispute.
    /// - [`ArbitrationError::AlreadyRuled`] once a delivered ruling exists,
    ///   or for the other party once any ruling exists.
    /// - [`ArbitrationError::NotArbiter`] when `arbiter` is not the
    ///   designated arbiter.
    /// - [`ArbitrationError::NoEscrow`] when no payment message for the order
    ///   carries a usable ecash token.
    /// - [`ArbitrationError::Transport`] when the marker cannot be
    ///   published. The dispute stays open.
    /// - [`ArbitrationError::DeliveryPending`] when the ruling is committed
    ///   but the winner's copy could not be sent.
    pub fn rule<'h, T, R, H>(
        &self,
        dispute_id: &EventId,
        for_party: Party,
        arbiter: &Ed25519KeyPair,
        history: H,
        ctx: &mut RulingContext<'_, T, R>,
    ) -> Result<RulingReceipt, ArbitrationError>
    where
        T: Transport + ?Sized,
        R: RngCore + CryptoRng,
        H: IntoIterator<Item = &'h Rumor>,
    {
        let mut dispute = self
            .disputes
            .get_mut(dispute_id)
            .ok_or_else(|| ArbitrationError::UnknownDispute(dispute_id.clone()))?;

        let resume = match (dispute.state(), dispute.ruling()) {
            (DisputeState::Open, _) => None,
            (DisputeState::Ruled, Some(r)) if r.for_party == for_party && !r.is_delivered() => {
                Some(r.issued_at)
            }
            _ => {
                return Err(ArbitrationError::AlreadyRuled {
                    dispute_id: dispute_id.clone(),
                })
            }
        };
        let arbiter_pk = arbiter.public_key();
        let participants = *dispute.participants();
        if arbiter_pk != participants.arbiter {
            return Err(ArbitrationError::NotArbiter {
                dispute_id: dispute_id.clone(),
                signer: arbiter_pk.to_hex(),
            });
        }

        let order_id = dispute.order_id().clone();
        let proofs = match dispute.escrow_token() {
            Some(proofs) => proofs.to_vec(),
            None => {
                let thread: Vec<Rumor> = dispute.messages().cloned().collect();
                let mut scan: Vec<&Rumor> = Vec::new();
                for rumor in history {
                    scan.push(rumor);
                }
                scan.extend(thread.iter());
                let found = resolve_escrow_token(&order_id, scan)
                    .ok_or_else(|| ArbitrationError::NoEscrow {
                        order_id: order_id.clone(),
                    })?;
                dispute.set_escrow_token(found.clone());
                found
            }
        };

        let share = sign_partial(&order_id, &proofs, arbiter)?;
        let payload = serde_json::to_string(&share)
            .map_err(|e| ArbitrationError::Transport(TransportError::Serialization(e)))?;
        let winner = participants.of(for_party);
        let issued_at = resume.unwrap_or_else(UnixTimestamp::now);

        let ruling_rumor = Rumor::new(
            arbiter_pk,
            issued_at,
            EventKind::RumorDm,
            Tags::new()
                .with(Tag::pair("subject", Subject::DisputeMessage.as_str()))
                .with(Tag::pair("order", order_id.as_str()))
                .with(Tag::pair("e", dispute_id.as_str()))
                .with(Tag::pair("p", winner.to_hex())),
            format!("{}:{payload}", for_party.ruling_prefix()),
        )
        .map_err(TransportError::from)?;

        let marker = SignedEvent::sign(
            arbiter,
            issued_at,
            EventKind::DisputeResolution,
            Tags::new()
                .with(Tag::pair("order", order_id.as_str()))
                .with(Tag::pair("e", dispute_id.as_str()))
                .with(Tag::pair("resolution", for_party.as_str())),
            "",
        )?;

        if resume.is_none() {
            ctx.transport.publish(&marker)?;
            dispute.record_ruling(Ruling {
                for_party,
                issued_at,
                marker: Some(marker.id.clone()),
                ruling_rumor: None,
            })?;
            info!(dispute = %dispute_id, for_party = %for_party, "ruling committed");
        } else {
            debug!(dispute = %dispute_id, for_party = %for_party, "resending ruling");
        }

        let delivery = ctx
            .outbox
            .send(ctx.transport, ctx.keys, &ruling_rumor, arbiter, &winner)
            .map_err(|source| ArbitrationError::DeliveryPending {
                dispute_id: dispute_id.clone(),
                for_party,
                source,
            })?;

        dispute.add_message(&ruling_rumor);
        dispute.observe_ruling(Ruling {
            for_party,
            issued_at,
            marker: Some(marker.id.clone()),
            ruling_rumor: Some(ruling_rumor.id().clone()),
        })?;
        info!(
            dispute = %dispute_id,
            order = %order_id,
            for_party = %for_party,
            proofs = proofs.len(),
            "dispute ruled"
        );

        Ok(RulingReceipt {
            dispute_id: dispute_id.clone(),
            for_party,
            share,
            delivery,
            marker,
        })
    }
}

/// Find the escrowed proofs for `order_id`.
///
/// Scans `history` in `(created_at, id)` order for the first `order-payment`
/// message that references the order and embeds a decodable, non-empty
/// ecash token. Malformed messages and undecodable tokens are skipped.
pub fn resolve_escrow_token<'a, I>(order_id: &OrderId, history: I) -> Option<Vec<EcashProof>>
where
    I: IntoIterator<Item = &'a Rumor>,
{
    let mut payments: Vec<(&Rumor, String)> = history
        .into_iter()
        .filter_map(|rumor| match QualifyingMessage::parse(rumor) {
            Ok(Some(QualifyingMessage::Payment { common, payment }))
                if &common.order_id == order_id =>
            {
                payment.ecash_token.map(|token| (rumor, token))
            }
            _ => None,
        })
        .collect();
    payments.sort_by(|(a, _), (b, _)| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });

    payments.into_iter().find_map(|(rumor, token)| match EcashToken::decode(&token) {
        Ok(decoded) if !decoded.proofs().is_empty() => Some(decoded.proofs()),
        Ok(_) => {
            debug!(rumor = %rumor.id(), "payment token has no proofs");
            None
        }
        Err(e) => {
            debug!(rumor = %rumor.id(), error = %e, "undecodable payment token");
            None
        }
    })
}

/// Add `rumor` to the thread and pick up the ruling it carries, if any.
/// Returns `(added, ruling_changed)`.
fn absorb(dispute: &mut Dispute, rumor: &Rumor) -> (bool, bool) {
    let added = dispute.add_message(rumor);
    let Some(ruling) = ruling_in(rumor, dispute.id(), dispute.participants()) else {
        return (added, false);
    };
    match dispute.observe_ruling(ruling) {
        Ok(changed) => (added, changed),
        Err(e) => {
            warn!(rumor = %rumor.id(), error = %e, "conflicting ruling message");
            (added, false)
        }
    }
}

/// The ruling an arbiter-authored `RULING_FOR_<PARTY>:` message announces.
fn ruling_in(rumor: &Rumor, dispute_id: &EventId, participants: &Participants) -> Option<Ruling> {
    if rumor.author() != &participants.arbiter
        || !rumor
            .tags()
            .all("e")
            .any(|t| t.value() == Some(dispute_id.as_str()))
    {
        return None;
    }
    let for_party = [Party::Buyer, Party::Seller].into_iter().find(|p| {
        rumor
            .content()
            .strip_prefix(p.ruling_prefix())
            .is_some_and(|rest| rest.starts_with(':'))
    })?;
    Some(Ruling {
        for_party,
        issued_at: rumor.created_at(),
        marker: None,
        ruling_rumor: Some(rumor.id().clone()),
    })
}

fn parse_marker(event: &SignedEvent) -> Result<(EventId, Party), ArbitrationError> {
    let raw_id = event
        .tags
        .value("e")
        .ok_or_else(|| TagError::missing("dispute-resolution", "e"))?;
    let dispute_id =
        EventId::parse(raw_id).map_err(|e| TagError::invalid("e", raw_id, e.to_string()))?;
    let raw_party = event
        .tags
        .value("resolution")
        .ok_or_else(|| TagError::missing("dispute-resolution", "resolution"))?;
    let party = raw_party
        .parse::<Party>()
        .map_err(|e| TagError::invalid("resolution", raw_party, e))?;
    Ok((dispute_id, party))
}

/// Record the ruling a verified marker announces on its dispute.
fn apply_marker(dispute: &mut Dispute, marker: &SignedEvent) -> Result<bool, ArbitrationError> {
    if marker.pubkey != dispute.participants().arbiter {
        return Err(ArbitrationError::NotArbiter {
            dispute_id: dispute.id().clone(),
            signer: marker.pubkey.to_hex(),
        });
    }
    let (_, for_party) = parse_marker(marker)?;
    dispute.observe_ruling(Ruling {
        for_party,
        issued_at: marker.created_at,
        marker: Some(marker.id.clone()),
        ruling_rumor: None,
    })
}

fn thread_refs(rumor: &Rumor) -> Vec<ThreadRef> {
    let tags = rumor.tags();
    let mut refs: Vec<ThreadRef> = tags
        .all("e")
        .filter_map(|t| t.value())
        .filter_map(|v| EventId::parse(v).ok())
        .map(ThreadRef::Dispute)
        .collect();
    if tags.subject() == Some(Subject::DisputeMessage) {
        if let Some(order) = tags.value("order").and_then(|v| OrderId::new(v).ok()) {
            refs.push(ThreadRef::Order(order));
        }
    }
    refs
}
