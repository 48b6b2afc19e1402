//! # Consolidated Orders
//!
//! An [`Order`] is the merge of every qualifying message seen for one order
//! id. Each merge rule is a join, so the result depends only on the *set* of
//! messages ingested, never on their order or multiplicity:
//!
//! - scalar fields: last-writer-wins registers stamped `(created_at, rumor id)`;
//!   an absent value never clears a present one;
//! - status: maximum severity, including any externally cached status;
//! - timestamp: maximum;
//! - source message: the rumor with the greatest stamp.

use std::collections::BTreeSet;

use bazaar_core::{EventId, OrderId, ProductAddress, UnixTimestamp};
use bazaar_crypto::Ed25519PublicKey;
use bazaar_transport::Rumor;

use crate::message::{Amount, QualifyingMessage};
use crate::status::OrderStatus;

/// Ordering key for last-writer-wins registers.
pub type Stamp = (UnixTimestamp, EventId);

/// Last-writer-wins register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lww<T> {
    entry: Option<(Stamp, T)>,
}

impl<T> Default for Lww<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T: Clone> Lww<T> {
    /// Offer a value written at `stamp`. `None` is ignored.
    pub fn observe(&mut self, value: Option<&T>, stamp: &Stamp) {
        let Some(value) = value else { return };
        let newer = match &self.entry {
            Some((current, _)) => stamp > current,
            None => true,
        };
        if newer {
            self.entry = Some((stamp.clone(), value.clone()));
        }
    }

    /// Current value.
    pub fn get(&self) -> Option<&T> {
        self.entry.as_ref().map(|(_, v)| v)
    }
}

/// Text-valued optional fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetails {
    /// Product title.
    pub title: Lww<String>,
    /// Bulk pricing option.
    pub bulk: Lww<String>,
    /// Variant: size.
    pub size: Lww<String>,
    /// Variant: volume.
    pub volume: Lww<String>,
    /// Variant: weight.
    pub weight: Lww<String>,
    /// Delivery address.
    pub address: Lww<String>,
    /// Pickup location.
    pub pickup: Lww<String>,
    /// Tracking number.
    pub tracking: Lww<String>,
    /// Carrier.
    pub carrier: Lww<String>,
    /// Estimated arrival.
    pub eta: Lww<String>,
    /// Payment method type.
    pub payment_method: Lww<String>,
    /// Payment reference.
    pub payment_reference: Lww<String>,
    /// Payment proof.
    pub payment_proof: Lww<String>,
    /// Serialized ecash token.
    pub ecash_token: Lww<String>,
    /// Donation amount.
    pub donation_amount: Lww<String>,
    /// Donation percentage.
    pub donation_percentage: Lww<String>,
}

/// A consolidated order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    order_id: OrderId,
    product: Lww<ProductAddress>,
    seller: Lww<Ed25519PublicKey>,
    buyer: Lww<Ed25519PublicKey>,
    amount: Lww<Amount>,
    quantity: Lww<u32>,
    escrow: Lww<Ed25519PublicKey>,
    details: OrderDetails,
    observed_status: OrderStatus,
    cached_status: Option<OrderStatus>,
    last_event_timestamp: UnixTimestamp,
    source: Rumor,
    contributing: BTreeSet<EventId>,
}

impl Order {
    /// Start an order from its first observed message.
    pub fn new(message: &QualifyingMessage, rumor: &Rumor) -> Self {
        let common = message.common();
        let mut order = Self {
            order_id: common.order_id.clone(),
            product: Lww::default(),
            seller: Lww::default(),
            buyer: Lww::default(),
            amount: Lww::default(),
            quantity: Lww::default(),
            escrow: Lww::default(),
            details: OrderDetails::default(),
            observed_status: common.status,
            cached_status: None,
            last_event_timestamp: common.meta.created_at,
            source: rumor.clone(),
            contributing: BTreeSet::new(),
        };
        order.apply(message, rumor);
        order
    }

    /// Merge one message. Returns `false` if this rumor was already applied.
    pub fn apply(&mut self, message: &QualifyingMessage, rumor: &Rumor) -> bool {
        let common = message.common();
        if !self.contributing.insert(common.meta.rumor_id.clone()) {
            return false;
        }
        let stamp: Stamp = (common.meta.created_at, common.meta.rumor_id.clone());

        self.product.observe(common.product.as_ref(), &stamp);
        self.seller.observe(common.seller.as_ref(), &stamp);
        self.buyer.observe(common.buyer.as_ref(), &stamp);
        self.amount.observe(common.amount.as_ref(), &stamp);
        self.quantity.observe(common.quantity.as_ref(), &stamp);
        self.escrow.observe(common.escrow.as_ref(), &stamp);

        let d = &mut self.details;
        d.title.observe(common.title.as_ref(), &stamp);
        d.bulk.observe(common.bulk.as_ref(), &stamp);
        d.size.observe(common.size.as_ref(), &stamp);
        d.volume.observe(common.volume.as_ref(), &stamp);
        d.weight.observe(common.weight.as_ref(), &stamp);
        d.donation_amount.observe(common.donation_amount.as_ref(), &stamp);
        d.donation_percentage.observe(common.donation_percentage.as_ref(), &stamp);
        if let Some(shipping) = message.shipping() {
            d.address.observe(shipping.address.as_ref(), &stamp);
            d.pickup.observe(shipping.pickup.as_ref(), &stamp);
            d.tracking.observe(shipping.tracking.as_ref(), &stamp);
            d.carrier.observe(shipping.carrier.as_ref(), &stamp);
            d.eta.observe(shipping.eta.as_ref(), &stamp);
        }
        if let Some(payment) = message.payment() {
            d.payment_method.observe(payment.method.as_ref(), &stamp);
            d.payment_reference.observe(payment.reference.as_ref(), &stamp);
            d.payment_proof.observe(payment.proof.as_ref(), &stamp);
            d.ecash_token.observe(payment.ecash_token.as_ref(), &stamp);
        }

        self.observed_status = self.observed_status.join(common.status);
        self.last_event_timestamp = self.last_event_timestamp.max(common.meta.created_at);
        if (rumor.created_at(), rumor.id()) > (self.source.created_at(), self.source.id()) {
            self.source = rumor.clone();
        }
        true
    }

    /// Fold in a status read from the durable cache.
    pub fn absorb_cached_status(&mut self, cached: OrderStatus) {
        self.cached_status = Some(self.cached_status.map_or(cached, |c| c.join(cached)));
    }

    /// Merged status: the most severe of every observation and the cache.
    pub fn status(&self) -> OrderStatus {
        match self.cached_status {
            Some(cached) => self.observed_status.join(cached),
            None => self.observed_status,
        }
    }

    /// Status derived from messages alone.
    pub fn observed_status(&self) -> OrderStatus {
        self.observed_status
    }

    /// Correlation key.
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Product listing address.
    pub fn product(&self) -> Option<&ProductAddress> {
        self.product.get()
    }

    /// Seller.
    pub fn seller(&self) -> Option<&Ed25519PublicKey> {
        self.seller.get()
    }

    /// Buyer.
    pub fn buyer(&self) -> Option<&Ed25519PublicKey> {
        self.buyer.get()
    }

    /// Amount and currency.
    pub fn amount(&self) -> Option<&Amount> {
        self.amount.get()
    }

    /// Quantity; 1 when no message specified one.
    pub fn quantity(&self) -> u32 {
        self.quantity.get().copied().unwrap_or(1)
    }

    /// Arbiter holding the escrow.
    pub fn escrow(&self) -> Option<&Ed25519PublicKey> {
        self.escrow.get()
    }

    /// Optional text fields.
    pub fn details(&self) -> &OrderDetails {
        &self.details
    }

    /// Latest `created_at` across contributing messages.
    pub fn last_event_timestamp(&self) -> UnixTimestamp {
        self.last_event_timestamp
    }

    /// The newest contributing rumor.
    pub fn source_message(&self) -> &Rumor {
        &self.source
    }

    /// Ids of every rumor merged into this order.
    pub fn contributing_messages(&self) -> &BTreeSet<EventId> {
        &self.contributing
    }
}
