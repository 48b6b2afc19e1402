//! # Order Book: Keyed Reconciliation Store
//!
//! Applying one rumor is atomic per order id: the merge runs while holding
//! that id's `DashMap` entry, so concurrent deliveries for the same order
//! serialize while different orders proceed in parallel.

use bazaar_core::{EventId, OrderId};
use bazaar_transport::Rumor;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::cache::StatusCache;
use crate::error::ReconcileError;
use crate::message::QualifyingMessage;
use crate::order::Order;

/// Result of ingesting one rumor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First message for this order.
    Created(OrderId),
    /// Merged into an existing order.
    Updated(OrderId),
    /// Already applied; nothing changed.
    Duplicate(OrderId),
    /// Not an order message.
    Skipped,
}

/// Totals for a batch ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Orders created.
    pub created: usize,
    /// Merges into existing orders.
    pub updated: usize,
    /// Re-deliveries of already applied rumors.
    pub duplicates: usize,
    /// Rumors that were not order messages.
    pub skipped: usize,
    /// Qualifying rumors rejected as malformed, with the reason.
    pub malformed: Vec<(EventId, ReconcileError)>,
}

/// Concurrent store of consolidated orders.
pub struct OrderBook<C> {
    orders: DashMap<OrderId, Order>,
    cache: C,
}

impl<C: StatusCache> OrderBook<C> {
    /// Empty book backed by `cache`.
    pub fn new(cache: C) -> Self {
        Self {
            orders: DashMap::new(),
            cache,
        }
    }

    /// Apply one rumor.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::MalformedTag`] when a qualifying rumor is malformed.
    /// The book is not modified in that case.
    pub fn ingest(&self, rumor: &Rumor) -> Result<IngestOutcome, ReconcileError> {
        let message = match QualifyingMessage::parse(rumor) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(rumor = %rumor.id(), "not an order message");
                return Ok(IngestOutcome::Skipped);
            }
            Err(e) => {
                warn!(rumor = %rumor.id(), error = %e, "skipping malformed order message");
                return Err(e.into());
            }
        };
        let order_id = message.common().order_id.clone();

        let outcome = match self.orders.entry(order_id.clone()) {
            Entry::Vacant(slot) => {
                let mut order = slot.insert(Order::new(&message, rumor));
                self.sync_cache(order.value_mut());
                IngestOutcome::Created(order_id)
            }
            Entry::Occupied(mut slot) => {
                let applied = slot.get_mut().apply(&message, rumor);
                self.sync_cache(slot.get_mut());
                if applied {
                    IngestOutcome::Updated(order_id)
                } else {
                    IngestOutcome::Duplicate(order_id)
                }
            }
        };
        Ok(outcome)
    }

    /// Apply a batch, continuing past malformed messages.
    pub fn ingest_all<'a, I>(&self, rumors: I) -> IngestReport
    where
        I: IntoIterator<Item = &'a Rumor>,
    {
        let mut report = IngestReport::default();
        for rumor in rumors {
            match self.ingest(rumor) {
                Ok(IngestOutcome::Created(_)) => report.created += 1,
                Ok(IngestOutcome::Updated(_)) => report.updated += 1,
                Ok(IngestOutcome::Duplicate(_)) => report.duplicates += 1,
                Ok(IngestOutcome::Skipped) => report.skipped += 1,
                Err(e) => report.malformed.push((rumor.id().clone(), e)),
            }
        }
        report
    }

    /// Snapshot of one order.
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.value().clone())
    }

    /// Snapshot of every order, newest activity first.
    pub fn orders(&self) -> Vec<Order> {
        let mut all: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        all.sort_by(|a, b| {
            b.last_event_timestamp()
                .cmp(&a.last_event_timestamp())
                .then_with(|| a.order_id().cmp(b.order_id()))
        });
        all
    }

    /// Number of orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// True when the book holds no orders.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// The status cache collaborator.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Pull the cached status into `order`, then push back if ours is newer.
    /// Cache failures are logged; the in-memory merge already happened.
    fn sync_cache(&self, order: &mut Order) {
        let cached = match self.cache.get_cached_status(order.order_id()) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(order = %order.order_id(), error = %e, "status cache read failed");
                None
            }
        };
        if let Some(cached) = cached {
            order.absorb_cached_status(cached);
        }
        let merged = order.status();
        if cached.map_or(true, |c| merged > c) {
            if let Err(e) = self.cache.set_cached_status(order.order_id(), merged) {
                warn!(order = %order.order_id(), error = %e, "status cache write failed");
            }
        }
    }
}

impl<C> std::fmt::Debug for OrderBook<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("orders", &self.orders.len())
            .finish()
    }
}
