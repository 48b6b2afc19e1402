//! # Durable Status Cache
//!
//! The surrounding application persists the last known status of each
//! order. That persisted value takes part in the max-severity merge, so an
//! order whose shipping message has not been re-fetched yet still shows as
//! shipped.

use bazaar_core::OrderId;
use dashmap::DashMap;

use crate::error::ReconcileError;
use crate::status::OrderStatus;

/// Collaborator holding the last persisted status per order.
pub trait StatusCache: Send + Sync {
    /// Status persisted for `order_id`, if any.
    fn get_cached_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>, ReconcileError>;

    /// Persist `status` for `order_id`.
    fn set_cached_status(&self, order_id: &OrderId, status: OrderStatus)
        -> Result<(), ReconcileError>;
}

/// In-memory cache for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStatusCache {
    statuses: DashMap<OrderId, OrderStatus>,
}

impl MemoryStatusCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached orders.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl StatusCache for MemoryStatusCache {
    fn get_cached_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>, ReconcileError> {
        Ok(self.statuses.get(order_id).map(|s| *s))
    }

    fn set_cached_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ReconcileError> {
        self.statuses.insert(order_id.clone(), status);
        Ok(())
    }
}

/// A cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl StatusCache for NoCache {
    fn get_cached_status(&self, _order_id: &OrderId) -> Result<Option<OrderStatus>, ReconcileError> {
        Ok(None)
    }

    fn set_cached_status(
        &self,
        _order_id: &OrderId,
        _status: OrderStatus,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }
}
