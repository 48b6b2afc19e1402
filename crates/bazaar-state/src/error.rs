//! Reconciliation errors.

use bazaar_core::TagError;
use thiserror::Error;

/// Error while ingesting a rumor into the order book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A qualifying message was missing a required field or carried an
    /// unusable one. The message is skipped; the store is untouched.
    #[error("malformed qualifying message: {0}")]
    MalformedTag(#[from] TagError),

    /// The durable status cache failed.
    #[error("status cache error: {0}")]
    Cache(String),
}
