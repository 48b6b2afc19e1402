//! # bazaar-state: Order Reconciliation
//!
//! Folds decrypted marketplace rumors into one consolidated view per order.
//! Messages arrive out of order, duplicated, and from several devices, so
//! every merge rule here is commutative, associative, and idempotent:
//!
//! - **Status** (`status.rs`): a join-semilattice. The merged status is the
//!   most severe status any message (or the durable cache) has asserted.
//!
//! - **Messages** (`message.rs`): the one place tags are read. A rumor with
//!   an order subject becomes a typed [`QualifyingMessage`]; a malformed one
//!   becomes a [`bazaar_core::TagError`].
//!
//! - **Order** (`order.rs`): per-field last-writer-wins registers stamped
//!   with `(created_at, rumor id)`, plus the status join and the set of
//!   contributing rumor ids.
//!
//! - **Book** (`book.rs`): the concurrent keyed store. One rumor is applied
//!   atomically per order id; the [`StatusCache`] collaborator is consulted
//!   and advanced during the same critical section.
//!
//! - **Conversations** (`conversation.rs`): direct-message threads grouped
//!   by counterparty.

pub mod book;
pub mod cache;
pub mod conversation;
pub mod error;
pub mod message;
pub mod order;
pub mod status;

// ─── Store re-exports ───────────────────────────────────────────────

pub use book::{IngestOutcome, IngestReport, OrderBook};
pub use cache::{MemoryStatusCache, NoCache, StatusCache};
pub use conversation::{ConversationIndex, ConversationSummary};
pub use error::ReconcileError;

// ─── Model re-exports ───────────────────────────────────────────────

pub use message::{
    default_status, find_ecash_token, Amount, MessageMeta, OrderCommon, PaymentInfo,
    QualifyingMessage, ShippingDetails, DEFAULT_CURRENCY, ECASH_TOKEN_PREFIX,
};
pub use order::{Lww, Order, OrderDetails, Stamp};
pub use status::OrderStatus;
