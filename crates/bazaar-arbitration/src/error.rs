//! # Arbitration Errors
//!
//! A failed ruling leaves the dispute open, with one exception:
//! [`ArbitrationError::DeliveryPending`] is raised after the ruling was
//! committed, and ruling again for the same party only retries the private
//! delivery.

use bazaar_core::{EventId, OrderId, TagError};
use bazaar_crypto::CryptoError;
use bazaar_transport::TransportError;
use thiserror::Error;

use crate::dispute::{DisputeState, Party};

/// Errors from dispute tracking and the ruling workflow.
#[derive(Error, Debug)]
pub enum ArbitrationError {
    /// No escrowed ecash could be located for the order, so there is nothing
    /// to rule over.
    #[error("no escrow token found for order {order_id}")]
    NoEscrow {
        /// Order whose payment history was searched.
        order_id: OrderId,
    },

    /// The dispute already carries a ruling.
    #[error("dispute {dispute_id} has already been ruled")]
    AlreadyRuled {
        /// The dispute.
        dispute_id: EventId,
    },

    /// The signing key is not the dispute's designated arbiter.
    #[error("{signer} is not the arbiter of dispute {dispute_id}")]
    NotArbiter {
        /// The dispute.
        dispute_id: EventId,
        /// Hex public key that attempted the ruling.
        signer: String,
    },

    /// No dispute with this id has been observed.
    #[error("unknown dispute {0}")]
    UnknownDispute(EventId),

    /// The requested lifecycle transition is not allowed.
    #[error("invalid dispute transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: DisputeState,
        /// Requested state.
        to: DisputeState,
    },

    /// An ecash token string could not be decoded.
    #[error("invalid ecash token: {0}")]
    InvalidToken(String),

    /// A dispute-open event lacked a required tag.
    #[error("malformed dispute event: {0}")]
    MalformedTag(#[from] TagError),

    /// The ruling is committed and its marker published, but the private
    /// delivery to the winner failed.
    #[error("ruling for {for_party} on dispute {dispute_id} is committed but undelivered: {source}")]
    DeliveryPending {
        /// The dispute.
        dispute_id: EventId,
        /// Winning side the delivery is owed to.
        for_party: Party,
        /// Why delivery failed.
        source: TransportError,
    },

    /// Publishing the resolution marker failed; nothing was committed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Signing or verification failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
