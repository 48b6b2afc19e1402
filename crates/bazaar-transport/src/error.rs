//! # Transport Errors
//!
//! Two families. [`TransportError`] covers building and publishing
//! envelopes, where a failure aborts the send. [`UnwrapError`] covers
//! opening a received envelope, where a failure only means "skip this one".

use bazaar_core::{CanonicalizationError, EventKind};
use bazaar_crypto::CryptoError;
use thiserror::Error;

/// Failure while constructing, signing, or publishing events.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Event id commitment could not be canonicalized.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Encryption or key handling failed, e.g. a malformed recipient key.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// JSON encoding of an inner layer failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A rumor was handed to a sender who did not author it.
    #[error("rumor author {author} does not match sender {sender}")]
    AuthorMismatch {
        /// Author recorded on the rumor.
        author: String,
        /// Public key of the key pair asked to send it.
        sender: String,
    },

    /// A relay refused an event.
    #[error("relay rejected event {id}: {reason}")]
    Rejected {
        /// Id of the refused event.
        id: String,
        /// Reason reported by the relay.
        reason: String,
    },

    /// The relay collaborator failed (I/O, connectivity).
    #[error("relay error: {0}")]
    Relay(String),
}

/// Why an envelope could not be opened. Every variant is a per-message skip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnwrapError {
    /// A layer could not be decrypted with the recipient key.
    #[error("decryption failed at {layer} layer: {reason}")]
    Decryption {
        /// `wrap` or `seal`.
        layer: &'static str,
        /// Underlying reason.
        reason: String,
    },

    /// The seal signer is not the rumor author.
    #[error("seal signed by {seal_signer} but rumor authored by {rumor_author}")]
    IdentityMismatch {
        /// Public key that signed the seal.
        seal_signer: String,
        /// Author claimed by the rumor.
        rumor_author: String,
    },

    /// An envelope's id or signature does not verify.
    #[error("invalid {layer} event {id}: {reason}")]
    InvalidSignature {
        /// `wrap` or `seal`.
        layer: &'static str,
        /// Event id as received.
        id: String,
        /// Underlying reason.
        reason: String,
    },

    /// A layer carried an unexpected kind.
    #[error("expected {expected} event, found {found}")]
    WrongKind {
        /// Kind required at this layer.
        expected: EventKind,
        /// Kind actually present.
        found: EventKind,
    },

    /// Decrypted plaintext did not parse as the expected structure.
    #[error("malformed {layer} payload: {reason}")]
    Malformed {
        /// `seal` or `rumor`.
        layer: &'static str,
        /// Underlying reason.
        reason: String,
    },
}

impl UnwrapError {
    /// True for failures that mean "not addressed to us" rather than tampering.
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption { .. })
    }
}
