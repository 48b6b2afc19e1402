//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types shared across the Bazaar Stack. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Tag errors name the subject and the tag at fault, so a skipped message
//!   can be diagnosed from a single log line.
//! - Validation errors carry the rejected input.

use thiserror::Error;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum BazaarError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A message tag was missing or malformed.
    #[error("tag error: {0}")]
    Tag(#[from] TagError),

    /// An identifier or value failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be decimal strings.
    #[error("float values are not permitted in canonical representations; use a decimal string for amount: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A qualifying message is missing a required tag or carries an unusable one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// A tag required for this subject is absent.
    #[error("{subject} message is missing required tag \"{tag}\"")]
    Missing {
        /// Subject of the offending message.
        subject: String,
        /// Name of the absent tag.
        tag: String,
    },

    /// A tag is present but its value cannot be used.
    #[error("invalid \"{tag}\" tag value {value:?}: {reason}")]
    Invalid {
        /// Tag name.
        tag: String,
        /// Offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl TagError {
    /// Shorthand for [`TagError::Missing`].
    pub fn missing(subject: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::Missing {
            subject: subject.into(),
            tag: tag.into(),
        }
    }

    /// Shorthand for [`TagError::Invalid`].
    pub fn invalid(
        tag: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            tag: tag.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// An identifier or scalar value failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Event id is not 64 lowercase hex characters.
    #[error("invalid event id {0:?}: expected 64 lowercase hex characters")]
    InvalidEventId(String),

    /// Order id is empty or contains whitespace.
    #[error("invalid order id {0:?}")]
    InvalidOrderId(String),

    /// Product address does not have the `kind:pubkey:dTag` shape.
    #[error("invalid product address {value:?}: {reason}")]
    InvalidProductAddress {
        /// The rejected address.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Decimal amount is not a non-negative base-10 number.
    #[error("invalid decimal amount {0:?}")]
    InvalidAmount(String),
}
