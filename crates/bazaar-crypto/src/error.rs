//! Errors raised by key handling, signing, and payload encryption.

use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Encrypting a payload to a peer failed, typically because the peer's
    /// public key is not a valid curve point.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authenticated decryption failed: wrong key, tampered ciphertext, or a
    /// payload not addressed to us.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Payload framing or text encoding was invalid.
    #[error("encoding error: {0}")]
    Encoding(String),
}
