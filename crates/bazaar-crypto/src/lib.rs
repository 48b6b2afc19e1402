//! # bazaar-crypto: Cryptographic Primitives
//!
//! Provides the cryptographic building blocks for the Bazaar Stack:
//!
//! - **Ed25519** identity keys, event signatures, and escrow signature shares.
//! - **X25519** conversation keys derived from Ed25519 identities via HKDF.
//! - **ChaCha20-Poly1305** payload encryption for seals and gift wraps.
//! - **EphemeralKeyProvider** for single-use gift-wrap signing keys.
//!
//! ## Crate Policy
//!
//! - Depends only on `bazaar-core` internally.
//! - No mocking of cryptographic operations in tests. All tests use real
//!   Ed25519, real X25519, real AEAD.
//! - Secret material is zeroized on drop and never appears in `Debug` output.

pub mod cipher;
pub mod ed25519;
pub mod ephemeral;
pub mod error;
pub mod exchange;

pub use cipher::{decrypt, decrypt_from, encrypt, encrypt_to};
pub use ed25519::{verify_digest, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use ephemeral::EphemeralKeyProvider;
pub use error::CryptoError;
pub use exchange::{conversation_key, ConversationKey};
