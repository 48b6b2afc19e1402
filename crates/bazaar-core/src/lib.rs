//! # bazaar-core: Foundational Types for the Bazaar Stack
//!
//! This crate defines the primitives every other crate in the workspace
//! builds on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Event ids and every other digest flow
//!    through `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for
//!    hashing.
//!
//! 2. **Typed tag vocabulary.** Tags travel on the wire as arrays of strings,
//!    but lookups go through [`Tags`] and subjects are parsed once into the
//!    [`Subject`] enum.
//!
//! 3. **Newtype identifiers.** `EventId`, `OrderId`, and `ProductAddress`
//!    are distinct types with validated constructors.
//!
//! 4. **Unix-second timestamps.** Events carry `created_at` as whole seconds
//!    since the epoch; [`UnixTimestamp`] is the only way the stack reads the
//!    clock.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bazaar-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod kind;
pub mod tag;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, sha256_raw, ContentDigest, DigestAlgorithm};
pub use error::{BazaarError, CanonicalizationError, TagError, ValidationError};
pub use identity::{is_valid_decimal, EventId, OrderId, ProductAddress};
pub use kind::EventKind;
pub use tag::{Subject, Tag, Tags};
pub use temporal::UnixTimestamp;
