//! # bazaar-transport: Gift-Wrapped Messaging
//!
//! Implements the two-layer envelope protocol that carries every private
//! marketplace message over public relays:
//!
//! ```text
//! Rumor (unsigned, id-committed)
//!   └─ seal()   → Seal      kind 13, signed by the real author, content = E(author→recipient, rumor)
//!       └─ wrap() → GiftWrap kind 1059, signed by a one-time key, content = E(ephemeral→recipient, seal)
//! ```
//!
//! Outside observers see only the ephemeral key, a jittered timestamp, and
//! the recipient's `p` tag. [`unwrap::try_unwrap`] reverses both layers and
//! rejects any seal whose signer is not the rumor's author.
//!
//! The relay network itself is an external collaborator behind the
//! [`relay::Transport`] trait; [`relay::MemoryRelay`] is an in-process
//! implementation used by tests and the CLI.

pub mod config;
pub mod error;
pub mod event;
pub mod outbox;
pub mod relay;
pub mod seal;
pub mod unwrap;
pub mod wrap;

pub use config::{ConfigError, WrapPolicy};
pub use error::{TransportError, UnwrapError};
pub use event::{compute_event_id, Rumor, SignedEvent};
pub use outbox::{Outbox, SendReceipt};
pub use relay::{EventFilter, MemoryRelay, Transport};
pub use seal::{seal, Seal};
pub use unwrap::{try_unwrap, unwrap, unwrap_all};
pub use wrap::{wrap, GiftWrap};
