//! # Gift Wrapping
//!
//! The outer envelope hides the seal's author behind a single-use key.
//! The ephemeral key pair is taken by value and dropped (and zeroized)
//! when this function returns.

use bazaar_core::{EventKind, Tag, Tags, UnixTimestamp};
use bazaar_crypto::{encrypt_to, Ed25519KeyPair, Ed25519PublicKey};
use rand::rngs::OsRng;

use crate::config::WrapPolicy;
use crate::error::TransportError;
use crate::event::SignedEvent;
use crate::seal::Seal;

/// A gift-wrap envelope (kind 1059) addressed to exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftWrap(SignedEvent);

impl GiftWrap {
    /// The underlying signed event.
    pub fn event(&self) -> &SignedEvent {
        &self.0
    }

    /// Unwrap into the signed event for publishing.
    pub fn into_event(self) -> SignedEvent {
        self.0
    }
}

/// Encrypt `seal` to `recipient` under `ephemeral` and sign with it.
///
/// `created_at` is drawn from `policy`; the only tag is `["p", recipient]`.
pub fn wrap(
    seal: &Seal,
    ephemeral: Ed25519KeyPair,
    recipient: &Ed25519PublicKey,
    policy: &WrapPolicy,
) -> Result<GiftWrap, TransportError> {
    let plaintext = serde_json::to_string(seal.event())?;
    let content = encrypt_to(&ephemeral, recipient, &plaintext)?;
    let created_at = policy.stamp(UnixTimestamp::now(), &mut OsRng);
    let tags = Tags::new().with(Tag::pair("p", recipient.to_hex()));
    let event = SignedEvent::sign(&ephemeral, created_at, EventKind::Wrap, tags, content)?;
    Ok(GiftWrap(event))
}
