//! # Unwrapping
//!
//! Opens a gift-wrap envelope with the recipient's real key. Checks run in
//! a fixed order and the first failure wins:
//!
//! 1. envelope kind is `wrap` and its signature verifies;
//! 2. envelope content decrypts (counterparty = ephemeral key);
//! 3. the seal parses, has kind `seal`, and its signature verifies;
//! 4. seal content decrypts (counterparty = seal signer);
//! 5. the rumor parses and its id matches its fields;
//! 6. the seal signer equals the rumor author.
//!
//! [`unwrap`] collapses every failure to `None`. A stream legitimately
//! contains envelopes for other recipients, so a failure is a skip, never
//! an abort.

use std::collections::BTreeMap;

use bazaar_core::{EventId, EventKind, UnixTimestamp};
use bazaar_crypto::{decrypt_from, Ed25519KeyPair};
use tracing::debug;

use crate::error::UnwrapError;
use crate::event::{Rumor, SignedEvent};

/// Open `envelope`, reporting why it could not be opened.
pub fn try_unwrap(envelope: &SignedEvent, recipient: &Ed25519KeyPair) -> Result<Rumor, UnwrapError> {
    expect_kind(EventKind::Wrap, envelope.kind)?;
    envelope
        .verify()
        .map_err(|e| UnwrapError::InvalidSignature {
            layer: "wrap",
            id: envelope.id.to_string(),
            reason: e.to_string(),
        })?;

    let seal_json = decrypt_from(recipient, &envelope.pubkey, &envelope.content).map_err(|e| {
        UnwrapError::Decryption {
            layer: "wrap",
            reason: e.to_string(),
        }
    })?;
    let seal: SignedEvent =
        serde_json::from_str(&seal_json).map_err(|e| UnwrapError::Malformed {
            layer: "seal",
            reason: e.to_string(),
        })?;
    expect_kind(EventKind::Seal, seal.kind)?;
    seal.verify().map_err(|e| UnwrapError::InvalidSignature {
        layer: "seal",
        id: seal.id.to_string(),
        reason: e.to_string(),
    })?;

    let rumor_json = decrypt_from(recipient, &seal.pubkey, &seal.content).map_err(|e| {
        UnwrapError::Decryption {
            layer: "seal",
            reason: e.to_string(),
        }
    })?;
    let rumor = Rumor::from_json(&rumor_json).map_err(|reason| UnwrapError::Malformed {
        layer: "rumor",
        reason,
    })?;

    if rumor.author() != &seal.pubkey {
        return Err(UnwrapError::IdentityMismatch {
            seal_signer: seal.pubkey.to_hex(),
            rumor_author: rumor.author().to_hex(),
        });
    }
    Ok(rumor)
}

/// Open `envelope`, or `None` if it is not readable by `recipient`.
pub fn unwrap(envelope: &SignedEvent, recipient: &Ed25519KeyPair) -> Option<Rumor> {
    match try_unwrap(envelope, recipient) {
        Ok(rumor) => Some(rumor),
        Err(e) => {
            debug!(envelope = %envelope.id, error = %e, "skipping envelope");
            None
        }
    }
}

/// Open a batch, skipping failures, de-duplicating by rumor id, and ordering
/// by `(created_at, id)`.
pub fn unwrap_all<'a, I>(envelopes: I, recipient: &Ed25519KeyPair) -> Vec<Rumor>
where
    I: IntoIterator<Item = &'a SignedEvent>,
{
    let mut by_time: BTreeMap<(UnixTimestamp, EventId), Rumor> = BTreeMap::new();
    for envelope in envelopes {
        if let Some(rumor) = unwrap(envelope, recipient) {
            by_time
                .entry((rumor.created_at(), rumor.id().clone()))
                .or_insert(rumor);
        }
    }
    by_time.into_values().collect()
}

fn expect_kind(expected: EventKind, found: EventKind) -> Result<(), UnwrapError> {
    if expected == found {
        Ok(())
    } else {
        Err(UnwrapError::WrongKind { expected, found })
    }
}
