//! # bazaar-cli: Bazaar Stack Command-Line Interface
//!
//! A thin shell over the library crates, run against a JSON-lines relay
//! file so two identities on one machine can trade messages end to end.
//!
//! ## Subcommands
//!
//! - `keygen`: create an identity key pair
//! - `send`: gift-wrap and publish a direct message
//! - `inbox`: decrypt received messages, grouped by counterparty
//! - `orders`: reconcile order messages into consolidated orders
//! - `dispute`: open, list, and rule on disputes
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to the domain crates; no protocol logic lives here.

pub mod config;
pub mod dispute;
pub mod keys;
pub mod message;
pub mod orders;
pub mod store;

use anyhow::{Context, Result};

use bazaar_crypto::Ed25519KeyPair;
use bazaar_transport::{unwrap_all, EventFilter, Rumor, Transport};

/// Fetch and decrypt everything addressed to `identity`, ordered by
/// `(created_at, id)`. Envelopes that do not open are skipped.
pub fn received_rumors<T: Transport + ?Sized>(
    relay: &T,
    identity: &Ed25519KeyPair,
) -> Result<Vec<Rumor>> {
    let envelopes = relay
        .fetch(&EventFilter::inbox(identity.public_key()))
        .context("failed to fetch inbox")?;
    let rumors = unwrap_all(&envelopes, identity);
    tracing::debug!(
        envelopes = envelopes.len(),
        opened = rumors.len(),
        "decrypted inbox"
    );
    Ok(rumors)
}
