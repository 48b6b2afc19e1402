//! # Dispute Subcommand
//!
//! `open` sends a `dispute-open` rumor to the arbiter and the other party,
//! `list` shows the disputes an identity can see, and `rule` lets the
//! arbiter release the order's escrow to one side.
//!
//! Each invocation rebuilds dispute state from the relay: the identity's
//! decrypted inbox plus every public resolution marker. A ruling issued by
//! an earlier run is therefore seen, and a second one is refused.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use bazaar_arbitration::{DisputeManager, Party, RulingContext};
use bazaar_core::{EventId, EventKind, Tag, Tags, UnixTimestamp};
use bazaar_crypto::{Ed25519KeyPair, EphemeralKeyProvider};
use bazaar_transport::{EventFilter, Outbox, Rumor, Transport};

use crate::config::Settings;
use crate::keys::{load_keypair, parse_pubkey};
use crate::received_rumors;
use crate::store::FileRelay;

/// Arguments for `bazaar dispute`.
#[derive(Args, Debug)]
pub struct DisputeArgs {
    #[command(subcommand)]
    pub command: DisputeCommand,
}

/// Dispute subcommands.
#[derive(Subcommand, Debug)]
pub enum DisputeCommand {
    /// Open a dispute over an order.
    Open {
        /// Private key file of the buyer or seller opening the dispute.
        #[arg(long)]
        key: PathBuf,
        /// Disputed order id.
        #[arg(long)]
        order: String,
        /// Buyer public key (hex or `.pub` file).
        #[arg(long)]
        buyer: String,
        /// Seller public key (hex or `.pub` file).
        #[arg(long)]
        seller: String,
        /// Arbiter public key (hex or `.pub` file).
        #[arg(long)]
        arbiter: String,
        /// Reason for the dispute.
        reason: String,
    },

    /// List disputes visible to an identity.
    List {
        /// Private key file of the identity to read for.
        #[arg(long)]
        key: PathBuf,
    },

    /// Rule on a dispute (arbiter only).
    Rule {
        /// Arbiter's private key file.
        #[arg(long)]
        key: PathBuf,
        /// Dispute id.
        #[arg(long)]
        dispute: String,
        /// Winning party: `buyer` or `seller`.
        #[arg(long = "for", value_parser = parse_party)]
        for_party: Party,
    },
}

fn parse_party(s: &str) -> Result<Party, String> {
    s.parse()
}

/// Execute `bazaar dispute`.
pub fn run_dispute(args: &DisputeArgs, settings: &Settings) -> Result<u8> {
    match &args.command {
        DisputeCommand::Open {
            key,
            order,
            buyer,
            seller,
            arbiter,
            reason,
        } => cmd_open(settings, key, order, buyer, seller, arbiter, reason),
        DisputeCommand::List { key } => cmd_list(settings, key),
        DisputeCommand::Rule {
            key,
            dispute,
            for_party,
        } => cmd_rule(settings, key, dispute, *for_party),
    }
}

fn cmd_open(
    settings: &Settings,
    key: &Path,
    order: &str,
    buyer: &str,
    seller: &str,
    arbiter: &str,
    reason: &str,
) -> Result<u8> {
    let opener = load_keypair(key)?;
    let buyer = parse_pubkey(buyer)?;
    let seller = parse_pubkey(seller)?;
    let arbiter = parse_pubkey(arbiter)?;
    let me = opener.public_key();
    let counterparty = if me == buyer {
        seller
    } else if me == seller {
        buyer
    } else {
        bail!("only the buyer or the seller can open a dispute");
    };

    let rumor = Rumor::new(
        me,
        UnixTimestamp::now(),
        EventKind::DisputeOpen,
        Tags::new()
            .with(Tag::pair("order", order))
            .with(Tag::new("p", [buyer.to_hex(), "buyer".to_string()]))
            .with(Tag::new("p", [seller.to_hex(), "seller".to_string()]))
            .with(Tag::new("p", [arbiter.to_hex(), "arbiter".to_string()])),
        reason,
    )
    .context("failed to build dispute event")?;

    let relay = FileRelay::new(&settings.relay_file);
    let mut keys = EphemeralKeyProvider::new();
    let outbox = Outbox::new(settings.wrap_policy).with_self_copy(settings.self_copy);
    outbox
        .send(&relay, &mut keys, &rumor, &opener, &arbiter)
        .context("failed to notify arbiter")?;
    outbox
        .clone()
        .with_self_copy(false)
        .send(&relay, &mut keys, &rumor, &opener, &counterparty)
        .context("failed to notify counterparty")?;

    println!("OK: opened dispute {}", rumor.id());
    Ok(0)
}

/// Disputes visible to `identity`, with rulings applied, plus the
/// decrypted inbox they were built from.
fn load_disputes(
    relay: &FileRelay,
    identity: &Ed25519KeyPair,
) -> Result<(DisputeManager, Vec<Rumor>)> {
    let rumors = received_rumors(relay, identity)?;
    let markers = relay
        .fetch(&EventFilter::new().kind(EventKind::DisputeResolution))
        .context("failed to fetch resolution markers")?;
    let manager = DisputeManager::new();
    manager.ingest_all(&rumors);
    manager.ingest_markers(&markers);
    tracing::debug!(
        disputes = manager.len(),
        markers = markers.len(),
        "rebuilt dispute state"
    );
    Ok((manager, rumors))
}

fn cmd_list(settings: &Settings, key: &Path) -> Result<u8> {
    let identity = load_keypair(key)?;
    let relay = FileRelay::new(&settings.relay_file);
    let (manager, _) = load_disputes(&relay, &identity)?;

    let disputes = manager.disputes();
    if disputes.is_empty() {
        println!("No disputes.");
    }
    for d in disputes {
        println!(
            "{}  order {}  {}  ({} message(s))",
            d.id(),
            d.order_id(),
            d.state(),
            d.message_count()
        );
        if let Some(ruling) = d.ruling() {
            println!("    ruled for {} at {}", ruling.for_party, ruling.issued_at);
        }
    }
    Ok(0)
}

fn cmd_rule(settings: &Settings, key: &Path, dispute: &str, for_party: Party) -> Result<u8> {
    let arbiter = load_keypair(key)?;
    let dispute_id = EventId::parse(dispute.trim())
        .with_context(|| format!("invalid dispute id {dispute:?}"))?;
    let relay = FileRelay::new(&settings.relay_file);
    let (manager, history) = load_disputes(&relay, &arbiter)?;

    let mut keys = EphemeralKeyProvider::new();
    let outbox = Outbox::new(settings.wrap_policy).with_self_copy(settings.self_copy);
    let receipt = manager
        .rule(
            &dispute_id,
            for_party,
            &arbiter,
            &history,
            &mut RulingContext::new(&relay, &mut keys, &outbox),
        )
        .with_context(|| format!("failed to rule on dispute {dispute_id}"))?;

    println!("OK: ruled dispute {} for {}", receipt.dispute_id, receipt.for_party);
    println!("  signed proofs: {}", receipt.share.inputs.len());
    println!("  ruling:        {}", receipt.delivery.rumor_id);
    println!("  marker:        {}", receipt.marker.id);
    Ok(0)
}
