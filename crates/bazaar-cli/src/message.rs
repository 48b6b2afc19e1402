//! # Messaging Subcommands
//!
//! `send` builds a direct-message rumor and publishes it gift-wrapped;
//! `inbox` decrypts what was received and groups it by counterparty.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use bazaar_core::{EventKind, Subject, Tag, Tags, UnixTimestamp};
use bazaar_crypto::EphemeralKeyProvider;
use bazaar_state::ConversationIndex;
use bazaar_transport::{Outbox, Rumor};

use crate::config::Settings;
use crate::keys::{load_keypair, parse_pubkey};
use crate::received_rumors;
use crate::store::FileRelay;

/// Arguments for `bazaar send`.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Sender's private key file.
    #[arg(long)]
    pub key: PathBuf,
    /// Recipient public key (hex or `.pub` file).
    #[arg(long)]
    pub to: String,
    /// Message subject (e.g. `order-payment`).
    #[arg(long)]
    pub subject: Option<String>,
    /// Order id the message belongs to.
    #[arg(long)]
    pub order: Option<String>,
    /// Extra tag as `key=value[,value...]`. Repeatable.
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,
    /// Message body.
    pub message: String,
}

/// Arguments for `bazaar inbox`.
#[derive(Args, Debug)]
pub struct InboxArgs {
    /// Private key file of the identity to read for.
    #[arg(long)]
    pub key: PathBuf,
    /// Show the full thread with this counterparty.
    #[arg(long)]
    pub with: Option<String>,
    /// Only messages created at or after this Unix time.
    #[arg(long)]
    pub since: Option<u64>,
    /// Print messages as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// Execute `bazaar send`.
pub fn run_send(args: &SendArgs, settings: &Settings) -> Result<u8> {
    let sender = load_keypair(&args.key)?;
    let recipient = parse_pubkey(&args.to)?;

    let mut tags = Tags::new().with(Tag::pair("p", recipient.to_hex()));
    if let Some(subject) = &args.subject {
        if Subject::parse(subject).is_none() {
            bail!("unknown subject {subject:?}");
        }
        tags.push(Tag::pair("subject", subject.as_str()));
    }
    if let Some(order) = &args.order {
        tags.push(Tag::pair("order", order.as_str()));
    }
    for raw in &args.tags {
        tags.push(parse_tag(raw)?);
    }

    let rumor = Rumor::new(
        sender.public_key(),
        UnixTimestamp::now(),
        EventKind::RumorDm,
        tags,
        args.message.as_str(),
    )
    .context("failed to build message")?;

    let relay = FileRelay::new(&settings.relay_file);
    let outbox = Outbox::new(settings.wrap_policy).with_self_copy(settings.self_copy);
    let mut keys = EphemeralKeyProvider::new();
    let receipt = outbox
        .send(&relay, &mut keys, &rumor, &sender, &recipient)
        .context("failed to send message")?;

    println!("OK: sent {}", receipt.rumor_id);
    for id in &receipt.envelope_ids {
        println!("  envelope {id}");
    }
    Ok(0)
}

/// Execute `bazaar inbox`.
pub fn run_inbox(args: &InboxArgs, settings: &Settings) -> Result<u8> {
    let identity = load_keypair(&args.key)?;
    let relay = FileRelay::new(&settings.relay_file);
    let since = UnixTimestamp::from_secs(args.since.unwrap_or(0));
    let rumors: Vec<Rumor> = received_rumors(&relay, &identity)?
        .into_iter()
        .filter(|r| r.created_at() >= since)
        .collect();

    let index = ConversationIndex::new(identity.public_key());
    for rumor in &rumors {
        index.ingest(rumor);
    }

    if let Some(with) = &args.with {
        let counterparty = parse_pubkey(with)?;
        for rumor in index.messages(&counterparty) {
            print_rumor(&rumor, args.json)?;
        }
        return Ok(0);
    }

    if args.json {
        for rumor in &rumors {
            print_rumor(rumor, true)?;
        }
        return Ok(0);
    }

    let conversations = index.conversations();
    if conversations.is_empty() {
        println!("No messages.");
    }
    for c in conversations {
        println!(
            "{}  {} message(s), last {}",
            c.counterparty, c.messages, c.last_message_at
        );
    }
    Ok(0)
}

fn print_rumor(rumor: &Rumor, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(rumor)?);
    } else {
        let subject = rumor.tags().value("subject").unwrap_or("-");
        println!(
            "[{}] {} ({}): {}",
            rumor.created_at(),
            rumor.author(),
            subject,
            rumor.content()
        );
    }
    Ok(())
}

/// Parse `key=value[,value...]` into a tag.
pub fn parse_tag(raw: &str) -> Result<Tag> {
    let Some((key, values)) = raw.split_once('=') else {
        bail!("tag {raw:?} must look like key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("tag {raw:?} has an empty key");
    }
    Ok(Tag::new(key, values.split(',').map(str::trim)))
}
