//! # bazaar CLI entry point
//!
//! Parses command-line arguments, resolves settings, and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bazaar_cli::config::{Overrides, Settings};
use bazaar_cli::dispute::{run_dispute, DisputeArgs};
use bazaar_cli::keys::{run_keygen, KeygenArgs};
use bazaar_cli::message::{run_inbox, run_send, InboxArgs, SendArgs};
use bazaar_cli::orders::{run_orders, OrdersArgs};

/// Bazaar Stack CLI
///
/// Private marketplace messaging: gift-wrapped direct messages, order
/// reconciliation, and arbiter-run disputes over a local relay file.
#[derive(Parser, Debug)]
#[command(name = "bazaar", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relay file (JSON lines) to publish to and read from.
    #[arg(long, global = true)]
    relay: Option<PathBuf>,

    /// File that persists the last known status of each order.
    #[arg(long, global = true)]
    status_cache: Option<PathBuf>,

    /// Maximum backdate for envelope timestamps, in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    wrap_jitter: Option<u64>,

    /// Do not keep a sender copy of outgoing messages.
    #[arg(long, global = true)]
    no_self_copy: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an identity key pair.
    Keygen(KeygenArgs),

    /// Gift-wrap and publish a direct message.
    Send(SendArgs),

    /// Decrypt received messages and list conversations.
    Inbox(InboxArgs),

    /// Reconcile order messages into consolidated orders.
    Orders(OrdersArgs),

    /// Open, list, and rule on disputes.
    Dispute(DisputeArgs),
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            relay_file: self.relay.clone(),
            status_cache: self.status_cache.clone(),
            wrap_jitter_secs: self.wrap_jitter,
            no_self_copy: self.no_self_copy,
        }
    }

    fn settings(&self) -> anyhow::Result<Settings> {
        let settings = Settings::resolve(self.config.as_deref(), self.overrides())?;
        tracing::debug!(
            relay = %settings.relay_file.display(),
            jitter = settings.wrap_policy.max_backdate_secs,
            self_copy = settings.self_copy,
            "resolved settings"
        );
        Ok(settings)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("bazaar CLI starting");

    match dispatch(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn dispatch(cli: &Cli) -> anyhow::Result<u8> {
    match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Send(args) => run_send(args, &cli.settings()?),
        Commands::Inbox(args) => run_inbox(args, &cli.settings()?),
        Commands::Orders(args) => run_orders(args, &cli.settings()?),
        Commands::Dispute(args) => run_dispute(args, &cli.settings()?),
    }
}
