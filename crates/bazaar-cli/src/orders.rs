//! # Orders Subcommand
//!
//! Decrypts an identity's inbox and folds the order messages into one
//! consolidated view per order. With a status cache configured, the last
//! known status of each order persists across runs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use bazaar_state::{MemoryStatusCache, Order, OrderBook, StatusCache};

use crate::config::Settings;
use crate::keys::load_keypair;
use crate::received_rumors;
use crate::store::{FileRelay, FileStatusCache};

/// Arguments for `bazaar orders`.
#[derive(Args, Debug)]
pub struct OrdersArgs {
    /// Private key file of the identity to read for.
    #[arg(long)]
    pub key: PathBuf,
    /// Show only this order.
    #[arg(long)]
    pub order: Option<String>,
    /// Print orders as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// Execute `bazaar orders`.
pub fn run_orders(args: &OrdersArgs, settings: &Settings) -> Result<u8> {
    match &settings.status_cache {
        Some(path) => {
            let cache = FileStatusCache::open(path)
                .with_context(|| format!("failed to open status cache: {}", path.display()))?;
            reconcile(args, settings, OrderBook::new(cache))
        }
        None => reconcile(args, settings, OrderBook::new(MemoryStatusCache::new())),
    }
}

fn reconcile<C: StatusCache>(
    args: &OrdersArgs,
    settings: &Settings,
    book: OrderBook<C>,
) -> Result<u8> {
    let identity = load_keypair(&args.key)?;
    let relay = FileRelay::new(&settings.relay_file);
    let rumors = received_rumors(&relay, &identity)?;
    let report = book.ingest_all(&rumors);
    for (id, err) in &report.malformed {
        eprintln!("WARN: skipped malformed message {id}: {err}");
    }

    let orders: Vec<Order> = book
        .orders()
        .into_iter()
        .filter(|o| args.order.as_deref().map_or(true, |want| o.order_id().as_str() == want))
        .collect();

    if args.json {
        for order in &orders {
            println!("{}", order_json(order));
        }
        return Ok(0);
    }

    if orders.is_empty() {
        println!("No orders.");
    }
    for order in &orders {
        let amount = order
            .amount()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {:<9}  {}  x{}  last {}  ({} message(s))",
            order.order_id(),
            order.status(),
            amount,
            order.quantity(),
            order.last_event_timestamp(),
            order.contributing_messages().len()
        );
        if let Some(tracking) = order.details().tracking.get() {
            println!("    tracking: {tracking}");
        }
    }
    Ok(0)
}

fn order_json(order: &Order) -> serde_json::Value {
    let d = order.details();
    json!({
        "order_id": order.order_id().as_str(),
        "status": order.status(),
        "product": order.product().map(|p| p.to_string()),
        "seller": order.seller().map(|k| k.to_hex()),
        "buyer": order.buyer().map(|k| k.to_hex()),
        "amount": order.amount(),
        "quantity": order.quantity(),
        "escrow": order.escrow().map(|k| k.to_hex()),
        "title": d.title.get(),
        "address": d.address.get(),
        "tracking": d.tracking.get(),
        "payment_method": d.payment_method.get(),
        "last_event_timestamp": order.last_event_timestamp(),
        "source_message": order.source_message().id().as_str(),
        "messages": order.contributing_messages().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use crate::keys::{run_keygen, KeygenArgs};
    use crate::message::{run_send, SendArgs};
    use bazaar_core::OrderId;
    use bazaar_state::OrderStatus;

    #[test]
    fn orders_are_reconciled_and_status_cached() {
        let dir = tempfile::tempdir().unwrap();
        for prefix in ["buyer", "seller"] {
            run_keygen(&KeygenArgs {
                output: dir.path().to_path_buf(),
                prefix: prefix.into(),
            })
            .unwrap();
        }
        let cache_path = dir.path().join("status.json");
        let settings = Settings::resolve(
            None,
            Overrides {
                relay_file: Some(dir.path().join("relay.jsonl")),
                status_cache: Some(cache_path.clone()),
                wrap_jitter_secs: Some(0),
                ..Overrides::default()
            },
        )
        .unwrap();

        let seller_pub = dir.path().join("seller.pub").display().to_string();
        let buyer_pub = dir.path().join("buyer.pub").display().to_string();
        run_send(
            &SendArgs {
                key: dir.path().join("buyer.key"),
                to: seller_pub,
                subject: Some("order-payment".into()),
                order: Some("o1".into()),
                tags: vec!["amount=500,sats".into()],
                message: "paid".into(),
            },
            &settings,
        )
        .unwrap();
        run_send(
            &SendArgs {
                key: dir.path().join("seller.key"),
                to: buyer_pub,
                subject: Some("shipping-info".into()),
                order: Some("o1".into()),
                tags: vec!["tracking=1Z999".into()],
                message: "on its way".into(),
            },
            &settings,
        )
        .unwrap();

        let args = OrdersArgs {
            key: dir.path().join("seller.key"),
            order: None,
            json: true,
        };
        assert_eq!(run_orders(&args, &settings).unwrap(), 0);

        let cache = FileStatusCache::open(&cache_path).unwrap();
        assert_eq!(
            cache
                .get_cached_status(&OrderId::new("o1").unwrap())
                .unwrap(),
            Some(OrderStatus::Shipped)
        );
    }
}
