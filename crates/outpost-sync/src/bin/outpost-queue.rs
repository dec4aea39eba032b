//! # Queue Inspector
//!
//! Operator tool for the local outbox: inspect counts, list permanently
//! failed items, retry or remove them, and clean up.
//!
//! ## Usage
//! ```bash
//! # Counts per status
//! cargo run -p outpost-sync --bin outpost-queue -- stats
//!
//! # List failed items with their last error
//! cargo run -p outpost-sync --bin outpost-queue -- failed
//!
//! # Re-submit a failed item (new id, attempts reset)
//! cargo run -p outpost-sync --bin outpost-queue -- retry 550e8400-e29b-41d4-a716-446655440000
//!
//! # Point at a specific database or config file
//! cargo run -p outpost-sync --bin outpost-queue -- --db ./data/outpost.db stats
//! ```

use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use outpost_core::validation::validate_item_id;
use outpost_store::Database;
use outpost_sync::{CacheLayer, QueueManager, SyncConfig};

const USAGE: &str = "\
Outpost Queue Inspector

Usage: outpost-queue [OPTIONS] <COMMAND>

Commands:
  stats           Show item counts per status
  failed          List permanently failed items
  retry <ID>      Re-submit a failed item
  remove <ID>     Delete a failed item
  clear-synced    Delete every synced item
  purge-cache     Delete expired cache entries (--all for every entry)

Options:
  -d, --db <PATH>       Database file path (default: platform data dir)
  -c, --config <PATH>   Config file path (default: platform config dir)
  -h, --help            Show this help message";

/// Parsed subcommand.
enum Command {
    Stats,
    Failed,
    Retry(String),
    Remove(String),
    ClearSynced,
    PurgeCache { all: bool },
}

/// Initializes tracing; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,outpost=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut all = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--all" => all = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match (positional.first().map(String::as_str), positional.get(1)) {
        (Some("stats"), _) => Command::Stats,
        (Some("failed"), _) => Command::Failed,
        (Some("retry"), Some(id)) => Command::Retry(id.clone()),
        (Some("remove"), Some(id)) => Command::Remove(id.clone()),
        (Some("clear-synced"), _) => Command::ClearSynced,
        (Some("purge-cache"), _) => Command::PurgeCache { all },
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    init_tracing();

    let mut config = SyncConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.store.database_path = Some(path);
    }

    let db = Database::new(config.store_config()?).await?;
    let queue = QueueManager::new(&db);

    match command {
        Command::Stats => {
            let stats = queue.get_stats().await?;
            println!("pending  {:>8}", stats.pending);
            println!("syncing  {:>8}", stats.syncing);
            println!("synced   {:>8}", stats.synced);
            println!("failed   {:>8}", stats.failed);
            println!("total    {:>8}", stats.total);
            println!("unsent   {:>8}", stats.outstanding());
        }
        Command::Failed => {
            let failed = queue.get_failed().await?;
            if failed.is_empty() {
                println!("No failed items");
            }
            for item in failed {
                println!(
                    "{}  {:<16} attempts={} created={} error={}",
                    item.id,
                    item.operation_type.as_str(),
                    item.attempts,
                    item.created_at.to_rfc3339(),
                    item.error.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Retry(id) => {
            validate_item_id(&id)?;
            let fresh = queue.requeue_failed(&id).await?;
            println!("Requeued {} as {}", id, fresh.id);
        }
        Command::Remove(id) => {
            validate_item_id(&id)?;
            queue.remove_failed(&id).await?;
            println!("Removed {}", id);
        }
        Command::ClearSynced => {
            let removed = queue.clear_synced().await?;
            println!("Removed {} synced items", removed);
        }
        Command::PurgeCache { all } => {
            let cache = CacheLayer::new(&db).with_default_ttl(config.default_ttl());
            let removed = if all {
                cache.clear().await?
            } else {
                cache.clear_expired_cache().await?
            };
            println!("Removed {} cache entries", removed);
        }
    }

    db.close().await;
    Ok(())
}
