// src/lib.rs

pub mod auction;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod protocol;
pub mod sched;
pub mod server;
pub mod session;
pub mod task;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::server::Coordinator;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + validation
/// - the coordinator (listener, client sessions)
/// - auction construction and the schedule executor
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)?;

    if let Some(port) = args.port {
        cfg.coordinator.port = port;
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let coordinator = Coordinator::bind(cfg).await?;
    coordinator.run().await
}

/// Simple dry-run output: print coordinator settings, auctions and deps.
fn print_dry_run(cfg: &ConfigFile) {
    println!("gavel dry-run");
    println!("  coordinator.port = {}", cfg.coordinator.port);
    println!("  coordinator.max_clients = {}", cfg.coordinator.max_clients);
    println!(
        "  coordinator.max_wait_time_secs = {}",
        cfg.coordinator.max_wait_time_secs
    );
    println!("  coordinator.session_id = {}", cfg.coordinator.session_id);
    println!();

    println!("auctions ({}):", cfg.auction.len());
    for auction in cfg.auction.iter() {
        println!("  - {} ({})", auction.id, auction.kind);
        if !auction.start_after.is_empty() {
            println!("      start_after: {:?}", auction.start_after);
        }
        if !auction.end_with.is_empty() {
            println!("      end_with: {:?}", auction.end_with);
        }
        for (key, value) in auction.params.iter() {
            println!("      param {key} = {value}");
        }
    }

    debug!("dry-run complete (no execution)");
}
