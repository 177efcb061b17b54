// src/logging.rs

//! Global `tracing` subscriber setup.
//!
//! The effective level is the first of: the `--log-level` flag, a
//! parseable `GAVEL_LOG` environment variable, `info`. Everything goes to
//! stderr; stdout belongs to dry-run output.

use anyhow::Result;
use tracing::Level;

use crate::cli::LogLevel;

const LEVEL_ENV_VAR: &str = "GAVEL_LOG";

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(resolve_level(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Pick the max level from the CLI flag, falling back to the env var and
/// finally to `info`. `tracing::Level` already knows how to parse the
/// usual level names, so the env var goes straight through `FromStr`.
fn resolve_level(cli_level: Option<LogLevel>) -> Level {
    if let Some(lvl) = cli_level {
        return lvl.into();
    }

    std::env::var(LEVEL_ENV_VAR)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(Level::INFO)
}
