//! Reporting utilities for Azure DevOps teams.
//!
//! Two binaries share this crate: `pr-report` builds a self-contained
//! HTML pull-request report, and `time-report` prints a per-day digest
//! of development activity assembled from Azure DevOps, Claude Code
//! history, local git repositories and the MS365 calendar.

pub mod activity;
pub mod aggregate;
pub mod cli;
pub mod collect;
pub mod config;
pub mod devops;
pub mod error;
pub mod range;
pub mod render;
pub mod usage;

use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr, keeping stdout clean for report output.
/// RUST_LOG overrides the verbosity flags when set.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
