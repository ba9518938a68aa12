//! # Text Harvest
//!
//! Command-line front end for the resumable fetch cache. Reads a newline
//! delimited list of URLs, downloads each one that is not already in the
//! store, and optionally writes a JSON report of what happened.
//!
//! ## Usage
//!
//! ```sh
//! text_harvest -i urls.txt -s ./fox-html -r report.json
//! ```
//!
//! ## Behavior
//!
//! 1. **Resolve**: each URL maps to a deterministic filename in the store
//! 2. **Skip**: anything already on disk is never re-downloaded
//! 3. **Fetch**: misses are downloaded sequentially with a courtesy delay,
//!    retried with backoff on transient failure
//! 4. **Report**: per-item outcomes are logged and optionally written as JSON
//!
//! Ctrl-C stops the run between suspension points; entries already committed
//! stay on disk, so the next run resumes where this one stopped.

use std::error::Error;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};
use url::Url;

use text_harvest::report::{write_report, BatchReport};
use text_harvest::{get_all, FetchPolicy, HttpFetcher, Store};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("text_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.input, ?args.store_root, "Parsed CLI arguments");

    // --- Policy: config file first, flags on top ---
    let base_policy = match &args.config {
        Some(path) => {
            let policy = FetchPolicy::from_yaml_file(path)?;
            info!(config_path = %path, "Loaded policy from config file");
            policy
        }
        None => FetchPolicy::default(),
    };
    let policy = args.apply_overrides(base_policy);
    info!(
        inter_request_delay_secs = policy.inter_request_delay_secs,
        retry_max_attempts = policy.retry_max_attempts,
        retry_backoff_secs = policy.retry_backoff_secs,
        "Harvest policy"
    );

    // Early check: the store root must be usable before any fetching starts.
    let store = match Store::open(&args.store_root) {
        Ok(store) => store,
        Err(e) => {
            error!(
                store_root = %args.store_root,
                error = %e,
                "Store root is not usable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    };

    // ---- Read the identifier list ----
    let identifiers = read_identifier_list(&args.input).await?;
    info!(count = identifiers.len(), input = %args.input, "Loaded identifier list");
    if identifiers.is_empty() {
        warn!("Nothing to harvest");
        return Ok(());
    }

    // ---- Ctrl-C trips the cancellation token ----
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; stopping after the current item");
                cancel.cancel();
            }
        });
    }

    // ---- Harvest ----
    let fetcher = HttpFetcher::new();
    let results = get_all(&identifiers, &fetcher, &store, &policy, &cancel).await;

    let report = BatchReport::from_results(&results);
    info!(
        total = report.total,
        cached = report.cached,
        fetched = report.fetched,
        failed = report.failed,
        cancelled = report.cancelled,
        "Harvest finished"
    );
    for item in report.items.iter().filter(|i| i.error.is_some()) {
        warn!(identifier = %item.identifier, reason = %item.error.as_deref().unwrap_or(""), "Item failed");
    }

    // Partial results still get reported; nothing already cached is lost.
    if let Some(ref path) = args.report {
        if let Err(e) = write_report(&report, path).await {
            error!(path = %path, error = %e, "Failed to write report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    if cancel.is_cancelled() {
        warn!("Run was cancelled; re-run the same command to resume");
    }

    Ok(())
}

/// Read a newline-delimited identifier list, skipping blanks and `#` comments.
/// Lines that do not parse as URLs are dropped with a warning rather than
/// poisoning the batch.
async fn read_identifier_list(path: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let mut identifiers = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Url::parse(line) {
            Ok(_) => identifiers.push(line.to_string()),
            Err(e) => warn!(line, error = %e, "Skipping line that is not a URL"),
        }
    }
    Ok(identifiers)
}
