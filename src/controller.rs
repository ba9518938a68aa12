//! Fetch-cache control loop.
//!
//! [`get`] is the heart of the pipeline: check the store, and on a miss pause,
//! fetch, retry transient failures with backoff, and commit the payload
//! atomically. [`get_all`] runs a whole identifier list through [`get`],
//! strictly sequentially, surviving per-item failures but stopping dead on
//! cancellation.
//!
//! # Retry strategy
//!
//! A permanent failure (404, bad URL) ends the item immediately; there is no
//! point burning the retry budget on it. Transient failures are retried up to
//! the policy's attempt count, with the backoff pause between attempts. The
//! cache is only ever written on success, so a failed item leaves no poisoned
//! entry behind.
//!
//! # Cancellation
//!
//! The courtesy delay, the backoff pause, and the in-flight fetch are the
//! suspension points; each races against the caller's [`CancellationToken`].
//! Cancellation always surfaces as [`HarvestError::Cancelled`] and is never
//! folded into a per-item fetch failure, so "stop everything" stays
//! distinguishable from "this one item failed".

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::HarvestError;
use crate::fetch::Fetch;
use crate::policy::FetchPolicy;
use crate::store::Store;

/// A payload plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieved {
    /// Served from the store; no remote call was made.
    Cached(Vec<u8>),
    /// Freshly fetched from the remote and committed to the store.
    Fetched(Vec<u8>),
}

impl Retrieved {
    /// The payload bytes, wherever they came from.
    pub fn content(&self) -> &[u8] {
        match self {
            Retrieved::Cached(c) | Retrieved::Fetched(c) => c,
        }
    }

    /// Consume into the payload bytes.
    pub fn into_content(self) -> Vec<u8> {
        match self {
            Retrieved::Cached(c) | Retrieved::Fetched(c) => c,
        }
    }

    /// True when the payload was already on disk.
    pub fn was_cached(&self) -> bool {
        matches!(self, Retrieved::Cached(_))
    }
}

/// Retrieve one identifier, from the store if possible, from the remote
/// otherwise.
///
/// # Algorithm
///
/// 1. Cache hit: return the stored payload verbatim. No freshness check, no
///    revalidation; an entry on disk is never re-downloaded.
/// 2. Cache miss: wait the courtesy delay, then call the fetcher.
/// 3. Success: commit atomically to the store and return the payload.
/// 4. Transient failure: back off and retry, up to the policy's attempt
///    budget.
///
/// # Errors
///
/// - [`HarvestError::Storage`] if the store cannot be read or written; never
///   retried
/// - [`HarvestError::Fetch`] once the attempt budget is exhausted (or at the
///   first permanent failure), carrying the identifier and the last
///   underlying failure
/// - [`HarvestError::Cancelled`] as soon as the token trips at any
///   suspension point
#[instrument(level = "info", skip_all, fields(%identifier))]
pub async fn get<F: Fetch>(
    identifier: &str,
    fetcher: &F,
    store: &Store,
    policy: &FetchPolicy,
    cancel: &CancellationToken,
) -> Result<Retrieved, HarvestError> {
    if cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }

    if store.contains(identifier).await? {
        debug!("Cache hit");
        return Ok(Retrieved::Cached(store.read(identifier).await?));
    }

    let total_t0 = Instant::now();
    let max_attempts = policy.retry_max_attempts.max(1);

    cancellable_sleep(policy.inter_request_delay(), cancel).await?;

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let attempt_t0 = Instant::now();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
            outcome = fetcher.fetch(identifier) => outcome,
        };

        match outcome {
            Ok(content) => {
                store.write_atomic(identifier, &content).await?;
                info!(
                    attempt,
                    bytes = content.len(),
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    "Fetched and cached"
                );
                return Ok(Retrieved::Fetched(content));
            }
            Err(failure) => {
                let exhausted = attempt >= max_attempts || !failure.is_transient();
                if exhausted {
                    warn!(
                        attempt,
                        max = max_attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %failure,
                        "Fetch failed for good"
                    );
                    return Err(HarvestError::Fetch {
                        identifier: identifier.to_string(),
                        attempts: attempt,
                        source: failure,
                    });
                }

                let delay = policy.backoff_delay(attempt);
                warn!(
                    attempt,
                    max = max_attempts,
                    elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                    ?delay,
                    error = %failure,
                    "Fetch attempt failed; backing off"
                );
                cancellable_sleep(delay, cancel).await?;
            }
        }
    }
}

/// Run a list of identifiers through [`get`], one at a time, in input order.
///
/// Per-item fetch failures are recorded and the batch moves on; cancellation
/// stops the batch immediately, with the in-flight item recorded as cancelled
/// and the remainder never attempted. Entries cached by earlier items are
/// already committed and survive whatever happens later.
#[instrument(level = "info", skip_all, fields(count = identifiers.len()))]
pub async fn get_all<F: Fetch>(
    identifiers: &[String],
    fetcher: &F,
    store: &Store,
    policy: &FetchPolicy,
    cancel: &CancellationToken,
) -> Vec<(String, Result<Retrieved, HarvestError>)> {
    let mut results = Vec::with_capacity(identifiers.len());

    let mut outcomes = stream::iter(identifiers)
        .then(|identifier| async move {
            let outcome = get(identifier, fetcher, store, policy, cancel).await;
            (identifier.clone(), outcome)
        })
        .boxed_local();

    while let Some((identifier, outcome)) = outcomes.next().await {
        let stop = outcome.as_ref().is_err_and(|e| e.is_cancelled());
        if let Err(e) = &outcome {
            if !e.is_cancelled() {
                warn!(%identifier, error = %e, "Item failed; continuing batch");
            }
        }
        results.push((identifier, outcome));
        if stop {
            warn!(
                completed = results.len(),
                total = identifiers.len(),
                "Batch cancelled"
            );
            break;
        }
    }

    results
}

/// Sleep that loses the race against cancellation.
async fn cancellable_sleep(delay: Duration, cancel: &CancellationToken) -> Result<(), HarvestError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(HarvestError::Cancelled),
        _ = sleep(delay) => Ok(()),
    }
}
