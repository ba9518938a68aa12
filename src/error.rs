//! Error taxonomy for the fetch-cache pipeline.
//!
//! Three failure classes cross the public API:
//! - [`StorageError`]: the local store is unusable. Never retried; retrying a
//!   permissions problem wastes time.
//! - [`HarvestError::Fetch`]: the remote fetch failed after the retry budget
//!   was exhausted. Recorded per-item in batch mode.
//! - [`HarvestError::Cancelled`]: caller-initiated stop. Always propagates
//!   immediately and is never converted into a per-item fetch failure.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The local store could not be used.
///
/// Storage errors escalate immediately: they abort the affected item, and
/// abort the whole batch when they prevent opening the store root at startup.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store root path exists but is not a directory.
    #[error("store root {path} exists but is not a directory")]
    NotADirectory { path: PathBuf },

    /// The store root (or a parent) could not be created.
    #[error("failed to create store root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An identifier was empty; there is nothing to derive a storage key from.
    #[error("identifier is empty")]
    EmptyIdentifier,

    /// A cache entry could not be read back from disk.
    #[error("failed to read cache entry {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A cache entry could not be written or renamed into place.
    #[error("failed to write cache entry {path}: {source}")]
    WriteEntry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a single fetch attempt, as reported by a [`crate::fetch::Fetch`]
/// implementation.
///
/// Transient failures (connection reset, timeout, 5xx, 429) are retried up to
/// the policy's attempt budget. Permanent failures (malformed identifier, 404)
/// escalate immediately since retrying cannot help.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The attempt failed in a way that may succeed on retry.
    #[error("transient: {0}")]
    Transient(String),

    /// The attempt failed in a way that no retry can fix.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl FetchFailure {
    /// True when the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchFailure::Transient(_))
    }
}

/// Top-level error surfaced by [`crate::controller::get`].
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The local store failed; see [`StorageError`] for the retry stance.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The remote fetch failed for `identifier` after `attempts` calls to the
    /// fetcher. Carries the last underlying failure.
    #[error("fetch failed for {identifier} after {attempts} attempt(s): {source}")]
    Fetch {
        identifier: String,
        attempts: u32,
        #[source]
        source: FetchFailure,
    },

    /// The caller requested a stop. Propagates through every layer untouched.
    #[error("harvest cancelled")]
    Cancelled,
}

impl HarvestError {
    /// True for caller-initiated cancellation, which batch processing must
    /// treat as "stop everything" rather than "this one item failed".
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HarvestError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failure_transience() {
        assert!(FetchFailure::Transient("timed out".into()).is_transient());
        assert!(!FetchFailure::Permanent("404".into()).is_transient());
    }

    #[test]
    fn test_fetch_error_display_names_identifier() {
        let e = HarvestError::Fetch {
            identifier: "https://example.com/a".into(),
            attempts: 3,
            source: FetchFailure::Transient("connection reset".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("https://example.com/a"));
        assert!(msg.contains("3 attempt(s)"));
    }

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(HarvestError::Cancelled.is_cancelled());
        let storage: HarvestError = StorageError::EmptyIdentifier.into();
        assert!(!storage.is_cancelled());
    }
}
