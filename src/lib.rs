//! # Text Harvest
//!
//! A resumable, rate-limited bulk downloader for building local text corpora.
//! Given a list of URLs (or any opaque resource identifiers), it fetches each
//! one exactly once, stores the raw payload on disk under a deterministic
//! filesystem-safe name, and skips anything already stored. Interrupt it,
//! restart it, and it picks up where it left off.
//!
//! ## Features
//!
//! - Deterministic URL-to-filename mapping (human-readable slugs, hash-suffixed
//!   when truncation is needed)
//! - Idempotent "skip if already downloaded" behavior with no TTL or
//!   revalidation: once an entry is on disk it is never re-fetched
//! - Courtesy delay between remote calls and bounded retry with backoff on
//!   transient failures
//! - Atomic entry writes (temp file + rename) so an interrupted run never
//!   leaves a partial file behind
//! - Immediate cancellation that is never mistaken for a per-item failure
//!
//! ## Architecture
//!
//! The pipeline has two components:
//! 1. **Key resolution** ([`keys`]): maps an identifier to a stable storage
//!    location under the store root
//! 2. **Fetch-cache control** ([`controller`]): consults the [`store`], and on
//!    a miss rate-limits, invokes a [`fetch::Fetch`] implementation, retries
//!    per [`policy::FetchPolicy`], and persists the payload
//!
//! The remote side is an opaque seam: anything implementing [`fetch::Fetch`]
//! works, with [`fetch::HttpFetcher`] provided for plain HTTP GET.

pub mod controller;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod policy;
pub mod report;
pub mod store;

pub use controller::{get, get_all, Retrieved};
pub use error::{FetchFailure, HarvestError, StorageError};
pub use fetch::{Fetch, HttpFetcher};
pub use policy::FetchPolicy;
pub use store::Store;
