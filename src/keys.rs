//! Deterministic identifier-to-filename resolution.
//!
//! Every resource identifier (usually a URL) maps to exactly one storage key:
//! a lowercase, hyphenated, filesystem-safe file name. The same identifier
//! always yields the same key, across calls and across process restarts, which
//! is what makes interrupted harvests resumable.
//!
//! Keys are human-readable slugs so a store directory can be browsed by eye:
//!
//! ```text
//! https://example.com/a?b=c  ->  https-example-com-a-b-c
//! ```
//!
//! Slugs that would exceed [`MAX_KEY_LEN`] are truncated and suffixed with a
//! short SHA-256 digest of the full identifier, so two long URLs sharing a
//! common prefix still resolve to distinct keys. Short slugs skip the suffix;
//! the residual risk of two distinct short URLs slugifying identically is
//! accepted in exchange for readable names.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StorageError;

/// Maximum length of a storage key in bytes. Well under every mainstream
/// filesystem's 255-byte filename limit, leaving headroom for the temp-file
/// decoration used during atomic writes.
pub const MAX_KEY_LEN: usize = 120;

/// Length of the hex digest suffix appended to truncated keys.
const HASH_SUFFIX_LEN: usize = 12;

/// Convert an identifier to a filesystem-safe slug.
///
/// Lowercases the input, keeps ASCII alphanumerics, and collapses every other
/// run of characters into a single hyphen. No leading or trailing hyphen is
/// ever produced.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("https://example.com/a?b=c"), "https-example-com-a-b-c");
/// assert_eq!(slugify("Convert to /file name!.please"), "convert-to-file-name-please");
/// ```
pub fn slugify(identifier: &str) -> String {
    let mut slug = String::with_capacity(identifier.len());
    let mut pending_hyphen = false;
    for c in identifier.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Derive the storage key for an identifier.
///
/// The key is the slug of the identifier, bounded to [`MAX_KEY_LEN`] bytes.
/// Oversized slugs are truncated and suffixed with a short SHA-256 digest of
/// the original identifier; identifiers whose slug is empty (all reserved
/// characters) fall back to the digest alone.
///
/// # Errors
///
/// Returns [`StorageError::EmptyIdentifier`] for an empty input, since there
/// is nothing to key on.
pub fn storage_key(identifier: &str) -> Result<String, StorageError> {
    if identifier.is_empty() {
        return Err(StorageError::EmptyIdentifier);
    }

    let slug = slugify(identifier);
    if slug.is_empty() {
        return Ok(hash_suffix(identifier));
    }
    if slug.len() <= MAX_KEY_LEN {
        return Ok(slug);
    }

    // Truncation point leaves room for "-" plus the digest.
    let keep = MAX_KEY_LEN - HASH_SUFFIX_LEN - 1;
    let mut truncated = slug[..keep].to_string();
    while truncated.ends_with('-') {
        truncated.pop();
    }
    let key = format!("{}-{}", truncated, hash_suffix(identifier));
    debug!(identifier, key = %key, "Truncated oversized slug with hash suffix");
    Ok(key)
}

/// Resolve an identifier to its on-disk location under `store_root`.
///
/// Creates `store_root` (and intermediate directories) if absent. This is the
/// only side effect; the returned path is a pure function of the inputs.
///
/// # Errors
///
/// - [`StorageError::NotADirectory`] if `store_root` exists but is a file
/// - [`StorageError::CreateRoot`] if directory creation fails
/// - [`StorageError::EmptyIdentifier`] for an empty identifier
pub fn resolve(identifier: &str, store_root: &Path) -> Result<PathBuf, StorageError> {
    ensure_root(store_root)?;
    Ok(store_root.join(storage_key(identifier)?))
}

/// Create the store root if missing, rejecting a non-directory path.
pub fn ensure_root(store_root: &Path) -> Result<(), StorageError> {
    if store_root.exists() && !store_root.is_dir() {
        return Err(StorageError::NotADirectory {
            path: store_root.to_path_buf(),
        });
    }
    std::fs::create_dir_all(store_root).map_err(|source| StorageError::CreateRoot {
        path: store_root.to_path_buf(),
        source,
    })
}

fn hash_suffix(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut hex = String::with_capacity(HASH_SUFFIX_LEN);
    for byte in digest.iter().take(HASH_SUFFIX_LEN / 2) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_url() {
        assert_eq!(
            slugify("https://example.com/a?b=c"),
            "https-example-com-a-b-c"
        );
    }

    #[test]
    fn test_slugify_collapses_runs_and_trims() {
        assert_eq!(
            slugify("Convert to /file name!.please.html"),
            "convert-to-file-name-please-html"
        );
        assert_eq!(slugify("--already-hyphenated--"), "already-hyphenated");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_storage_key_is_deterministic() {
        let a = storage_key("https://example.com/a?b=c").unwrap();
        let b = storage_key("https://example.com/a?b=c").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "https-example-com-a-b-c");
    }

    #[test]
    fn test_storage_key_rejects_empty_identifier() {
        assert!(matches!(
            storage_key(""),
            Err(StorageError::EmptyIdentifier)
        ));
    }

    #[test]
    fn test_storage_key_all_reserved_falls_back_to_digest() {
        let key = storage_key("???").unwrap();
        assert_eq!(key.len(), 12);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_long_identifiers_stay_bounded_and_distinct() {
        let base = format!("https://example.com/{}", "x".repeat(300));
        let a = storage_key(&format!("{base}?page=1")).unwrap();
        let b = storage_key(&format!("{base}?page=2")).unwrap();
        assert!(a.len() <= MAX_KEY_LEN);
        assert!(b.len() <= MAX_KEY_LEN);
        // Same slug prefix, different digest suffix.
        assert_ne!(a, b);
        assert_eq!(a[..20], b[..20]);
    }

    #[test]
    fn test_resolve_creates_root_and_joins_key() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("html");
        let path = resolve("https://example.com/a?b=c", &root).unwrap();
        assert!(root.is_dir());
        assert_eq!(path, root.join("https-example-com-a-b-c"));
    }

    #[test]
    fn test_resolve_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let first = resolve("https://example.com/x", &root).unwrap();
        let second = resolve("https://example.com/x", &root).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_rejects_file_as_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("occupied");
        std::fs::write(&root, b"not a directory").unwrap();
        assert!(matches!(
            resolve("https://example.com", &root),
            Err(StorageError::NotADirectory { .. })
        ));
    }
}
