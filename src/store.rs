//! On-disk cache of fetched payloads.
//!
//! One flat directory, one file per identifier, named by storage key, content
//! is the raw payload with no metadata sidecar. Entries are written once and
//! never mutated or deleted by this crate; callers wanting timestamps or
//! provenance layer them on top.
//!
//! Writes go through a temp file in the store root followed by a rename, so a
//! process killed mid-download never leaves a partial entry visible. Temp
//! names start with a dot, which no storage key can, so they are never
//! mistaken for entries.

use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::keys;

/// Handle on a store root directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open (creating if necessary) the store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails with a [`StorageError`] if `root` exists but is not a directory,
    /// or if it cannot be created. A failure here aborts a batch before any
    /// fetching starts.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        keys::ensure_root(&root)?;
        info!(root = %root.display(), "Store root ready");
        Ok(Self { root })
    }

    /// The directory this store writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location for an identifier's entry.
    pub fn entry_path(&self, identifier: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(keys::storage_key(identifier)?))
    }

    /// Whether an entry for `identifier` is already on disk.
    pub async fn contains(&self, identifier: &str) -> Result<bool, StorageError> {
        let path = self.entry_path(identifier)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Read an entry back verbatim.
    ///
    /// # Errors
    ///
    /// [`StorageError::ReadEntry`] if the entry is missing or unreadable.
    pub async fn read(&self, identifier: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.entry_path(identifier)?;
        fs::read(&path)
            .await
            .map_err(|source| StorageError::ReadEntry { path, source })
    }

    /// Persist an entry atomically: write a temp file next to the final
    /// location, then rename into place. The rename is the commit point; until
    /// it happens no reader can observe the entry, and after it the entry is
    /// complete.
    #[instrument(level = "debug", skip_all, fields(%identifier))]
    pub async fn write_atomic(
        &self,
        identifier: &str,
        content: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.entry_path(identifier)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("entry");
        let nonce: u32 = rand::rng().random();
        let tmp = self.root.join(format!(".{file_name}.{nonce:08x}.tmp"));

        if let Err(source) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::WriteEntry { path, source });
        }
        if let Err(source) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::WriteEntry { path, source });
        }

        debug!(path = %path.display(), bytes = content.len(), "Cache entry committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let (_dir, store) = open_temp_store();
        store
            .write_atomic("https://example.com/a", b"<html>hello</html>")
            .await
            .unwrap();
        assert!(store.contains("https://example.com/a").await.unwrap());
        let content = store.read("https://example.com/a").await.unwrap();
        assert_eq!(content, b"<html>hello</html>");
    }

    #[tokio::test]
    async fn test_missing_entry_is_a_read_error() {
        let (_dir, store) = open_temp_store();
        assert!(!store.contains("https://example.com/nope").await.unwrap());
        assert!(matches!(
            store.read("https://example.com/nope").await,
            Err(StorageError::ReadEntry { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_temp_files_survive_a_write() {
        let (_dir, store) = open_temp_store();
        store
            .write_atomic("https://example.com/a", b"payload")
            .await
            .unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_temp_file_is_not_an_entry() {
        // Simulates a process killed between the temp write and the rename:
        // the leftover temp file must not read back as a cache entry.
        let (_dir, store) = open_temp_store();
        let key = crate::keys::storage_key("https://example.com/a").unwrap();
        std::fs::write(
            store.root().join(format!(".{key}.deadbeef.tmp")),
            b"partial",
        )
        .unwrap();
        assert!(!store.contains("https://example.com/a").await.unwrap());
        assert!(store.read("https://example.com/a").await.is_err());
    }

    #[tokio::test]
    async fn test_open_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("occupied");
        std::fs::write(&occupied, b"file").unwrap();
        assert!(matches!(
            Store::open(&occupied),
            Err(StorageError::NotADirectory { .. })
        ));
    }
}
