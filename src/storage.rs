//! Blob storage for snapshot files.
//!
//! Exports land in a blob store behind a small trait: upload bytes under
//! a name, mint a time-limited signed URL for a stored name, delete a
//! stored name. The bundled backend is a local directory; the URL it
//! mints carries the expiry and an opaque token for whatever serves the
//! file to enforce.
//!
//! Snapshot names embed a sortable timestamp, so lexicographic order is
//! chronological order and rotation can prune by name.

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SnapshotError;

/// Where exported snapshots live.
pub trait BlobStore {
    /// Store bytes under a name, returning a store-specific locator.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<String>;

    /// Produce a signed URL for a stored name, valid for `ttl_secs`.
    fn signed_url(&self, name: &str, ttl_secs: i64) -> Result<String>;

    /// Remove a stored name.
    fn delete(&self, name: &str) -> Result<()>;
}

/// Directory-backed blob store.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stored blob names, oldest first.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete all but the newest `keep` blobs. `keep == 0` disables
    /// rotation. Returns the deleted names.
    pub fn prune(&self, keep: usize) -> Result<Vec<String>> {
        if keep == 0 {
            return Ok(Vec::new());
        }

        let names = self.list()?;
        if names.len() <= keep {
            return Ok(Vec::new());
        }

        let mut deleted = Vec::new();
        for name in &names[..names.len() - keep] {
            self.delete(name)?;
            deleted.push(name.clone());
        }
        info!(deleted = deleted.len(), keep, "Pruned old snapshots");
        Ok(deleted)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            anyhow::bail!("invalid blob name: {}", name);
        }
        Ok(self.root.join(name))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)?;
        fs::write(&path, bytes)?;
        debug!(name, size = bytes.len(), "Stored blob");
        Ok(path.to_string_lossy().into_owned())
    }

    fn signed_url(&self, name: &str, ttl_secs: i64) -> Result<String> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(SnapshotError::BlobNotFound(path).into());
        }

        let expires = chrono::Utc::now().timestamp() + ttl_secs.max(0);
        let token = general_purpose::URL_SAFE_NO_PAD.encode(format!("{}:{}", name, expires));
        Ok(format!(
            "file://{}?expires={}&token={}",
            path.to_string_lossy(),
            expires,
            token
        ))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(SnapshotError::BlobNotFound(path).into());
        }
        fs::remove_file(&path)?;
        debug!(name, "Deleted blob");
        Ok(())
    }
}
