use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::Result;
use crate::fetch::Fetch;

/// Hex SHA-256 of the url; the cached file's name.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(cache_key(url))
    }

    /// Returns the cached file for `url`, fetching and writing it first if absent.
    pub fn ensure(&self, url: &str, fetcher: &dyn Fetch) -> Result<PathBuf> {
        let path = self.path_for(url);
        if path.is_file() {
            debug!(url, path = %path.display(), "cache hit");
            return Ok(path);
        }

        let bytes = fetcher.fetch(url)?;
        self.write_atomic(&path, &bytes)?;
        info!(url, path = %path.display(), bytes = bytes.len(), "cached");
        Ok(path)
    }

    // readers only ever see a complete file; concurrent writers race on the rename.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
