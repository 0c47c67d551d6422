//! Cached indicator lists and local reference data.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Cached copy of the full malicious-hash list.
pub const HASH_CACHE_FILE: &str = "full_hashes.txt";
/// Cached copy of the IP denylist.
pub const IP_CACHE_FILE: &str = "full_ips.txt";
/// Local suspicious-process reference list.
pub const PROCESS_LIST_FILE: &str = "procs.txt";

/// Process list written to the cache directory when none exists yet.
pub const DEFAULT_PROCESS_LIST: &str = include_str!("../../data/procs.txt");

/// Read access to locally stored indicator data.
pub trait IndicatorCache: Send + Sync {
    /// Last known good malicious-hash list.
    fn read_cached_hash_list(&self) -> Result<String>;

    /// Last known good IP denylist.
    fn read_cached_ip_list(&self) -> Result<String>;

    /// Suspicious-process reference list.
    fn read_suspicious_process_list(&self) -> Result<String>;
}

/// Indicator data stored as text files in one directory.
#[derive(Debug, Clone)]
pub struct FileIndicatorCache {
    dir: PathBuf,
}

impl FileIndicatorCache {
    /// Create a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache located in the `indicators` folder of a data directory.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("indicators"))
    }

    /// Directory holding the lists.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the bundled process list unless one is already installed.
    ///
    /// Returns `true` when the file was created.
    pub fn seed_process_list(&self) -> Result<bool> {
        let path = self.dir.join(PROCESS_LIST_FILE);
        if path.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::file_write(&self.dir, e))?;
        std::fs::write(&path, DEFAULT_PROCESS_LIST).map_err(|e| Error::file_write(&path, e))?;
        log::info!("Installed default process list at {}", path.display());
        Ok(true)
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);
        std::fs::read_to_string(&path).map_err(|e| Error::file_read(path, e))
    }
}

impl IndicatorCache for FileIndicatorCache {
    fn read_cached_hash_list(&self) -> Result<String> {
        self.read(HASH_CACHE_FILE)
    }

    fn read_cached_ip_list(&self) -> Result<String> {
        self.read(IP_CACHE_FILE)
    }

    fn read_suspicious_process_list(&self) -> Result<String> {
        self.read(PROCESS_LIST_FILE)
    }
}
