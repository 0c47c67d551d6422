//! Concurrent file hash scanner.
//!
//! A blocking producer lists each scanned directory (one level deep) into an
//! unbounded queue; a fixed pool of workers hashes queued files and sends
//! matches to a fan-in channel. The scan returns once the producer is
//! exhausted and every worker has drained the queue.

use crate::core::config::DEFAULT_HASH_WORKERS;
use crate::core::error::Result;
use crate::utils::hash::HashCalculator;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use walkdir::WalkDir;

/// Outcome of hashing one queued file.
#[derive(Debug)]
enum HashResult {
    /// File hash is in the malicious set
    Match(PathBuf),
    /// File hashed, no match
    Clean,
    /// File hash is on the allow-list
    AllowListed,
    /// File could not be read
    Error(String),
}

/// Counters for one hash scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HashScanStats {
    /// Files queued by the producer
    pub files_queued: u64,
    /// Files successfully hashed
    pub files_hashed: u64,
    /// Files that could not be read
    pub read_errors: u64,
    /// Directories excluded or unlistable
    pub directories_skipped: u64,
    /// Hashes suppressed by the allow-list
    pub allow_listed: u64,
}

/// Hashes files in the scanned directories and reports malicious ones.
pub struct HashScanner {
    workers: usize,
}

impl Default for HashScanner {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_WORKERS)
    }
}

impl HashScanner {
    /// Create a scanner with the given worker count (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of hashing workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Scan `directories` and return the paths whose MD5 is malicious.
    ///
    /// Match order is completion order and carries no meaning.
    pub async fn scan(
        &self,
        directories: &[PathBuf],
        excluded_directories: &HashSet<PathBuf>,
        excluded_hashes: &HashSet<String>,
        malicious_hashes: &HashSet<String>,
    ) -> Result<(Vec<PathBuf>, HashScanStats)> {
        let mut stats = HashScanStats::default();

        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<PathBuf>();
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<HashResult>();

        let excluded_hashes: Arc<HashSet<String>> = Arc::new(
            excluded_hashes
                .iter()
                .map(|h| HashCalculator::normalize(h))
                .collect(),
        );
        let malicious_hashes = Arc::new(malicious_hashes.clone());

        // Spawn worker tasks
        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let queue = Arc::clone(&queue_rx);
            let excluded = Arc::clone(&excluded_hashes);
            let malicious = Arc::clone(&malicious_hashes);
            let tx = result_tx.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    // Hold the lock only while receiving
                    let path = {
                        let mut rx = queue.lock().await;
                        rx.recv().await
                    };

                    let path = match path {
                        Some(path) => path,
                        None => break, // Producer done and queue empty
                    };

                    let result = Self::hash_and_match(path, &excluded, &malicious).await;
                    if tx.send(result).is_err() {
                        break;
                    }
                }
            }));
        }

        // Drop the sender so the channel closes when workers finish
        drop(result_tx);

        let producer = {
            let directories = directories.to_vec();
            let excluded_directories = excluded_directories.clone();
            tokio::task::spawn_blocking(move || {
                Self::enqueue_files(&directories, &excluded_directories, &queue_tx)
            })
        };

        let mut matches = Vec::new();
        while let Some(result) = result_rx.recv().await {
            match result {
                HashResult::Match(path) => {
                    log::info!("Malicious file hash: {}", path.display());
                    stats.files_hashed += 1;
                    matches.push(path);
                }
                HashResult::Clean => stats.files_hashed += 1,
                HashResult::AllowListed => {
                    stats.files_hashed += 1;
                    stats.allow_listed += 1;
                }
                HashResult::Error(msg) => {
                    log::trace!("Error hashing: {}", msg);
                    stats.read_errors += 1;
                }
            }
        }

        for handle in handles {
            handle.await?;
        }
        let (queued, skipped) = producer.await?;
        stats.files_queued = queued;
        stats.directories_skipped = skipped;

        log::info!(
            "Hash scan completed: {} files queued, {} hashed, {} read errors, {} matches",
            stats.files_queued,
            stats.files_hashed,
            stats.read_errors,
            matches.len()
        );

        Ok((matches, stats))
    }

    /// Hash one file on the blocking pool and classify it.
    async fn hash_and_match(
        path: PathBuf,
        excluded: &HashSet<String>,
        malicious: &HashSet<String>,
    ) -> HashResult {
        let hashed = tokio::task::spawn_blocking(move || {
            let hash = HashCalculator::md5_file(&path);
            (path, hash)
        })
        .await;

        match hashed {
            Ok((path, Ok(hash))) => {
                if excluded.contains(&hash) {
                    log::trace!("Allow-listed hash {} for {}", hash, path.display());
                    HashResult::AllowListed
                } else if malicious.contains(&hash) {
                    HashResult::Match(path)
                } else {
                    HashResult::Clean
                }
            }
            Ok((_, Err(e))) => HashResult::Error(e.to_string()),
            Err(e) => HashResult::Error(e.to_string()),
        }
    }

    /// List the scanned directories into the queue.
    ///
    /// Returns the number of files queued and directories skipped.
    fn enqueue_files(
        directories: &[PathBuf],
        excluded_directories: &HashSet<PathBuf>,
        queue: &mpsc::UnboundedSender<PathBuf>,
    ) -> (u64, u64) {
        let mut queued = 0;
        let mut skipped = 0;

        for dir in directories {
            if excluded_directories.contains(dir) {
                log::debug!("Skipping excluded directory {}", dir.display());
                skipped += 1;
                continue;
            }

            match Self::list_directory(dir) {
                Ok(files) => {
                    for file in files {
                        if queue.send(file).is_err() {
                            return (queued, skipped);
                        }
                        queued += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Error reading directory {}: {}", dir.display(), e);
                    skipped += 1;
                }
            }
        }

        (queued, skipped)
    }

    /// Non-hidden regular entries directly inside `dir`.
    fn list_directory(dir: &Path) -> std::result::Result<Vec<PathBuf>, walkdir::Error> {
        let mut files = Vec::new();
        let walker = WalkDir::new(dir).min_depth(1).max_depth(1);

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                // The root itself failing to open aborts the listing
                Err(e) if e.depth() == 0 => return Err(e),
                Err(e) => {
                    log::trace!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }
            if is_hidden(entry.file_name()) {
                continue;
            }

            files.push(entry.into_path());
        }

        Ok(files)
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
