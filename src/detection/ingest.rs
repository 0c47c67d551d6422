//! Indicator ingestion: remote feeds with cached fallback.
//!
//! The hash and IP lists are acquired concurrently and ingestion returns
//! only after both finish. Feed failures degrade to the cached copies; only
//! the loss of both sources for a required kind is fatal.
//!
//! The two kinds are merged differently:
//! - hashes accumulate: the cached list is the base and fetched entries are
//!   added to it;
//! - IPs are an authoritative snapshot: a fetched list replaces the cache
//!   outright.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::IndicatorKind;
use crate::detection::cache::{FileIndicatorCache, IndicatorCache};
use crate::detection::feed::{HttpFeedClient, IndicatorFetcher};
use crate::detection::indicators::{
    parse_hash_list, parse_ip_list, parse_process_list, IndicatorSet,
};
use std::collections::HashSet;
use std::sync::Arc;

/// URLs of the remote indicator feeds.
#[derive(Debug, Clone)]
pub struct FeedSources {
    /// Malicious-hash feed
    pub hash_list_url: String,
    /// IP denylist feed
    pub ip_list_url: String,
}

impl From<&Config> for FeedSources {
    fn from(config: &Config) -> Self {
        Self {
            hash_list_url: config.feeds.hash_list_url.clone(),
            ip_list_url: config.feeds.ip_list_url.clone(),
        }
    }
}

/// Builds the per-run [`IndicatorSet`].
pub struct IndicatorIngester {
    fetcher: Arc<dyn IndicatorFetcher>,
    cache: Arc<dyn IndicatorCache>,
    sources: FeedSources,
}

impl IndicatorIngester {
    /// Create an ingester from explicit collaborators.
    pub fn new(
        fetcher: Arc<dyn IndicatorFetcher>,
        cache: Arc<dyn IndicatorCache>,
        sources: FeedSources,
    ) -> Self {
        Self {
            fetcher,
            cache,
            sources,
        }
    }

    /// Create an ingester using the HTTP client and the file cache in the data directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFeedClient::new(&config.feeds)?;
        let cache = FileIndicatorCache::in_data_dir(&config.data_dir());
        if let Err(e) = cache.seed_process_list() {
            log::warn!("Could not install default process list: {}", e);
        }
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(cache),
            FeedSources::from(config),
        ))
    }

    /// Acquire the requested indicator kinds.
    ///
    /// Kinds not requested are left empty and never touch the network.
    pub async fn ingest(&self, kinds: &[IndicatorKind]) -> Result<IndicatorSet> {
        let wants = |kind| kinds.contains(&kind);

        let (hashes, ips, processes) = tokio::join!(
            async {
                if wants(IndicatorKind::Hashes) {
                    self.acquire_hashes().await
                } else {
                    Ok(HashSet::new())
                }
            },
            async {
                if wants(IndicatorKind::Ips) {
                    self.acquire_ips().await
                } else {
                    Ok(HashSet::new())
                }
            },
            async {
                if wants(IndicatorKind::Processes) {
                    self.load_process_list().await
                } else {
                    Ok(Vec::new())
                }
            },
        );

        let set = IndicatorSet {
            malicious_hashes: hashes?,
            malicious_ips: ips?,
            suspicious_processes: processes?,
        };

        log::info!(
            "Indicators loaded: {} hashes, {} IPs, {} process names",
            set.malicious_hashes.len(),
            set.malicious_ips.len(),
            set.suspicious_processes.len()
        );

        Ok(set)
    }

    /// Hash list: cached copy as the base, fetched entries merged in.
    async fn acquire_hashes(&self) -> Result<HashSet<String>> {
        let (cached, fetched) = tokio::join!(
            self.read_cache(|c| c.read_cached_hash_list()),
            self.fetcher.fetch_text(&self.sources.hash_list_url),
        );

        match (cached, fetched) {
            (Ok(cached), Ok(body)) => {
                let mut hashes = parse_hash_list(&cached);
                let before = hashes.len();
                hashes.extend(parse_hash_list(&body));
                log::debug!(
                    "Merged {} new hashes from feed into {} cached",
                    hashes.len() - before,
                    before
                );
                Ok(hashes)
            }
            (Ok(cached), Err(e)) => {
                log::warn!("Error fetching recent hashes, using cached list: {}", e);
                Ok(parse_hash_list(&cached))
            }
            (Err(cache_err), Ok(body)) => {
                log::warn!(
                    "Cached hash list unreadable, using fetched list only: {}",
                    cache_err
                );
                Ok(parse_hash_list(&body))
            }
            (Err(cache_err), Err(feed_err)) => Err(Error::indicators_unavailable(
                IndicatorKind::Hashes,
                format!("feed: {}; cache: {}", feed_err, cache_err),
            )),
        }
    }

    /// IP list: fetched body replaces the cache; cache only on fetch failure.
    async fn acquire_ips(&self) -> Result<HashSet<String>> {
        match self.fetcher.fetch_text(&self.sources.ip_list_url).await {
            Ok(body) => Ok(parse_ip_list(&body)),
            Err(feed_err) => {
                log::warn!("Error fetching IP list, using cached list: {}", feed_err);
                let cached = self
                    .read_cache(|c| c.read_cached_ip_list())
                    .await
                    .map_err(|cache_err| {
                        Error::indicators_unavailable(
                            IndicatorKind::Ips,
                            format!("feed: {}; cache: {}", feed_err, cache_err),
                        )
                    })?;
                Ok(parse_ip_list(&cached))
            }
        }
    }

    /// Suspicious-process names come from local reference data only.
    async fn load_process_list(&self) -> Result<Vec<String>> {
        let text = self
            .read_cache(|c| c.read_suspicious_process_list())
            .await
            .map_err(|e| {
                Error::indicators_unavailable(IndicatorKind::Processes, e.to_string())
            })?;
        Ok(parse_process_list(&text))
    }

    async fn read_cache<F>(&self, read: F) -> Result<String>
    where
        F: FnOnce(&dyn IndicatorCache) -> Result<String> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || read(cache.as_ref())).await?
    }
}
