//! Threat-intelligence indicator acquisition.
//!
//! This module provides:
//! - Remote feed fetching (hash list, IP denylist)
//! - Cached and local reference indicator data
//! - Indicator list parsing and normalization
//! - Per-run ingestion with cached fallback

pub mod cache;
pub mod feed;
pub mod indicators;
pub mod ingest;

pub use cache::{FileIndicatorCache, IndicatorCache};
pub use feed::{HttpFeedClient, IndicatorFetcher};
pub use indicators::{parse_indicator_lines, IndicatorSet};
pub use ingest::{FeedSources, IndicatorIngester};
