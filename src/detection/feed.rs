//! Remote indicator feed client.

use crate::core::config::FeedConfig;
use crate::core::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Fetches the raw text of a remote indicator list.
#[async_trait]
pub trait IndicatorFetcher: Send + Sync {
    /// Fetch the body at `url`; any transport or HTTP status failure is an error.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// HTTP(S) feed client.
///
/// A single attempt per call; callers fall back to cached data on failure.
pub struct HttpFeedClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedClient {
    /// Create a client from feed configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::feed_request("(client setup)", e))?;

        Ok(Self { client, timeout })
    }

    /// Configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl IndicatorFetcher for HttpFeedClient {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        log::debug!("Fetching indicator feed: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::feed_request(url, e))?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::feed_request(url, e))?;

        log::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_uses_configured_timeout() {
        let config = FeedConfig {
            timeout_secs: 7,
            ..FeedConfig::default()
        };
        let client = HttpFeedClient::new(&config).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_an_error() {
        let config = FeedConfig {
            timeout_secs: 2,
            ..FeedConfig::default()
        };
        let client = HttpFeedClient::new(&config).unwrap();
        // Port 9 (discard) on loopback is not expected to serve HTTP.
        let err = client.fetch_text("http://127.0.0.1:9/list.txt").await.unwrap_err();
        assert!(matches!(err, Error::FeedRequest { .. }));
        assert!(err.is_recoverable());
    }
}
