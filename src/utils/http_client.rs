use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::HttpConfig;
use crate::errors::{ConfigError, FetchError};
use crate::utils::url::UrlUtils;

/// Retrieves the raw, still compressed payload of a feed
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// One attempt, no retries; any failure abandons the source
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// `reqwest` backed fetcher with a bounded total timeout
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::invalid("http", format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn transport_error(url: &str, error: reqwest::Error) -> FetchError {
        let kind = if error.is_timeout() {
            "request timed out"
        } else if error.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        // The URL is reported separately, obfuscated
        let detail = error.without_url();
        FetchError::new(UrlUtils::obfuscate_credentials(url), format!("{kind}: {detail}"))
    }

    async fn read_body(response: Response, url: &str) -> Result<Bytes, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(
                UrlUtils::obfuscate_credentials(url),
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(url, e))
    }
}

#[async_trait]
impl FeedFetcher for StandardHttpClient {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!("Fetching feed from: {}", UrlUtils::obfuscate_credentials(url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        let bytes = Self::read_body(response, url).await?;
        debug!("Fetched {} bytes of raw content", bytes.len());
        Ok(bytes)
    }
}
