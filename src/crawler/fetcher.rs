//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client with the identifying user agent and timeout
//! - GET requests for listing and detail pages
//! - Error classification (status, timeout, transport)
//!
//! Every call performs exactly one request. There is no retry and no cache;
//! what to do with a failure is the coordinator's decision.

use crate::config::{Config, SiteConfig, UserAgentConfig};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Classified failure of a single fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Bound on the whole request, connect included
///
/// # Example
///
/// ```no_run
/// use fiction_harvest::config::UserAgentConfig;
/// use fiction_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing and detail pages of one site
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    base_url: Url,
    listing_path: String,
}

impl PageFetcher {
    /// Creates a fetcher for `site` using an existing client
    pub fn new(client: Client, site: &SiteConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&site.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", site.base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            listing_path: site.listing_path.clone(),
        })
    }

    /// Builds the client and fetcher from the full configuration
    pub fn from_config(config: &Config) -> Result<Self, crate::HarvestError> {
        let client = build_http_client(&config.user_agent, config.crawler.timeout())?;
        Ok(Self::new(client, &config.site)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of listing page `page`, e.g. `/fictions/best-rated?page=3`
    pub fn listing_url(&self, page: u32) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(&self.listing_path)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.listing_path, e)))?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    /// Fetches the raw HTML of listing page `page` (1-indexed)
    pub async fn fetch_listing(&self, page: u32) -> Result<String, FetchError> {
        let url = self.listing_url(page)?;
        self.get(&url).await
    }

    /// Fetches the raw HTML of a detail page
    pub async fn fetch_detail(&self, url: &Url) -> Result<String, FetchError> {
        self.get(url).await
    }

    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}
