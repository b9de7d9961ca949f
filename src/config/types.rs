use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Fiction-Harvest
///
/// Every section is optional; missing sections and keys fall back to the
/// defaults below, which target the best-rated listing of royalroad.com.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host of the site, e.g. `https://www.royalroad.com`
    pub base_url: String,

    /// Path of the paginated listing; the page number is sent as `?page=N`
    pub listing_path: String,

    /// Path prefix of fiction detail pages (`/fiction/{id}/{slug}`)
    pub detail_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.royalroad.com".to_string(),
            listing_path: "/fictions/best-rated".to_string(),
            detail_path: "/fiction/".to_string(),
        }
    }
}

/// Crawler pacing and limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Base delay after each listing page (seconds)
    pub page_delay_secs: f64,

    /// Maximum random jitter added to the listing delay (seconds)
    pub page_jitter_secs: f64,

    /// Base delay after each fiction page (seconds)
    pub fiction_delay_secs: f64,

    /// Maximum random jitter added to the fiction delay (seconds)
    pub fiction_jitter_secs: f64,

    /// Last listing page that will be fetched
    pub max_pages: u32,

    /// Hard cap on the cumulative number of ingested fictions
    pub max_novels: u64,

    /// HTTP request timeout (seconds)
    pub timeout_secs: u64,

    /// Number of stored fictions re-visited per refresh batch
    pub refresh_batch_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay_secs: 1.5,
            page_jitter_secs: 0.3,
            fiction_delay_secs: 0.5,
            fiction_jitter_secs: 0.2,
            max_pages: 3000,
            max_novels: 65_000,
            timeout_secs: 15,
            refresh_batch_size: 50,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Average seconds spent per fiction, used for time estimates
    pub fn mean_fiction_secs(&self) -> f64 {
        self.fiction_delay_secs + self.fiction_jitter_secs / 2.0
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "fiction-harvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (contact)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} ({})",
            self.crawler_name, self.crawler_version, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Path to the crawl checkpoint file
    pub checkpoint_path: String,

    /// Path to the refresh-pass checkpoint file
    pub refresh_checkpoint_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "royalroad.db".to_string(),
            checkpoint_path: "scraper_checkpoint.json".to_string(),
            refresh_checkpoint_path: "update_checkpoint.json".to_string(),
        }
    }
}
