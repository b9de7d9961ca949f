//! Crawler module for fetching and processing fiction pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing and detail pages
//! - HTML parsing into links and raw fields
//! - Jittered rate limiting
//! - Cooperative shutdown
//! - Overall crawl coordination and the refresh pass

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;
mod refresh;
mod shutdown;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, FetchError, PageFetcher};
pub use parser::{HtmlPageParser, PageParser};
pub use rate_limiter::RateLimiter;
pub use refresh::{run_refresh, RefreshReport, Refresher};
pub use shutdown::{ShutdownSignal, FORCED_EXIT_CODE};
