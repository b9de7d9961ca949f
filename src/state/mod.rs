//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: lifecycle of a crawl run (idle, running, paused, stopped, failed)
//! - `StopReason`: why a run reached its terminal stopped state

mod crawl_state;

pub use crawl_state::{CrawlState, StopReason};
