//! Output module for operator-facing reports
//!
//! This module handles:
//! - Progress lines and time estimates during a crawl
//! - Library statistics for the `stats` command

pub mod progress;
pub mod stats;

pub use progress::{estimate_time_remaining, format_number, format_progress};
pub use stats::{load_statistics, print_checkpoint, print_statistics, LibraryStatistics};
