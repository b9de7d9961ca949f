//! Library statistics from the fiction database
//!
//! This module provides functionality for extracting and displaying
//! a summary of what has been harvested so far.

use crate::checkpoint::Checkpoint;
use crate::output::progress::format_number;
use crate::storage::{Repository, StorageError};

/// Summary of the stored library and crawl cursor
#[derive(Debug, Clone)]
pub struct LibraryStatistics {
    /// Number of stored fictions
    pub total_fictions: u64,

    /// Stored fictions per publication status, largest first
    pub by_status: Vec<(Option<String>, u64)>,

    /// Persisted crawl cursor
    pub checkpoint: Checkpoint,
}

/// Loads statistics from the repository
///
/// # Arguments
///
/// * `repository` - The repository to query
/// * `checkpoint` - The currently persisted checkpoint
pub fn load_statistics<R: Repository + ?Sized>(
    repository: &R,
    checkpoint: &Checkpoint,
) -> Result<LibraryStatistics, StorageError> {
    let total_fictions = repository.count_fictions()?;

    let mut by_status = repository.count_by_status()?;
    by_status.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(LibraryStatistics {
        total_fictions,
        by_status,
        checkpoint: checkpoint.clone(),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LibraryStatistics) {
    println!("=== Library Statistics ===\n");

    println!("Overview:");
    println!("  Stored fictions: {}", format_number(stats.total_fictions));
    println!();

    if !stats.by_status.is_empty() {
        println!("Fictions by Status:");
        for (status, count) in &stats.by_status {
            let percentage = if stats.total_fictions > 0 {
                (*count as f64 / stats.total_fictions as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "  {}: {} ({:.1}%)",
                status.as_deref().unwrap_or("(none)"),
                format_number(*count),
                percentage
            );
        }
        println!();
    }

    print_checkpoint(&stats.checkpoint);
}

/// Prints the crawl checkpoint
pub fn print_checkpoint(checkpoint: &Checkpoint) {
    println!("Checkpoint:");
    println!("  Next page: {}", checkpoint.current_page);
    println!(
        "  Fictions scraped: {}",
        format_number(checkpoint.total_scraped)
    );
    match checkpoint.last_fiction_id {
        Some(id) => println!("  Last fiction ID: {}", id),
        None => println!("  Last fiction ID: (none)"),
    }
    println!(
        "  Saved at: {}",
        checkpoint.timestamp.as_deref().unwrap_or("(never)")
    );
}
