//! Human-readable progress formatting

/// Formats an integer with thousands separators, e.g. `24,822,333`
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

/// Rough time left for `remaining` items at `secs_per_item` each
///
/// Returns `"45s"`, `"12m 5s"` or `"3h 20m"` depending on magnitude.
pub fn estimate_time_remaining(remaining: u64, secs_per_item: f64) -> String {
    let secs_per_item = if secs_per_item.is_finite() && secs_per_item > 0.0 {
        secs_per_item
    } else {
        0.0
    };
    let total = (remaining as f64 * secs_per_item).round() as u64;

    if total < 60 {
        format!("{}s", total)
    } else if total < 3600 {
        format!("{}m {}s", total / 60, total % 60)
    } else {
        format!("{}h {}m", total / 3600, (total % 3600) / 60)
    }
}

/// One-line crawl progress for the log
///
/// # Arguments
///
/// * `page` - Listing page about to be fetched
/// * `max_pages` - Last page that will be fetched
/// * `total` - Fictions ingested so far
/// * `max_novels` - Fiction cap
/// * `secs_per_item` - Mean time spent per fiction
pub fn format_progress(
    page: u32,
    max_pages: u32,
    total: u64,
    max_novels: u64,
    secs_per_item: f64,
) -> String {
    let percent = if max_novels > 0 {
        (total as f64 / max_novels as f64) * 100.0
    } else {
        0.0
    };

    format!(
        "Page {}/{} | {}/{} fictions ({:.1}%) | ETA {}",
        format_number(page as u64),
        format_number(max_pages as u64),
        format_number(total),
        format_number(max_novels),
        percent,
        estimate_time_remaining(max_novels.saturating_sub(total), secs_per_item)
    )
}
