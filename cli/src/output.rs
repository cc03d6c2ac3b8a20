//! Formatting helpers for CLI output.

use splat_runtime::RunSummary;

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// One-line summary printed after a successful run.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut line = format!(
        "Applied {} of {} to {} ({}, {})",
        plural(summary.layers.len(), "layer"),
        summary.reference,
        summary.destination.display(),
        plural(summary.files_written(), "file"),
        format_bytes(summary.bytes_written()),
    );

    let skipped = summary.skipped();
    if skipped > 0 {
        let noun = if skipped == 1 { "entry" } else { "entries" };
        line.push_str(&format!(", {skipped} {noun} skipped"));
    }
    line
}
