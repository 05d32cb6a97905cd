//! Formatting helpers for terminal summaries.

/// Weekday names indexed the way the activity histograms are (0 = Monday).
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Format a duration in seconds (e.g., "45s", "12m", "3h 5m", "2d 4h").
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Format a byte count (e.g., "512 B", "1.5 KB", "3.2 MB").
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a count compactly (e.g., "950", "12.3K", "1.2M").
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Format an hour bucket for display (e.g., "2pm-3pm").
pub fn format_hour(hour: usize) -> String {
    let label = |h: usize| -> String {
        match h {
            0 => "12am".to_string(),
            1..=11 => format!("{}am", h),
            12 => "12pm".to_string(),
            _ => format!("{}pm", h - 12),
        }
    };
    format!("{}-{}", label(hour % 24), label((hour + 1) % 24))
}

/// Weekday name for a histogram index.
pub fn weekday_name(index: usize) -> &'static str {
    WEEKDAYS.get(index).copied().unwrap_or("Unknown")
}
