//! Formatting helpers for the jobs table and overlays.

/// Truncate to at most `max_len` characters, ending in "..." when cut.
///
/// Counts characters, not bytes, so multi-byte names never split.
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Truncate a path keeping its tail, where the file name lives.
#[must_use]
pub fn truncate_path(path: &str, max_len: usize) -> String {
    let char_count = path.chars().count();
    if char_count <= max_len {
        path.to_string()
    } else if max_len <= 3 {
        path.chars().skip(char_count - max_len).collect()
    } else {
        let suffix: String = path.chars().skip(char_count - (max_len - 3)).collect();
        format!("...{}", suffix)
    }
}

/// Elapsed time the way squeue prints it: `MM:SS`, `H:MM:SS` or `D-HH:MM:SS`.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Short age for the status bar ("4s", "2m 5s", "1h 3m").
#[must_use]
pub fn format_age(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format megabytes to human-readable size (input is in MB).
#[must_use]
pub fn format_bytes_mb(mb: u64) -> String {
    const GB_IN_MB: u64 = 1024;
    const TB_IN_MB: u64 = 1024 * 1024;

    if mb == 0 {
        "-".to_string()
    } else if mb >= TB_IN_MB {
        format!("{:.1}T", mb as f64 / TB_IN_MB as f64)
    } else if mb >= GB_IN_MB {
        format!("{:.1}G", mb as f64 / GB_IN_MB as f64)
    } else {
        format!("{}M", mb)
    }
}
