use chrono::{DateTime, Utc};

/// Truncate a string to a maximum length in characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Time since the last recorded activity, e.g. "idle 4m"
pub fn format_idle(last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last_activity else {
        return String::new();
    };
    let secs = (now - last).num_seconds().max(0);
    match secs {
        0..=59 => "active".to_string(),
        60..=3599 => format!("idle {}m", secs / 60),
        _ => format!("idle {}h{}m", secs / 3600, (secs % 3600) / 60),
    }
}
