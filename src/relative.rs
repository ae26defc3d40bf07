//! Countdown text for reset times ("in 2h 15m", "in 3 days", "soon").

use chrono::{DateTime, Utc};

use crate::quota::parse_timestamp;

pub fn format_relative(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if target <= now {
        return "soon".to_string();
    }

    let secs = (target - now).num_seconds();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;

    if hours > 24 {
        let days = hours / 24;
        format!("in {} day{}", days, plural(days))
    } else if hours > 0 {
        if minutes > 0 {
            format!("in {}h {}m", hours, minutes)
        } else {
            format!("in {} hour{}", hours, plural(hours))
        }
    } else if minutes > 0 {
        format!("in {} min{}", minutes, plural(minutes))
    } else {
        "in < 1 min".to_string()
    }
}

/// Format a raw wire timestamp; unparsable input comes back unchanged.
pub fn format_reset(raw: &str, now: DateTime<Utc>) -> String {
    match parse_timestamp(raw) {
        Some(target) => format_relative(target, now),
        None => raw.to_string(),
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
