//! Plain-text rendering of the monitor state for a terminal.

use crate::monitor::{CurrentStatus, SlotReport};
use crate::quota::Status;

pub const UNAVAILABLE: &str = "❌";

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::OnTrack => "✅",
        Status::SlightlyOver => "⚠️",
        Status::SignificantlyOver => "🚨",
        Status::Unknown => "❓",
    }
}

/// `"✅ 42%"`, or the unavailable marker when there is nothing to show.
pub fn status_line(status: &CurrentStatus) -> String {
    match status {
        CurrentStatus::Available(report) => {
            format!("{} {}%", status_icon(report.status), report.display_percent)
        }
        CurrentStatus::NoData { .. } => UNAVAILABLE.to_string(),
    }
}

/// One entry per reported metric plus its reset countdown. `loaded` is false
/// until the first snapshot arrives.
pub fn menu_lines(slots: &[SlotReport], loaded: bool) -> Vec<String> {
    if !loaded {
        return vec!["Loading...".to_string()];
    }
    let mut lines = Vec::with_capacity(slots.len() * 2);
    for slot in slots {
        let marker = if slot.selected { "* " } else { "  " };
        lines.push(format!(
            "{}{}% {}",
            marker,
            slot.display_percent,
            slot.metric.label()
        ));
        lines.push(format!("    Resets {}", slot.reset_text));
    }
    lines
}
