//! Usage monitor state machine.
//!
//! Holds the latest snapshot and the selected metric. Only two inputs change
//! that state: a new snapshot and a metric selection. Everything shown to the
//! user is derived on demand from `(snapshot, selected metric, now)`, so no
//! cached status can drift from the data it came from.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::MonitorError;
use crate::pace::{self, Basis};
use crate::quota::{MetricKind, QuotaLimit, QuotaSnapshot, Status};
use crate::relative::format_reset;

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum Event {
    SnapshotReceived(QuotaSnapshot),
    MetricSelected(MetricKind),
    /// A fetch failed. Logged only; the previous snapshot stays.
    FetchFailed(String),
}

/// Notifications for collaborators (presentation, preferences).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Derived status may have changed; re-read `current_status`.
    StatusChanged,
    /// The user picked a different metric; persist it.
    MetricChanged(MetricKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    NoSnapshot,
    MetricAbsent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub metric: MetricKind,
    pub status: Status,
    pub display_percent: i64,
    pub reset_text: String,
    /// `true` when the pace model was used, `false` for the absolute fallback.
    pub paced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurrentStatus {
    Available(StatusReport),
    NoData { reason: NoDataReason },
}

/// One line of the per-metric listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotReport {
    pub metric: MetricKind,
    pub display_percent: i64,
    pub reset_text: String,
    pub selected: bool,
}

pub struct UsageMonitor {
    latest: Option<QuotaSnapshot>,
    selected: MetricKind,
    events: mpsc::UnboundedSender<MonitorEvent>,
}

impl UsageMonitor {
    /// A non-selectable `selected` falls back to the default metric.
    pub fn new(selected: MetricKind, events: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        let selected = if selected.is_selectable() {
            selected
        } else {
            warn!("metric {} is not selectable; using {}", selected, MetricKind::default());
            MetricKind::default()
        };
        Self {
            latest: None,
            selected,
            events,
        }
    }

    /// Returns whether state changed.
    pub fn apply(&mut self, event: Event) -> Result<bool, MonitorError> {
        match event {
            Event::SnapshotReceived(snapshot) => {
                self.snapshot_received(snapshot);
                Ok(true)
            }
            Event::MetricSelected(kind) => self.select_metric(kind),
            Event::FetchFailed(reason) => {
                warn!("usage fetch failed, keeping previous snapshot: {}", reason);
                Ok(false)
            }
        }
    }

    pub fn snapshot_received(&mut self, snapshot: QuotaSnapshot) {
        debug!(
            "snapshot received: {} metric(s) reported",
            snapshot.present().count()
        );
        self.latest = Some(snapshot);
        self.emit(MonitorEvent::StatusChanged);
    }

    /// Select the active metric. Re-selecting the current one is a silent no-op.
    pub fn select_metric(&mut self, kind: MetricKind) -> Result<bool, MonitorError> {
        if !kind.is_selectable() {
            return Err(MonitorError::MetricNotSelectable(kind));
        }
        if kind == self.selected {
            return Ok(false);
        }
        info!("selected metric {} -> {}", self.selected, kind);
        self.selected = kind;
        self.emit(MonitorEvent::MetricChanged(kind));
        self.emit(MonitorEvent::StatusChanged);
        Ok(true)
    }

    pub fn selected_metric(&self) -> MetricKind {
        self.selected
    }

    pub fn latest_snapshot(&self) -> Option<&QuotaSnapshot> {
        self.latest.as_ref()
    }

    pub fn current_status(&self, now: DateTime<Utc>) -> CurrentStatus {
        let Some(snapshot) = &self.latest else {
            return CurrentStatus::NoData {
                reason: NoDataReason::NoSnapshot,
            };
        };
        let Some(limit) = snapshot.limit(self.selected) else {
            return CurrentStatus::NoData {
                reason: NoDataReason::MetricAbsent,
            };
        };
        let eval = pace::evaluate(limit, self.selected.window(), now);
        CurrentStatus::Available(StatusReport {
            metric: self.selected,
            status: eval.status,
            display_percent: eval.display_percent,
            reset_text: reset_text(limit, now),
            paced: matches!(eval.basis, Basis::Pace { .. }),
        })
    }

    /// Every metric present in the latest snapshot, selected or not.
    pub fn slots(&self, now: DateTime<Utc>) -> Vec<SlotReport> {
        let Some(snapshot) = &self.latest else {
            return Vec::new();
        };
        snapshot
            .present()
            .map(|(metric, limit)| SlotReport {
                metric,
                display_percent: display_percent(limit),
                reset_text: reset_text(limit, now),
                selected: metric == self.selected,
            })
            .collect()
    }

    fn emit(&self, event: MonitorEvent) {
        // Nobody listening is fine; state stays authoritative.
        let _ = self.events.send(event);
    }
}

fn display_percent(limit: &QuotaLimit) -> i64 {
    if limit.utilization.is_finite() {
        limit.utilization.round() as i64
    } else {
        0
    }
}

fn reset_text(limit: &QuotaLimit, now: DateTime<Utc>) -> String {
    match &limit.resets_at {
        Some(raw) => format_reset(raw, now),
        None => "unknown".to_string(),
    }
}
