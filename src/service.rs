//! Single-owner task around [`UsageMonitor`].
//!
//! All state changes go through one mpsc channel. Fetches run in their own
//! tasks and post their results back into that channel, so snapshots are
//! applied in the order fetches complete. In-flight fetches are never
//! cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{FetchError, MonitorError};
use crate::monitor::{CurrentStatus, Event, SlotReport, UsageMonitor};
use crate::quota::{MetricKind, QuotaSnapshot};

/// Where snapshots come from.
#[async_trait]
pub trait QuotaSource: Send + Sync {
    async fn fetch(&self) -> Result<QuotaSnapshot, FetchError>;
}

enum Command {
    Refresh,
    Apply {
        event: Event,
        reply: Option<oneshot::Sender<Result<bool, MonitorError>>>,
    },
    Status {
        now: DateTime<Utc>,
        reply: oneshot::Sender<CurrentStatus>,
    },
    Slots {
        now: DateTime<Utc>,
        reply: oneshot::Sender<Vec<SlotReport>>,
    },
}

/// Cheap, cloneable access to the monitor task.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl MonitorHandle {
    /// Start a fetch. Returns as soon as it is queued.
    pub fn refresh(&self) -> Result<(), MonitorError> {
        self.send(Command::Refresh)
    }

    /// Hand over a snapshot obtained elsewhere.
    pub fn submit_snapshot(&self, snapshot: QuotaSnapshot) -> Result<(), MonitorError> {
        self.send(Command::Apply {
            event: Event::SnapshotReceived(snapshot),
            reply: None,
        })
    }

    pub async fn select_metric(&self, kind: MetricKind) -> Result<bool, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Apply {
            event: Event::MetricSelected(kind),
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| MonitorError::Closed)?
    }

    pub async fn current_status(&self) -> Result<CurrentStatus, MonitorError> {
        self.current_status_at(Utc::now()).await
    }

    pub async fn current_status_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<CurrentStatus, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { now, reply })?;
        rx.await.map_err(|_| MonitorError::Closed)
    }

    pub async fn slots(&self) -> Result<Vec<SlotReport>, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Slots {
            now: Utc::now(),
            reply,
        })?;
        rx.await.map_err(|_| MonitorError::Closed)
    }

    fn send(&self, cmd: Command) -> Result<(), MonitorError> {
        self.tx.send(cmd).map_err(|_| MonitorError::Closed)
    }
}

/// Spawn the owner task. It runs until every handle is dropped and no fetch
/// is still in flight.
pub fn spawn_monitor(
    monitor: UsageMonitor,
    source: Arc<dyn QuotaSource>,
) -> (MonitorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let weak = tx.downgrade();
    let task = tokio::spawn(run(monitor, source, rx, weak));
    (MonitorHandle { tx }, task)
}

async fn run(
    mut monitor: UsageMonitor,
    source: Arc<dyn QuotaSource>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    weak: mpsc::WeakUnboundedSender<Command>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Refresh => {
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    let event = match source.fetch().await {
                        Ok(snapshot) => Event::SnapshotReceived(snapshot),
                        Err(e) => Event::FetchFailed(e.to_string()),
                    };
                    let _ = tx.send(Command::Apply { event, reply: None });
                });
            }
            Command::Apply { event, reply } => {
                let result = monitor.apply(event);
                if let Err(e) = &result {
                    if reply.is_none() {
                        error!("monitor rejected event: {}", e);
                    }
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Command::Status { now, reply } => {
                let _ = reply.send(monitor.current_status(now));
            }
            Command::Slots { now, reply } => {
                let _ = reply.send(monitor.slots(now));
            }
        }
    }
    debug!("monitor task stopped");
}
