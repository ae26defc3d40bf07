use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::service::MonitorHandle;

/// Repeating refresh trigger. Aborted on [`RefreshTask::cancel`] or drop.
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Refresh now, then every `period`. A slow tick delays the next one rather
/// than firing a burst to catch up.
pub fn spawn_refresh_loop(monitor: MonitorHandle, period: Duration) -> RefreshTask {
    info!("refreshing usage every {:?}", period);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if monitor.refresh().is_err() {
                debug!("monitor gone; stopping refresh loop");
                break;
            }
        }
    });
    RefreshTask { handle }
}
