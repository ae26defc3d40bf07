//! Claude usage quota monitor.
//!
//! Fetches usage quotas, and reports for the selected metric whether
//! consumption is running ahead of a uniform pace through its reset window.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod monitor;
pub mod pace;
pub mod preferences;
pub mod quota;
pub mod relative;
pub mod render;
pub mod scheduler;
pub mod service;

pub use error::{FetchError, MonitorError};
pub use monitor::{CurrentStatus, Event, MonitorEvent, NoDataReason, StatusReport, UsageMonitor};
pub use quota::{MetricKind, QuotaLimit, QuotaSnapshot, Status};
pub use service::{spawn_monitor, MonitorHandle, QuotaSource};
