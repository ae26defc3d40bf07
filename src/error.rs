use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::quota::MetricKind;

/// Failure to produce a snapshot. The monitor never sees these as state; a
/// failed fetch simply leaves the previous snapshot in place.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no session key found; set it in preferences or CLAUDE_SESSION_KEY")]
    MissingCredential,
    #[error("no organization id found; set it in preferences or CLAUDE_ORG_ID")]
    MissingOrganization,
    #[error("session key contains characters that cannot be sent in a cookie")]
    InvalidCredential,
    #[error("invalid usage endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("usage endpoint returned {status} ({code}): {message}")]
    Status {
        status: StatusCode,
        code: &'static str,
        message: String,
        retriable: bool,
    },
    #[error("failed to decode usage payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { retriable, .. } => *retriable,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("CLAUDE_API_URL is not a valid URL: {0}")]
    InvalidApiUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("could not determine a config directory for preferences")]
    NoConfigDir,
    #[error("failed to write preferences to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("metric '{0}' is display-only and cannot be selected")]
    MetricNotSelectable(MetricKind),
    #[error("monitor task has stopped")]
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);
