//! User preferences persisted as JSON: session key, organization and the
//! selected metric.

use crate::config::Config;
use crate::error::PreferencesError;
use crate::http::Credentials;
use crate::quota::MetricKind;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "claude-usage-pace";
const PREFERENCES_FILE_NAME: &str = "preferences.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub session_key: Option<String>,
    pub organization_id: Option<String>,
    /// Stored as text so an unknown value doesn't invalidate the whole file.
    pub selected_metric: Option<String>,
}

impl Preferences {
    /// Stored selection, or the default when unset, unknown or display-only.
    pub fn selected_metric(&self) -> MetricKind {
        self.selected_metric
            .as_deref()
            .and_then(|raw| raw.parse::<MetricKind>().ok())
            .filter(|kind| kind.is_selectable())
            .unwrap_or_default()
    }

    pub fn set_selected_metric(&mut self, kind: MetricKind) {
        self.selected_metric = Some(kind.cli_name().to_string());
    }

    /// Preference values win when non-empty; the environment fills the gaps.
    pub fn credentials(&self, cfg: &Config) -> Credentials {
        Credentials {
            session_key: non_empty(&self.session_key).or_else(|| cfg.session_key.clone()),
            organization_id: non_empty(&self.organization_id)
                .or_else(|| cfg.organization_id.clone()),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/claude-usage-pace/preferences.json`
    pub fn default_location() -> Result<Self, PreferencesError> {
        let dir = dirs::config_dir().ok_or(PreferencesError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR_NAME).join(PREFERENCES_FILE_NAME)))
    }

    /// Store at `cfg.preferences_path` if set, else the default location.
    pub fn from_config(cfg: &Config) -> Result<Self, PreferencesError> {
        match &cfg.preferences_path {
            Some(path) => Ok(Self::new(path.clone())),
            None => Self::default_location(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield defaults.
    pub fn load(&self) -> Preferences {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Preferences::default(),
            Err(e) => {
                warn!("Preferences: failed to read {:?}: {}", self.path, e);
                return Preferences::default();
            }
        };
        match serde_json::from_str::<Preferences>(&contents) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("Preferences: failed to parse {:?}: {}", self.path, e);
                Preferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        let write_err = |source: std::io::Error| PreferencesError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, json).map_err(write_err)
    }
}
