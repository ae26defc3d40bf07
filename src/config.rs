use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://claude.ai";
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Runtime configuration for the usage client and refresh loop.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub session_key: Option<String>,
    pub organization_id: Option<String>,
    pub api_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub refresh_secs: u64,
    pub max_retries: u32,
    pub preferences_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - CLAUDE_SESSION_KEY (fallback when preferences hold no session key)
    /// - CLAUDE_ORG_ID (fallback when preferences hold no organization id)
    /// - CLAUDE_API_URL (default: https://claude.ai)
    /// - CLAUDE_HTTP_TIMEOUT_SECS (default: 30)
    /// - CLAUDE_REFRESH_SECS (default: 300)
    /// - CLAUDE_HTTP_RETRIES (default: 2)
    /// - CLAUDE_USER_AGENT (default: claude-usage-pace/<version>)
    /// - CLAUDE_USAGE_PREFS (default: <config dir>/claude-usage-pace/preferences.json)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let api_url = get("CLAUDE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url::Url::parse(&api_url)?;

        let timeout_secs = parse_positive(
            get("CLAUDE_HTTP_TIMEOUT_SECS"),
            "CLAUDE_HTTP_TIMEOUT_SECS",
            30,
        )?;
        let refresh_secs = parse_positive(
            get("CLAUDE_REFRESH_SECS"),
            "CLAUDE_REFRESH_SECS",
            DEFAULT_REFRESH_SECS,
        )?;
        let max_retries = match get("CLAUDE_HTTP_RETRIES") {
            Some(v) => v.trim().parse::<u32>().map_err(|_| ConfigError::InvalidNumber {
                name: "CLAUDE_HTTP_RETRIES",
                value: v,
            })?,
            None => 2,
        };
        let user_agent = get("CLAUDE_USER_AGENT")
            .unwrap_or_else(|| format!("claude-usage-pace/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            session_key: get("CLAUDE_SESSION_KEY"),
            organization_id: get("CLAUDE_ORG_ID"),
            api_url,
            user_agent,
            timeout_secs,
            refresh_secs,
            max_retries,
            preferences_path: get("CLAUDE_USAGE_PREFS").map(PathBuf::from),
        })
    }
}

fn parse_positive(
    raw: Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(v) = raw else {
        return Ok(default);
    };
    match v.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { name, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.refresh_secs, 300);
        assert_eq!(cfg.max_retries, 2);
        assert!(cfg.session_key.is_none());
        assert!(cfg.user_agent.starts_with("claude-usage-pace/"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = Config::from_lookup(lookup(&[
            ("CLAUDE_SESSION_KEY", "  "),
            ("CLAUDE_ORG_ID", ""),
        ]))
        .unwrap();
        assert!(cfg.session_key.is_none());
        assert!(cfg.organization_id.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = Config::from_lookup(lookup(&[
            ("CLAUDE_SESSION_KEY", "sk-ant-sid01"),
            ("CLAUDE_ORG_ID", "org-1"),
            ("CLAUDE_API_URL", "http://127.0.0.1:9999"),
            ("CLAUDE_REFRESH_SECS", "60"),
            ("CLAUDE_HTTP_RETRIES", "0"),
            ("CLAUDE_USAGE_PREFS", "/tmp/prefs.json"),
        ]))
        .unwrap();
        assert_eq!(cfg.session_key.as_deref(), Some("sk-ant-sid01"));
        assert_eq!(cfg.api_url, "http://127.0.0.1:9999");
        assert_eq!(cfg.refresh_secs, 60);
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.preferences_path, Some(PathBuf::from("/tmp/prefs.json")));
    }

    #[test]
    fn rejects_bad_numbers_and_urls() {
        assert!(Config::from_lookup(lookup(&[("CLAUDE_REFRESH_SECS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CLAUDE_HTTP_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CLAUDE_HTTP_RETRIES", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CLAUDE_API_URL", "not a url")])).is_err());
    }
}
