use crate::config::Config;
use crate::error::FetchError;
use crate::preferences::PreferencesStore;
use crate::quota::QuotaSnapshot;
use crate::service::QuotaSource;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Session credentials for the usage endpoint.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub session_key: Option<String>,
    pub organization_id: Option<String>,
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(&cfg.user_agent) {
        default_headers.insert(USER_AGENT, ua);
    }
    // Cookie header is injected per request so credentials can change between fetches.
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
}

/// `{api_url}/api/organizations/{org}/usage`, with `org` encoded as one path segment.
pub fn usage_url(api_url: &str, organization_id: &str) -> Result<Url, FetchError> {
    let base = api_url.trim_end_matches('/');
    let url = format!(
        "{}/api/organizations/{}/usage",
        base,
        encode_path_segment(organization_id)
    );
    Ok(Url::parse(&url)?)
}

pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

pub fn map_status(status: StatusCode, message: String) -> FetchError {
    let (code, retriable) = match status {
        StatusCode::BAD_REQUEST => ("bad_request", false),
        StatusCode::UNAUTHORIZED => ("unauthorized", false),
        StatusCode::FORBIDDEN => ("forbidden", false),
        StatusCode::NOT_FOUND => ("not_found", false),
        StatusCode::TOO_MANY_REQUESTS => ("rate_limited", true),
        s if s.is_server_error() => ("upstream_error", true),
        _ => ("unexpected_status", false),
    };
    FetchError::Status {
        status,
        code,
        message,
        retriable,
    }
}

/// First retry waits about this long; each further attempt doubles it.
const BACKOFF_BASE: Duration = Duration::from_secs(1);
/// Upper bound for any single wait, server-requested or not. Retries must
/// finish well inside one refresh period.
const BACKOFF_CAP: Duration = Duration::from_secs(30);

fn compute_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(d) = retry_after {
        return d.min(BACKOFF_CAP);
    }
    let step = BACKOFF_BASE.saturating_mul(1u32 << attempt.min(5)).min(BACKOFF_CAP);
    let half = step.as_millis() as u64 / 2;
    Duration::from_millis(half + fastrand::u64(0..=half))
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Fetch and decode one usage snapshot.
///
/// Send errors, 429 and 5xx are retried up to `cfg.max_retries` times; other
/// failures return immediately.
pub async fn fetch_usage(
    client: &Client,
    cfg: &Config,
    creds: &Credentials,
) -> Result<QuotaSnapshot, FetchError> {
    let session_key = creds
        .session_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or(FetchError::MissingCredential)?;
    let organization_id = creds
        .organization_id
        .as_deref()
        .filter(|o| !o.trim().is_empty())
        .ok_or(FetchError::MissingOrganization)?;
    let cookie = HeaderValue::from_str(&format!("sessionKey={}", session_key.trim()))
        .map_err(|_| FetchError::InvalidCredential)?;
    let url = usage_url(&cfg.api_url, organization_id)?;

    let mut attempt: u32 = 0;
    loop {
        let res = client
            .get(url.clone())
            .header(COOKIE, cookie.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await;

        let res = match res {
            Ok(r) => r,
            Err(e) => {
                if attempt < cfg.max_retries {
                    let backoff = compute_backoff(attempt, None);
                    warn!("usage GET send error: {}; retrying in {:?}", e, backoff);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                    continue;
                }
                return Err(FetchError::Transport(e));
            }
        };

        let status = res.status();
        let wait = retry_after(res.headers());
        let text = res.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str::<QuotaSnapshot>(&text)?);
        }

        if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
            && attempt < cfg.max_retries
        {
            let backoff = compute_backoff(attempt, wait);
            warn!(
                "usage GET {} retrying (status {}), backoff {:?}",
                url, status, backoff
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }
        return Err(map_status(status, text));
    }
}

/// Where [`HttpQuotaSource`] gets its credentials from.
#[derive(Debug, Clone)]
enum CredentialSource {
    Fixed(Credentials),
    /// Re-read before every fetch; the environment fills gaps.
    Preferences(PreferencesStore),
}

/// [`QuotaSource`] backed by the usage HTTP endpoint.
pub struct HttpQuotaSource {
    client: Client,
    cfg: Config,
    creds: CredentialSource,
}

impl HttpQuotaSource {
    pub fn new(cfg: Config, creds: Credentials) -> reqwest::Result<Self> {
        Self::build(cfg, CredentialSource::Fixed(creds))
    }

    /// Resolve credentials from `store` on each fetch, so a session key or
    /// organization saved while running is picked up by the next refresh.
    pub fn with_preferences(cfg: Config, store: PreferencesStore) -> reqwest::Result<Self> {
        Self::build(cfg, CredentialSource::Preferences(store))
    }

    fn build(cfg: Config, creds: CredentialSource) -> reqwest::Result<Self> {
        let client = build_client(&cfg)?;
        Ok(Self { client, cfg, creds })
    }

    fn credentials(&self) -> Credentials {
        match &self.creds {
            CredentialSource::Fixed(creds) => creds.clone(),
            CredentialSource::Preferences(store) => store.load().credentials(&self.cfg),
        }
    }
}

#[async_trait]
impl QuotaSource for HttpQuotaSource {
    async fn fetch(&self) -> Result<QuotaSnapshot, FetchError> {
        let id = Uuid::new_v4();
        debug!("fetch {} started", id);
        let creds = self.credentials();
        let result = fetch_usage(&self.client, &self.cfg, &creds).await;
        match &result {
            Ok(snapshot) => info!(
                "fetch {} completed: {} metric(s)",
                id,
                snapshot.present().count()
            ),
            Err(e) => warn!("fetch {} failed: {}", id, e),
        }
        result
    }
}
