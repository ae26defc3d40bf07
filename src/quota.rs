//! Quota snapshot model: one usage limit per metric slot, as reported by the
//! usage endpoint.

use chrono::{DateTime, Duration, Utc};
use crate::error::UnknownMetric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Usage metrics tracked by the monitor.
///
/// `SevenDayOpus` and `SevenDayOauthApps` are shown alongside the others but
/// can never be selected as the active metric; see [`MetricKind::is_selectable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    FiveHour,
    #[default]
    SevenDayAll,
    SevenDaySonnet,
    SevenDayOpus,
    SevenDayOauthApps,
}

impl MetricKind {
    /// Display order for menu listings.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::FiveHour,
        MetricKind::SevenDayAll,
        MetricKind::SevenDaySonnet,
        MetricKind::SevenDayOpus,
        MetricKind::SevenDayOauthApps,
    ];

    pub const SELECTABLE: [MetricKind; 3] = [
        MetricKind::FiveHour,
        MetricKind::SevenDayAll,
        MetricKind::SevenDaySonnet,
    ];

    /// Length of the reset cycle for this metric.
    pub fn window(self) -> Duration {
        match self {
            MetricKind::FiveHour => Duration::hours(5),
            MetricKind::SevenDayAll
            | MetricKind::SevenDaySonnet
            | MetricKind::SevenDayOpus
            | MetricKind::SevenDayOauthApps => Duration::days(7)
        }
    }

    pub fn is_selectable(self) -> bool {
        !matches!(self, MetricKind::SevenDayOpus | MetricKind::SevenDayOauthApps)
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::FiveHour => "5-hour Limit",
            MetricKind::SevenDayAll => "7-day Limit (All Models)",
            MetricKind::SevenDaySonnet => "7-day Limit (Sonnet)",
            MetricKind::SevenDayOpus => "7-day Limit (Opus)",
            MetricKind::SevenDayOauthApps => "7-day Limit (OAuth Apps)",
        }
    }

    /// Name accepted on the command line.
    pub fn cli_name(self) -> &'static str {
        match self {
            MetricKind::FiveHour => "five-hour",
            MetricKind::SevenDayAll => "seven-day",
            MetricKind::SevenDaySonnet => "seven-day-sonnet",
            MetricKind::SevenDayOpus => "seven-day-opus",
            MetricKind::SevenDayOauthApps => "seven-day-oauth-apps",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "five-hour" | "five_hour" | "5h" => Ok(MetricKind::FiveHour),
            "seven-day" | "seven_day" | "seven_day_all" | "7d" => Ok(MetricKind::SevenDayAll),
            "seven-day-sonnet" | "seven_day_sonnet" | "sonnet" => Ok(MetricKind::SevenDaySonnet),
            "seven-day-opus" | "seven_day_opus" | "opus" => Ok(MetricKind::SevenDayOpus),
            "seven-day-oauth-apps" | "seven_day_oauth_apps" | "oauth-apps" => {
                Ok(MetricKind::SevenDayOauthApps)
            }
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

/// One metric's reading: percent of quota used and when the window resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaLimit {
    pub utilization: f64,
    /// Raw ISO-8601 timestamp as sent by the server. Kept unparsed so a bad
    /// value can still be shown verbatim.
    #[serde(default)]
    pub resets_at: Option<String>,
}

impl QuotaLimit {
    pub fn new(utilization: f64, resets_at: DateTime<Utc>) -> Self {
        Self {
            utilization,
            resets_at: Some(resets_at.to_rfc3339()),
        }
    }

    /// Parsed reset time; `None` when missing or not valid RFC 3339.
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        self.resets_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse an RFC 3339 timestamp (fractional seconds allowed) into UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Full response of the usage endpoint. Slots the server does not report are
/// `None`; unrecognised slots are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    #[serde(default)]
    pub five_hour: Option<QuotaLimit>,
    #[serde(default)]
    pub seven_day: Option<QuotaLimit>,
    #[serde(default)]
    pub seven_day_oauth_apps: Option<QuotaLimit>,
    #[serde(default)]
    pub seven_day_opus: Option<QuotaLimit>,
    #[serde(default)]
    pub seven_day_sonnet: Option<QuotaLimit>,
}

impl QuotaSnapshot {
    pub fn limit(&self, kind: MetricKind) -> Option<&QuotaLimit> {
        match kind {
            MetricKind::FiveHour => self.five_hour.as_ref(),
            MetricKind::SevenDayAll => self.seven_day.as_ref(),
            MetricKind::SevenDaySonnet => self.seven_day_sonnet.as_ref(),
            MetricKind::SevenDayOpus => self.seven_day_opus.as_ref(),
            MetricKind::SevenDayOauthApps => self.seven_day_oauth_apps.as_ref(),
        }
    }

    /// Present metrics in display order.
    pub fn present(&self) -> impl Iterator<Item = (MetricKind, &QuotaLimit)> + '_ {
        MetricKind::ALL
            .into_iter()
            .filter_map(move |kind| self.limit(kind).map(|limit| (kind, limit)))
    }
}

/// Status derived for the active metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    OnTrack,
    SlightlyOver,
    SignificantlyOver,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_wire_payload_with_nulls_and_extra_slots() {
        let body = serde_json::json!({
            "five_hour": {"utilization": 12.0, "resets_at": "2025-09-01T10:00:00.123456+00:00"},
            "seven_day": {"utilization": 40.5, "resets_at": "2025-09-05T00:00:00.000Z"},
            "seven_day_opus": null,
            "iguana_necktie": null,
            "extra_usage": {"is_enabled": false}
        });
        let snap: QuotaSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snap.five_hour.as_ref().unwrap().utilization, 12.0);
        assert!(snap.seven_day_opus.is_none());
        assert!(snap.seven_day_sonnet.is_none());
        let reset = snap.seven_day.unwrap().reset_time().unwrap();
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 9, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_or_garbage_reset_is_none() {
        let limit: QuotaLimit = serde_json::from_str(r#"{"utilization": 3}"#).unwrap();
        assert!(limit.reset_time().is_none());
        let bad = QuotaLimit {
            utilization: 3.0,
            resets_at: Some("tomorrow-ish".into()),
        };
        assert!(bad.reset_time().is_none());
    }

    #[test]
    fn limit_lookup_maps_seven_day_all_to_seven_day_slot() {
        let snap = QuotaSnapshot {
            seven_day: Some(QuotaLimit {
                utilization: 7.0,
                resets_at: None,
            }),
            ..Default::default()
        };
        assert!(snap.limit(MetricKind::SevenDayAll).is_some());
        assert!(snap.limit(MetricKind::FiveHour).is_none());
        let kinds: Vec<_> = snap.present().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![MetricKind::SevenDayAll]);
    }

    #[test]
    fn oauth_apps_slot_is_listed_after_the_others() {
        let body = serde_json::json!({
            "seven_day": {"utilization": 10.0, "resets_at": null},
            "seven_day_oauth_apps": {"utilization": 3.0, "resets_at": null}
        });
        let snap: QuotaSnapshot = serde_json::from_value(body).unwrap();
        let kinds: Vec<_> = snap.present().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![MetricKind::SevenDayAll, MetricKind::SevenDayOauthApps]
        );
        assert_eq!(
            snap.limit(MetricKind::SevenDayOauthApps).unwrap().utilization,
            3.0
        );
    }

    #[test]
    fn metric_names_and_windows() {
        assert_eq!("5h".parse::<MetricKind>().unwrap(), MetricKind::FiveHour);
        assert_eq!(
            "seven-day".parse::<MetricKind>().unwrap(),
            MetricKind::SevenDayAll
        );
        assert!("hourly".parse::<MetricKind>().is_err());
        assert_eq!(MetricKind::FiveHour.window(), Duration::hours(5));
        assert_eq!(MetricKind::SevenDaySonnet.window(), Duration::hours(168));
        assert!(!MetricKind::SevenDayOpus.is_selectable());
        assert!(!MetricKind::SevenDayOauthApps.is_selectable());
        assert_eq!(MetricKind::default(), MetricKind::SevenDayAll);
    }
}
