//! Pace evaluation: is consumption ahead of where a uniform burn rate would
//! put it at this point in the window?
//!
//! When the reset time can't be used (missing, unparsable, already past, or
//! further out than one window) the evaluator switches to fixed utilization
//! thresholds instead. The two threshold sets are independent.

use chrono::{DateTime, Duration, Utc};

use crate::quota::{QuotaLimit, Status};

/// Absolute fallback: at or above this utilization the metric is critical.
pub const FALLBACK_CRITICAL_PERCENT: f64 = 80.0;
/// Absolute fallback: at or above this utilization the metric is a warning.
pub const FALLBACK_WARNING_PERCENT: f64 = 50.0;
/// Pace model: allowed overshoot above expected consumption before critical.
pub const PACE_WARNING_BAND: f64 = 10.0;

/// Which model produced a status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Basis {
    /// Linear pace model; `expected` is the percent a uniform burn would have
    /// consumed by now.
    Pace { expected: f64 },
    /// Reset time unusable; fixed utilization thresholds applied.
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub status: Status,
    pub display_percent: i64,
    pub basis: Basis,
}

/// Classify `limit` against a window of length `window` as of `now`.
///
/// Never fails; non-finite utilization yields [`Status::Unknown`].
pub fn evaluate(limit: &QuotaLimit, window: Duration, now: DateTime<Utc>) -> Evaluation {
    let utilization = limit.utilization;
    if !utilization.is_finite() {
        return Evaluation {
            status: Status::Unknown,
            display_percent: 0,
            basis: Basis::Absolute,
        };
    }
    let display_percent = utilization.round() as i64;

    let Some(expected) = limit
        .reset_time()
        .and_then(|reset| expected_consumption(reset - now, window))
    else {
        return Evaluation {
            status: classify_absolute(utilization),
            display_percent,
            basis: Basis::Absolute,
        };
    };

    Evaluation {
        status: classify_pace(utilization, expected),
        display_percent,
        basis: Basis::Pace { expected },
    }
}

/// Percent of the window elapsed, or `None` when `remaining` falls outside
/// `(0, window]`.
pub fn expected_consumption(remaining: Duration, window: Duration) -> Option<f64> {
    if remaining <= Duration::zero() || remaining > window {
        return None;
    }
    let window_ms = window.num_milliseconds() as f64;
    let elapsed_ms = (window - remaining).num_milliseconds() as f64;
    Some(elapsed_ms / window_ms * 100.0)
}

pub fn classify_pace(utilization: f64, expected: f64) -> Status {
    if utilization < expected {
        Status::OnTrack
    } else if utilization <= expected + PACE_WARNING_BAND {
        Status::SlightlyOver
    } else {
        Status::SignificantlyOver
    }
}

pub fn classify_absolute(utilization: f64) -> Status {
    if utilization >= FALLBACK_CRITICAL_PERCENT {
        Status::SignificantlyOver
    } else if utilization >= FALLBACK_WARNING_PERCENT {
        Status::SlightlyOver
    } else {
        Status::OnTrack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn five_hours() -> Duration {
        Duration::hours(5)
    }

    fn limit_resetting_in(utilization: f64, remaining: Duration) -> QuotaLimit {
        QuotaLimit::new(utilization, now() + remaining)
    }

    #[test]
    fn halfway_through_window_expects_fifty_percent() {
        let eval = evaluate(
            &limit_resetting_in(30.0, Duration::minutes(150)),
            five_hours(),
            now(),
        );
        assert_eq!(eval.basis, Basis::Pace { expected: 50.0 });
        assert_eq!(eval.status, Status::OnTrack);
        assert_eq!(eval.display_percent, 30);
    }

    #[test]
    fn exact_expected_is_slightly_over() {
        let eval = evaluate(
            &limit_resetting_in(50.0, Duration::minutes(150)),
            five_hours(),
            now(),
        );
        assert_eq!(eval.status, Status::SlightlyOver);
    }

    #[test]
    fn band_upper_edge_is_inclusive() {
        let at_edge = limit_resetting_in(60.0, Duration::minutes(150));
        assert_eq!(
            evaluate(&at_edge, five_hours(), now()).status,
            Status::SlightlyOver
        );
        let past_edge = limit_resetting_in(60.0001, Duration::minutes(150));
        assert_eq!(
            evaluate(&past_edge, five_hours(), now()).status,
            Status::SignificantlyOver
        );
    }

    #[test]
    fn same_utilization_reads_differently_by_elapsed_time() {
        // 90% of a week elapsed, only 40% used: fine.
        let week = Duration::days(7);
        let remaining = Duration::milliseconds(week.num_milliseconds() / 10);
        let late = QuotaLimit::new(40.0, now() + remaining);
        assert_eq!(evaluate(&late, week, now()).status, Status::OnTrack);

        // 10% elapsed, 40% used: alarming.
        let early = QuotaLimit::new(40.0, now() + (week - remaining));
        assert_eq!(
            evaluate(&early, week, now()).status,
            Status::SignificantlyOver
        );
    }

    #[test]
    fn past_reset_uses_absolute_thresholds() {
        for (util, expected) in [
            (10.0, Status::OnTrack),
            (49.9, Status::OnTrack),
            (50.0, Status::SlightlyOver),
            (79.9, Status::SlightlyOver),
            (80.0, Status::SignificantlyOver),
        ] {
            let eval = evaluate(
                &limit_resetting_in(util, Duration::seconds(-1)),
                five_hours(),
                now(),
            );
            assert_eq!(eval.basis, Basis::Absolute);
            assert_eq!(eval.status, expected, "utilization {util}");
        }
    }

    #[test]
    fn reset_exactly_now_uses_fallback() {
        let eval = evaluate(&limit_resetting_in(5.0, Duration::zero()), five_hours(), now());
        assert_eq!(eval.basis, Basis::Absolute);
        assert_eq!(eval.status, Status::OnTrack);
    }

    #[test]
    fn reset_beyond_window_uses_fallback() {
        let eval = evaluate(
            &limit_resetting_in(5.0, five_hours() + Duration::seconds(1)),
            five_hours(),
            now(),
        );
        assert_eq!(eval.basis, Basis::Absolute);
        assert_eq!(eval.status, Status::OnTrack);
    }

    #[test]
    fn full_window_remaining_is_still_pace_model() {
        let eval = evaluate(&limit_resetting_in(0.0, five_hours()), five_hours(), now());
        assert_eq!(eval.basis, Basis::Pace { expected: 0.0 });
        assert_eq!(eval.status, Status::SlightlyOver);
    }

    #[test]
    fn unparsable_reset_uses_fallback() {
        let limit = QuotaLimit {
            utilization: 85.0,
            resets_at: Some("not a date".into()),
        };
        let eval = evaluate(&limit, five_hours(), now());
        assert_eq!(eval.basis, Basis::Absolute);
        assert_eq!(eval.status, Status::SignificantlyOver);
    }

    #[test]
    fn out_of_range_utilization_is_valid_data() {
        let eval = evaluate(
            &limit_resetting_in(112.4, Duration::minutes(30)),
            five_hours(),
            now(),
        );
        assert_eq!(eval.status, Status::SignificantlyOver);
        assert_eq!(eval.display_percent, 112);
    }

    #[test]
    fn nan_utilization_is_unknown() {
        let eval = evaluate(
            &limit_resetting_in(f64::NAN, Duration::minutes(30)),
            five_hours(),
            now(),
        );
        assert_eq!(eval.status, Status::Unknown);
    }

    #[test]
    fn total_over_grid() {
        let window = five_hours();
        for util in (0..=100).step_by(5) {
            for mins in (1..=300).step_by(13) {
                let limit = limit_resetting_in(util as f64, Duration::minutes(mins));
                let a = evaluate(&limit, window, now());
                let b = evaluate(&limit, window, now());
                assert_eq!(a, b);
                assert!(matches!(a.basis, Basis::Pace { .. }));
                assert_ne!(a.status, Status::Unknown);
            }
        }
    }
}
