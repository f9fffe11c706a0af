//! Status Engine
//!
//! Pure derivation of a sample's health status from its aspect's threshold
//! ranges, plus timeout-spec parsing for the periodic timeout sweep.
//!
//! Status is computed when a sample is written and stored in its hash; read
//! paths never recompute it.

use chrono::{DateTime, Utc};

use crate::domain::model::{Aspect, Status};
use crate::error::{Error, Result};

/// Exact sentinel value a timeout sweep writes into a sample's `value`.
pub const TIMEOUT_SENTINEL: &str = "Timeout";

/// Derive a sample's status from its aspect's ranges and raw value.
///
/// Evaluation order is fixed and load-bearing: overlapping ranges resolve by
/// severity precedence (Critical over Warning over Info over OK), never by the
/// order ranges happen to be stored in.
pub fn compute_status(aspect: Option<&Aspect>, value: &str) -> Status {
    let Some(aspect) = aspect else {
        return Status::Invalid;
    };
    if value.is_empty() {
        return Status::Invalid;
    }
    if value == TIMEOUT_SENTINEL {
        return Status::Timeout;
    }
    let Some(numeric) = coerce_value(value) else {
        return Status::Invalid;
    };
    for (status, range) in aspect.ranges_by_precedence() {
        if let Some(range) = range {
            if range.contains(numeric) {
                return status;
            }
        }
    }
    Status::Invalid
}

/// Coerce a raw sample value to a number: case-insensitive booleans map to
/// 1/0, anything else must parse numerically.
fn coerce_value(value: &str) -> Option<f64> {
    if value.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if value.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| !n.is_nan())
}

/// Parse a timeout spec `<integer><unit>` into whole seconds.
///
/// Recognized units are `s`, `m`, `h`, `d` (any case); a missing or
/// unrecognized suffix means seconds.
pub fn parse_timeout_seconds(spec: &str) -> Result<i64> {
    let spec = spec.trim();
    let digits_len = spec.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits_len == 0 {
        return Err(Error::DurationParse(spec.to_string()));
    }
    let count: i64 = spec[..digits_len]
        .parse()
        .map_err(|_| Error::DurationParse(spec.to_string()))?;
    let multiplier = match spec[digits_len..].chars().next() {
        Some('m') | Some('M') => 60,
        Some('h') | Some('H') => 3600,
        Some('d') | Some('D') => 86400,
        _ => 1,
    };
    Ok(count * multiplier)
}

/// Whether a sample last updated at `last_updated` has exceeded its aspect's
/// timeout as of `now`. The comparison is strict, in whole seconds.
pub fn is_timed_out(
    timeout_spec: &str,
    now: DateTime<Utc>,
    last_updated: DateTime<Utc>,
) -> Result<bool> {
    let timeout_seconds = parse_timeout_seconds(timeout_spec)?;
    Ok(timeout_seconds < (now - last_updated).num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ThresholdRange;
    use chrono::Duration;

    fn aspect_with_ranges(
        critical: Option<ThresholdRange>,
        warning: Option<ThresholdRange>,
        info: Option<ThresholdRange>,
        ok: Option<ThresholdRange>,
    ) -> Aspect {
        let mut aspect = Aspect::new("temperature");
        aspect.critical_range = critical;
        aspect.warning_range = warning;
        aspect.info_range = info;
        aspect.ok_range = ok;
        aspect
    }

    #[test]
    fn test_missing_aspect_is_invalid() {
        assert_eq!(compute_status(None, "1"), Status::Invalid);
    }

    #[test]
    fn test_empty_value_is_invalid() {
        let aspect = aspect_with_ranges(None, None, None, Some(ThresholdRange::new(Some(0.0), None)));
        assert_eq!(compute_status(Some(&aspect), ""), Status::Invalid);
    }

    #[test]
    fn test_timeout_sentinel() {
        let aspect = aspect_with_ranges(None, None, None, Some(ThresholdRange::new(Some(0.0), None)));
        assert_eq!(compute_status(Some(&aspect), "Timeout"), Status::Timeout);
        // Sentinel match is exact, not case-insensitive
        assert_eq!(compute_status(Some(&aspect), "timeout"), Status::Invalid);
    }

    #[test]
    fn test_boolean_coercion_ignores_case() {
        let aspect = aspect_with_ranges(
            Some(ThresholdRange::new(Some(1.0), Some(1.0))),
            None,
            None,
            Some(ThresholdRange::new(Some(0.0), Some(0.0))),
        );
        for raw in ["true", "TRUE", "True"] {
            assert_eq!(compute_status(Some(&aspect), raw), Status::Critical);
        }
        for raw in ["false", "False", "FALSE"] {
            assert_eq!(compute_status(Some(&aspect), raw), Status::Ok);
        }
    }

    #[test]
    fn test_non_numeric_value_is_invalid() {
        let aspect = aspect_with_ranges(None, None, None, Some(ThresholdRange::new(Some(0.0), None)));
        assert_eq!(compute_status(Some(&aspect), "lukewarm"), Status::Invalid);
        assert_eq!(compute_status(Some(&aspect), "NaN"), Status::Invalid);
    }

    #[test]
    fn test_severity_precedence_on_overlap() {
        // All four ranges contain 5; the most severe must win.
        let all = Some(ThresholdRange::new(Some(0.0), Some(10.0)));
        let aspect = aspect_with_ranges(all, all, all, all);
        assert_eq!(compute_status(Some(&aspect), "5"), Status::Critical);

        let aspect = aspect_with_ranges(None, all, all, all);
        assert_eq!(compute_status(Some(&aspect), "5"), Status::Warning);

        let aspect = aspect_with_ranges(None, None, all, all);
        assert_eq!(compute_status(Some(&aspect), "5"), Status::Info);
    }

    #[test]
    fn test_value_outside_all_ranges_is_invalid() {
        let aspect = aspect_with_ranges(
            Some(ThresholdRange::new(Some(0.0), Some(1.0))),
            None,
            None,
            Some(ThresholdRange::new(Some(2.0), Some(3.0))),
        );
        assert_eq!(compute_status(Some(&aspect), "1.5"), Status::Invalid);
    }

    #[test]
    fn test_unbounded_range_containment() {
        let aspect = aspect_with_ranges(None, None, None, Some(ThresholdRange::new(None, Some(1.0))));
        assert_eq!(compute_status(Some(&aspect), "-1000000"), Status::Ok);

        let aspect = aspect_with_ranges(None, None, None, Some(ThresholdRange::new(Some(0.0), None)));
        assert_eq!(compute_status(Some(&aspect), "1000000"), Status::Ok);
    }

    #[test]
    fn test_critical_scenario() {
        let aspect = aspect_with_ranges(
            Some(ThresholdRange::new(Some(0.0), Some(1.0))),
            None,
            None,
            None,
        );
        assert_eq!(compute_status(Some(&aspect), "0"), Status::Critical);
    }

    #[test]
    fn test_parse_timeout_units() {
        assert_eq!(parse_timeout_seconds("30s").unwrap(), 30);
        assert_eq!(parse_timeout_seconds("10m").unwrap(), 600);
        assert_eq!(parse_timeout_seconds("2h").unwrap(), 7200);
        assert_eq!(parse_timeout_seconds("1d").unwrap(), 86400);
        assert_eq!(parse_timeout_seconds("1D").unwrap(), 86400);
        // No suffix, and unrecognized suffixes, mean seconds
        assert_eq!(parse_timeout_seconds("90000").unwrap(), 90000);
        assert_eq!(parse_timeout_seconds("30x").unwrap(), 30);
    }

    #[test]
    fn test_parse_timeout_rejects_garbage() {
        assert!(parse_timeout_seconds("").is_err());
        assert!(parse_timeout_seconds("fast").is_err());
    }

    #[test]
    fn test_is_timed_out() {
        let now = Utc::now();
        assert!(is_timed_out("30s", now, now - Duration::seconds(31)).unwrap());
        assert!(!is_timed_out("30s", now, now - Duration::seconds(30)).unwrap());
        assert!(!is_timed_out("1m", now, now - Duration::seconds(30)).unwrap());
        assert!(is_timed_out("1d", now, now - Duration::seconds(90000)).unwrap());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Whenever the critical range contains the value, the result is
            /// Critical no matter how the other ranges overlap.
            #[test]
            fn critical_wins_overlap(value in -100.0f64..100.0) {
                let everything = Some(ThresholdRange::new(Some(-100.0), Some(100.0)));
                let aspect = aspect_with_ranges(everything, everything, everything, everything);
                prop_assert_eq!(
                    compute_status(Some(&aspect), &value.to_string()),
                    Status::Critical
                );
            }

            /// A value below every lower bound never lands in any range.
            #[test]
            fn below_all_ranges_is_invalid(value in -1000.0f64..-500.0) {
                let aspect = aspect_with_ranges(
                    Some(ThresholdRange::new(Some(0.0), Some(1.0))),
                    Some(ThresholdRange::new(Some(1.0), Some(2.0))),
                    None,
                    Some(ThresholdRange::new(Some(2.0), Some(3.0))),
                );
                prop_assert_eq!(compute_status(Some(&aspect), &value.to_string()), Status::Invalid);
            }
        }
    }
}
