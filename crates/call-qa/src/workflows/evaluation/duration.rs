use serde::{Deserialize, Serialize};

/// Allowed drift between an imported call's duration and the uploaded recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationTolerance {
    pub min_seconds: f64,
    pub ratio: f64,
}

impl Default for DurationTolerance {
    fn default() -> Self {
        Self {
            min_seconds: 3.0,
            ratio: 0.15,
        }
    }
}

impl DurationTolerance {
    pub fn allowed_for(&self, expected: f64) -> f64 {
        self.min_seconds.max(expected * self.ratio)
    }

    /// Compare durations in seconds. Nothing is checked without an expectation.
    /// A non-finite or negative `actual` counts as an unknown length.
    pub fn check(&self, expected: Option<f64>, actual: Option<f64>) -> Option<DurationCheck> {
        let expected = expected.filter(|value| value.is_finite() && *value > 0.0)?;
        let actual = actual.filter(|value| value.is_finite() && *value >= 0.0);
        let allowed = self.allowed_for(expected);
        Some(DurationCheck {
            expected,
            actual,
            allowed,
            mismatch: actual.is_some_and(|actual| (actual - expected).abs() > allowed),
        })
    }
}

/// Outcome of comparing one recording against its expected duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationCheck {
    pub expected: f64,
    /// `None` while the recording's length is not known.
    pub actual: Option<f64>,
    pub allowed: f64,
    pub mismatch: bool,
}

impl DurationCheck {
    pub fn length_unknown(&self) -> bool {
        self.actual.is_none()
    }
}

/// Render seconds as `m:ss`, or `h:mm:ss` past an hour.
pub fn format_seconds(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => return "—".to_string(),
    };

    let total = seconds.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_drift_beyond_percentage_tolerance() {
        let check = DurationTolerance::default()
            .check(Some(120.0), Some(100.0))
            .expect("expected duration known");
        assert_eq!(check.allowed, 18.0);
        assert!(check.mismatch);
    }

    #[test]
    fn short_calls_use_minimum_tolerance() {
        let tolerance = DurationTolerance::default();
        let check = tolerance.check(Some(10.0), Some(12.5)).expect("checked");
        assert_eq!(check.allowed, 3.0);
        assert!(!check.mismatch);

        let check = tolerance.check(Some(10.0), Some(13.5)).expect("checked");
        assert!(check.mismatch);
    }

    #[test]
    fn skipped_without_expected_duration() {
        assert!(DurationTolerance::default().check(None, Some(42.0)).is_none());
        assert!(DurationTolerance::default().check(Some(0.0), Some(42.0)).is_none());
    }

    #[test]
    fn non_finite_recording_length_is_unknown_not_a_match() {
        let tolerance = DurationTolerance::default();
        for actual in [Some(f64::NAN), Some(f64::INFINITY), Some(-1.0), None] {
            let check = tolerance.check(Some(120.0), actual).expect("expectation known");
            assert!(check.length_unknown(), "{actual:?} should be unknown");
            assert!(!check.mismatch);
        }
    }

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_seconds(Some(65.4)), "1:05");
        assert_eq!(format_seconds(Some(3725.0)), "1:02:05");
        assert_eq!(format_seconds(None), "—");
    }
}
