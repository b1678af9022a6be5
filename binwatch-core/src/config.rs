//! Tunable parameters of the fill and alert logic.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default minimum gap between two alerts for the same overflow.
pub const DEFAULT_INTERVAL_MINUTES: i64 = 60;
/// Default upper bound of the fill scale.
pub const DEFAULT_PERCENTAGE_SCALE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Settings shared by the fill calculator and the alert coordinator.
pub struct AlertSettings {
    /// Cooldown between notifications for a sustained overflow, in minutes.
    pub interval_minutes: i64,
    /// Value a completely full bin maps to.
    pub percentage_scale: f64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            percentage_scale: DEFAULT_PERCENTAGE_SCALE,
        }
    }
}

impl AlertSettings {
    /// Cooldown as a time delta, or `None` when it is negative or out of range.
    #[must_use]
    pub fn try_interval(&self) -> Option<TimeDelta> {
        if self.interval_minutes < 0 {
            return None;
        }
        TimeDelta::try_minutes(self.interval_minutes)
    }

    /// Cooldown as a time delta, falling back to the default when unusable.
    #[must_use]
    pub fn interval(&self) -> TimeDelta {
        self.try_interval().unwrap_or_else(|| {
            warn!(
                interval_minutes = self.interval_minutes,
                "alert interval out of range, using default"
            );
            TimeDelta::minutes(DEFAULT_INTERVAL_MINUTES)
        })
    }

    /// Whether `percentage_scale` is finite and positive.
    #[must_use]
    pub fn has_valid_scale(&self) -> bool {
        is_valid_scale(self.percentage_scale)
    }
}

/// Whether `scale` can bound a fill computation.
#[must_use]
pub fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval_is_one_hour() {
        assert_eq!(AlertSettings::default().interval(), TimeDelta::hours(1));
    }

    #[test]
    fn out_of_range_interval_falls_back_to_default() {
        for interval_minutes in [i64::MAX, i64::MIN, -5] {
            let settings = AlertSettings {
                interval_minutes,
                ..AlertSettings::default()
            };
            assert!(settings.try_interval().is_none(), "{interval_minutes}");
            assert_eq!(settings.interval(), TimeDelta::hours(1), "{interval_minutes}");
        }
    }

    #[test]
    fn scale_must_be_finite_and_positive() {
        assert!(AlertSettings::default().has_valid_scale(), "default scale");
        for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(!is_valid_scale(scale), "{scale}");
        }
    }
}
