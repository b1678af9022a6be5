//! Threshold comparison and notification throttling for a single bin.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::AlertSettings;
use crate::model::{AlertState, Bin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Outcome of evaluating one fill level against a bin.
pub enum AlertDecision {
    /// Fill is below the threshold; the cooldown was reset.
    Normal,
    /// Fill is at or above the threshold and recipients should be alerted.
    Notify,
    /// Fill is at or above the threshold but an alert went out at `since`.
    Suppressed {
        /// Time of the alert that opened the current cooldown window.
        since: DateTime<Utc>,
    },
}

impl AlertDecision {
    /// Whether recipients must be notified.
    #[must_use]
    pub fn notify(self) -> bool {
        matches!(self, Self::Notify)
    }

    /// Alert state the bin is in after the decision.
    #[must_use]
    pub fn state(self) -> AlertState {
        match self {
            Self::Normal => AlertState::Normal,
            Self::Notify | Self::Suppressed { .. } => AlertState::Alerting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Decides when an overflowing bin warrants a new notification.
pub struct AlertCoordinator {
    interval: TimeDelta,
}

impl Default for AlertCoordinator {
    fn default() -> Self {
        Self::from_settings(&AlertSettings::default())
    }
}

impl AlertCoordinator {
    /// Coordinator enforcing the given cooldown between notifications.
    #[must_use]
    pub fn new(interval: TimeDelta) -> Self {
        Self { interval }
    }

    /// Coordinator configured from [`AlertSettings`].
    #[must_use]
    pub fn from_settings(settings: &AlertSettings) -> Self {
        Self::new(settings.interval())
    }

    /// Cooldown between notifications.
    #[must_use]
    pub fn interval(&self) -> TimeDelta {
        self.interval
    }

    /// Record `fill` on the bin and update its alert state.
    ///
    /// `current_fill_percentage` is always overwritten. `last_alert_time` is set when a
    /// notification is due and cleared when the fill drops under the threshold.
    pub fn evaluate(&self, bin: &mut Bin, fill: f64, now: DateTime<Utc>) -> AlertDecision {
        bin.current_fill_percentage = fill;

        if fill < bin.threshold {
            bin.last_alert_time = None;
            return AlertDecision::Normal;
        }

        // An interval reaching before the representable range keeps every alert in cooldown.
        let window_start = now.checked_sub_signed(self.interval);
        match (bin.last_alert_time, window_start) {
            (Some(since), Some(start)) if since < start => {
                bin.last_alert_time = Some(now);
                AlertDecision::Notify
            }
            (Some(since), _) => AlertDecision::Suppressed { since },
            (None, _) => {
                bin.last_alert_time = Some(now);
                AlertDecision::Notify
            }
        }
    }
}
