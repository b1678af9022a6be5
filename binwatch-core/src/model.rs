//! Domain data structures for bins, recipients, and sensor readings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a monitored bin.
pub struct BinId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a distance sensor mounted in a bin lid.
pub struct SensorId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a cleaner or staff member.
pub struct RecipientId(pub String);

impl fmt::Display for BinId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Where a bin is placed.
pub struct Location {
    /// Free-form street address.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Staff member that receives overflow alerts for a bin.
pub struct Recipient {
    /// Unique identifier.
    pub id: RecipientId,
    /// Name used when greeting the recipient.
    pub name: String,
    /// Contact address; recipients without one are skipped when notifying.
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A monitored bin and its alert state.
pub struct Bin {
    /// Unique identifier.
    pub id: BinId,
    /// Human-friendly display name.
    pub name: String,
    /// Sensor reporting distances for this bin.
    pub sensor: SensorId,
    /// Distance from the sensor to the bottom of the empty bin.
    pub height: f64,
    /// Fill percentage at or above which alerts are raised.
    pub threshold: f64,
    /// Fill percentage computed from the most recent reading.
    pub current_fill_percentage: f64,
    /// When the last alert was dispatched; cleared once the fill drops under the threshold.
    pub last_alert_time: Option<DateTime<Utc>>,
    /// Optional placement of the bin.
    pub location: Option<Location>,
    /// Staff notified when the bin overflows, in registration order.
    pub recipients: Vec<Recipient>,
}

impl Bin {
    /// Address text of the bin, if a location is registered.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.location
            .as_ref()
            .map(|location| location.address.as_str())
    }

    /// Alert state implied by the stored fill percentage.
    #[must_use]
    pub fn alert_state(&self) -> AlertState {
        if self.current_fill_percentage >= self.threshold {
            AlertState::Alerting
        } else {
            AlertState::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Two-state view of a bin's alerting condition.
pub enum AlertState {
    /// Fill below the threshold.
    Normal,
    /// Fill at or above the threshold.
    Alerting,
}

#[derive(Debug, Clone, PartialEq)]
/// One sample delivered by a sensor.
pub struct Reading {
    /// Sensor that produced the sample.
    pub sensor: SensorId,
    /// Measured distance from the sensor to the fill surface.
    pub distance: f64,
    /// When the reading was received.
    pub received_at: DateTime<Utc>,
}

impl Reading {
    /// Construct a reading received at the given instant.
    #[must_use]
    pub fn new(sensor: SensorId, distance: f64, received_at: DateTime<Utc>) -> Self {
        Self {
            sensor,
            distance,
            received_at,
        }
    }
}
