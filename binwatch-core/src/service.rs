//! High-level service turning sensor readings into persisted bin state and alerts.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::alert::{AlertCoordinator, AlertDecision};
use crate::config::AlertSettings;
use crate::fill::{FillAnomaly, FillCalculator};
use crate::lanes::BinLanes;
use crate::model::{BinId, Reading, SensorId};
use crate::ports::{BinStore, DispatchReport, Notifier, PortError};

#[derive(Debug)]
/// What happened to a single reading.
pub enum ReadingOutcome {
    /// No bin is mapped to the sensor; nothing was saved or sent.
    Unresolved {
        /// Sensor that reported the reading.
        sensor: SensorId,
    },
    /// The store failed; the reading was dropped.
    StoreFailed {
        /// Sensor that reported the reading.
        sensor: SensorId,
        /// Error raised by the store.
        error: PortError,
    },
    /// The bin was evaluated and saved.
    Evaluated {
        /// Bin the reading belongs to.
        bin: BinId,
        /// Fill percentage stored on the bin.
        fill: f64,
        /// Alerting decision taken.
        decision: AlertDecision,
        /// Running notification round, present when `decision` notifies.
        dispatch: Option<JoinHandle<DispatchReport>>,
    },
}

impl ReadingOutcome {
    /// Alerting decision, if the bin was evaluated.
    #[must_use]
    pub fn decision(&self) -> Option<AlertDecision> {
        match self {
            Self::Evaluated { decision, .. } => Some(*decision),
            Self::Unresolved { .. } | Self::StoreFailed { .. } => None,
        }
    }

    /// Take the notification handle out of the outcome.
    pub fn take_dispatch(&mut self) -> Option<JoinHandle<DispatchReport>> {
        match self {
            Self::Evaluated { dispatch, .. } => dispatch.take(),
            Self::Unresolved { .. } | Self::StoreFailed { .. } => None,
        }
    }
}

/// Public entry point for processing sensor readings.
pub struct BinWatchService {
    store: Arc<dyn BinStore>,
    notifier: Arc<dyn Notifier>,
    calculator: FillCalculator,
    coordinator: AlertCoordinator,
    lanes: BinLanes,
}

impl BinWatchService {
    /// Create a service bound to the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn BinStore>,
        notifier: Arc<dyn Notifier>,
        settings: &AlertSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            calculator: FillCalculator::new(settings.percentage_scale),
            coordinator: AlertCoordinator::from_settings(settings),
            lanes: BinLanes::new(),
        }
    }

    /// Process a distance reading received now.
    pub async fn handle_reading(&self, sensor: SensorId, distance: f64) -> ReadingOutcome {
        self.handle_reading_at(Reading::new(sensor, distance, Utc::now()))
            .await
    }

    /// Process a reading using its own timestamp as the evaluation time.
    ///
    /// Must run inside a Tokio runtime: notifications are dispatched on a spawned task
    /// after the bin has been saved.
    pub async fn handle_reading_at(&self, reading: Reading) -> ReadingOutcome {
        let Reading {
            sensor,
            distance,
            received_at,
        } = reading;

        let bin_id = match self.store.find_bin_for_sensor(&sensor).await {
            Ok(Some(bin)) => bin.id,
            Ok(None) => {
                warn!(%sensor, "no bin mapped to sensor, reading dropped");
                return ReadingOutcome::Unresolved { sensor };
            }
            Err(error) => return store_failed(sensor, error),
        };

        let _lane = self.lanes.acquire(&bin_id).await;

        // Re-read under the lane so the cooldown check sees the last committed state.
        let mut bin = match self.store.find_bin_for_sensor(&sensor).await {
            Ok(Some(bin)) if bin.id == bin_id => bin,
            Ok(_) => {
                warn!(%sensor, bin_id = %bin_id, "sensor remapped during evaluation, reading dropped");
                return ReadingOutcome::Unresolved { sensor };
            }
            Err(error) => return store_failed(sensor, error),
        };

        let level = self.calculator.compute(bin.height, distance);
        if let Some(anomaly) = level.anomaly {
            log_anomaly(anomaly, &bin_id, bin.height, distance);
        }
        let fill = level.percentage;

        let decision = self.coordinator.evaluate(&mut bin, fill, received_at);
        debug!(bin_id = %bin_id, name = %bin.name, fill, ?decision, "bin evaluated");

        if let Err(error) = self.store.save(&bin).await {
            return store_failed(sensor, error);
        }

        let dispatch = if decision.notify() {
            info!(bin_id = %bin_id, name = %bin.name, fill, "fill threshold reached, alerting recipients");
            let notifier = Arc::clone(&self.notifier);
            Some(tokio::spawn(async move {
                let report = notifier.notify(&bin, fill, &bin.recipients).await;
                log_report(&bin.id, &report);
                report
            }))
        } else {
            None
        };

        ReadingOutcome::Evaluated {
            bin: bin_id,
            fill,
            decision,
            dispatch,
        }
    }
}

fn store_failed(sensor: SensorId, error: PortError) -> ReadingOutcome {
    error!(%sensor, %error, "bin store failed, reading dropped");
    ReadingOutcome::StoreFailed { sensor, error }
}

fn log_anomaly(anomaly: FillAnomaly, bin_id: &BinId, height: f64, distance: f64) {
    match anomaly {
        FillAnomaly::NonPositiveHeight => {
            warn!(bin_id = %bin_id, height, "bin height is not positive, fill reported as 0");
        }
        FillAnomaly::DistanceBeyondHeight => {
            warn!(bin_id = %bin_id, height, distance, "distance exceeds bin height, treating bin as empty");
        }
        FillAnomaly::NegativeDistance => {
            warn!(bin_id = %bin_id, height, distance, "negative distance reading");
        }
        FillAnomaly::NonFiniteInput => {
            warn!(bin_id = %bin_id, height, distance, "non-finite input, fill reported as 0");
        }
    }
}

fn log_report(bin_id: &BinId, report: &DispatchReport) {
    for failure in &report.failed {
        error!(bin_id = %bin_id, recipient = %failure.address, reason = %failure.reason, "alert not delivered");
    }
    info!(
        bin_id = %bin_id,
        delivered = report.delivered,
        skipped = report.skipped,
        failed = report.failed.len(),
        "alert round finished"
    );
}
