//! Traits describing the collaborators the core relies on, plus shared result types.

use async_trait::async_trait;

use crate::model::{Bin, Recipient, SensorId};

#[derive(thiserror::Error, Debug)]
/// Errors reported by store backends.
pub enum PortError {
    /// Backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Bin handed to `save` is unknown to the store.
    #[error("Unknown bin: {0}")]
    UnknownBin(String),
    /// Internal backend error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Persistence backend owning the bins.
pub trait BinStore: Send + Sync {
    /// Resolve the bin a sensor is mounted in.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend fails. An unmapped sensor is `Ok(None)`.
    async fn find_bin_for_sensor(&self, sensor: &SensorId) -> Result<Option<Bin>, PortError>;

    /// Commit the given bin snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the snapshot could not be stored.
    async fn save(&self, bin: &Bin) -> Result<(), PortError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A recipient that could not be reached after all delivery attempts.
pub struct DeliveryFailure {
    /// Address delivery was attempted to.
    pub address: String,
    /// Last error observed.
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Summary of one notification round.
pub struct DispatchReport {
    /// Recipients the message was handed to.
    pub delivered: usize,
    /// Recipients without a contact address.
    pub skipped: usize,
    /// Recipients dropped after exhausting retries.
    pub failed: Vec<DeliveryFailure>,
}

impl DispatchReport {
    /// Whether every addressable recipient was served.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[async_trait]
/// Outbound channel used to alert recipients about an overflowing bin.
///
/// Implementations handle delivery failures per recipient and never abort the round.
pub trait Notifier: Send + Sync {
    /// Send an overflow alert for `bin` at `fill` percent to each addressable recipient.
    async fn notify(&self, bin: &Bin, fill: f64, recipients: &[Recipient]) -> DispatchReport;
}
