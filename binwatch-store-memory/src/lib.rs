//! Bin store kept in process memory, seeded at startup.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use binwatch_core::{
    model::{Bin, BinId, SensorId},
    ports::{BinStore, PortError},
};

#[derive(Default)]
struct Tables {
    bins: HashMap<BinId, Bin>,
    // sensor -> bin it is mounted in
    sensors: HashMap<SensorId, BinId>,
}

/// Store holding every bin in a map keyed by id, with a sensor index.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Build a store from the given bins.
    ///
    /// When two bins claim the same sensor the later one wins and a warning is logged.
    #[must_use]
    pub fn new(bins: Vec<Bin>) -> Self {
        let mut tables = Tables::default();
        for bin in bins {
            if let Some(previous) = tables.sensors.insert(bin.sensor.clone(), bin.id.clone()) {
                warn!(sensor = %bin.sensor, previous = %previous, bin_id = %bin.id, "sensor mapped to more than one bin");
            }
            tables.bins.insert(bin.id.clone(), bin);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Current snapshot of a bin.
    #[must_use]
    pub fn get(&self, id: &BinId) -> Option<Bin> {
        self.tables.read().bins.get(id).cloned()
    }

    /// Snapshot of all bins, ordered by id.
    #[must_use]
    pub fn bins(&self) -> Vec<Bin> {
        let mut bins: Vec<Bin> = self.tables.read().bins.values().cloned().collect();
        bins.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        bins
    }
}

#[async_trait]
impl BinStore for MemoryStore {
    async fn find_bin_for_sensor(&self, sensor: &SensorId) -> Result<Option<Bin>, PortError> {
        let tables = self.tables.read();
        Ok(tables
            .sensors
            .get(sensor)
            .and_then(|id| tables.bins.get(id))
            .cloned())
    }

    async fn save(&self, bin: &Bin) -> Result<(), PortError> {
        let mut tables = self.tables.write();
        let stored = tables
            .bins
            .get_mut(&bin.id)
            .ok_or_else(|| PortError::UnknownBin(bin.id.to_string()))?;
        // Only the fields the core owns are committed.
        stored.current_fill_percentage = bin.current_fill_percentage;
        stored.last_alert_time = bin.last_alert_time;
        Ok(())
    }
}
