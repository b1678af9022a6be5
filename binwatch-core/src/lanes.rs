//! Per-bin lanes that serialize evaluations of the same bin.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::model::BinId;

/// Registry of one async mutex per bin.
///
/// Evaluations holding the guard for a bin run one at a time; different bins never
/// contend. Lanes hold no bin data.
#[derive(Default)]
pub struct BinLanes {
    lanes: Mutex<HashMap<BinId, Arc<AsyncMutex<()>>>>,
}

impl BinLanes {
    /// Build an empty lane table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the lane for `bin` is free and take it.
    pub async fn acquire(&self, bin: &BinId) -> OwnedMutexGuard<()> {
        let lane = {
            let mut lanes = self.lanes.lock();
            Arc::clone(lanes.entry(bin.clone()).or_default())
        };
        lane.lock_owned().await
    }

    /// Number of bins that have been given a lane.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.lock().len()
    }

    /// Whether no lane has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.lock().is_empty()
    }
}
