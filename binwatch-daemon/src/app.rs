use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use binwatch_core::{
    model::SensorId,
    service::{BinWatchService, ReadingOutcome},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tracing::error;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub readings: AtomicUsize,
    pub unresolved: AtomicUsize,
    pub store_failures: AtomicUsize,
    pub alerts: AtomicUsize,
    pub undelivered: AtomicUsize,
}

impl Counters {
    fn record(&self, outcome: &ReadingOutcome) {
        self.readings.fetch_add(1, Ordering::Relaxed);
        match outcome {
            ReadingOutcome::Unresolved { .. } => {
                self.unresolved.fetch_add(1, Ordering::Relaxed);
            }
            ReadingOutcome::StoreFailed { .. } => {
                self.store_failures.fetch_add(1, Ordering::Relaxed);
            }
            ReadingOutcome::Evaluated { .. } => {}
        }
    }
}

/// Routes readings to one single-writer queue per sensor.
///
/// Each queue is drained by its own worker, so readings of a bin are evaluated in the
/// order they were submitted while different bins proceed in parallel.
pub(crate) struct App {
    pub service: Arc<BinWatchService>,
    pub counters: Arc<Counters>,
    queues: HashMap<SensorId, UnboundedSender<f64>>,
    workers: JoinSet<()>,
}

impl App {
    pub(crate) fn new(service: Arc<BinWatchService>) -> Self {
        Self {
            service,
            counters: Arc::new(Counters::default()),
            queues: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    /// Queue a reading behind earlier readings of the same sensor.
    pub(crate) fn submit(&mut self, sensor: SensorId, distance: f64) {
        self.reap();
        let distance = match self.queue_for(&sensor).send(distance) {
            Ok(()) => return,
            Err(rejected) => rejected.0,
        };

        error!(%sensor, "reading worker stopped, restarting");
        self.queues.remove(&sensor);
        if self.queue_for(&sensor).send(distance).is_err() {
            error!(%sensor, "reading dropped, worker unavailable");
        }
    }

    /// Close every queue and wait for the queued readings and their alert rounds.
    pub(crate) async fn drain(&mut self) {
        self.queues.clear();
        while let Some(joined) = self.workers.join_next().await {
            report_join(joined);
        }
    }

    fn queue_for(&mut self, sensor: &SensorId) -> &UnboundedSender<f64> {
        match self.queues.entry(sensor.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let sender = spawn_worker(
                    &mut self.workers,
                    Arc::clone(&self.service),
                    Arc::clone(&self.counters),
                    sensor.clone(),
                );
                entry.insert(sender)
            }
        }
    }

    // Collect workers that stopped early so their failures are logged.
    fn reap(&mut self) {
        while let Some(joined) = self.workers.try_join_next() {
            report_join(joined);
        }
    }
}

fn spawn_worker(
    workers: &mut JoinSet<()>,
    service: Arc<BinWatchService>,
    counters: Arc<Counters>,
    sensor: SensorId,
) -> UnboundedSender<f64> {
    let (sender, readings) = mpsc::unbounded_channel();
    workers.spawn(run_queue(service, counters, sensor, readings));
    sender
}

async fn run_queue(
    service: Arc<BinWatchService>,
    counters: Arc<Counters>,
    sensor: SensorId,
    mut readings: UnboundedReceiver<f64>,
) {
    // Alert rounds are awaited off the queue so a slow relay does not hold back readings.
    let mut dispatches = JoinSet::new();

    while let Some(distance) = readings.recv().await {
        let mut outcome = service.handle_reading(sensor.clone(), distance).await;
        counters.record(&outcome);

        if let Some(dispatch) = outcome.take_dispatch() {
            counters.alerts.fetch_add(1, Ordering::Relaxed);
            let counters = Arc::clone(&counters);
            dispatches.spawn(async move {
                match dispatch.await {
                    Ok(report) => {
                        counters
                            .undelivered
                            .fetch_add(report.failed.len(), Ordering::Relaxed);
                    }
                    Err(err) => error!(error = %err, "alert dispatch task failed"),
                }
            });
        }

        while let Some(joined) = dispatches.try_join_next() {
            report_join(joined);
        }
    }

    while let Some(joined) = dispatches.join_next().await {
        report_join(joined);
    }
}

fn report_join(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "reading task failed");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use binwatch_core::{
        config::AlertSettings,
        model::{AlertState, Bin, BinId, Recipient},
        ports::{BinStore, DispatchReport, Notifier},
    };
    use binwatch_store_memory::MemoryStore;

    use super::*;

    struct CountingNotifier;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _bin: &Bin, _fill: f64, recipients: &[Recipient]) -> DispatchReport {
            DispatchReport {
                delivered: recipients.len(),
                ..DispatchReport::default()
            }
        }
    }

    fn bin(id: &str, sensor: &str) -> Bin {
        Bin {
            id: BinId(id.into()),
            name: format!("Bin {id}"),
            sensor: SensorId(sensor.into()),
            height: 100.0,
            threshold: 80.0,
            current_fill_percentage: 0.0,
            last_alert_time: None,
            location: None,
            recipients: Vec::new(),
        }
    }

    fn app(store: &Arc<MemoryStore>) -> App {
        let store: Arc<dyn BinStore> = Arc::<MemoryStore>::clone(store);
        let notifier: Arc<dyn Notifier> = Arc::new(CountingNotifier);
        App::new(Arc::new(BinWatchService::new(
            store,
            notifier,
            &AlertSettings::default(),
        )))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_bin_readings_apply_in_submission_order() {
        for round in 0..200 {
            let store = Arc::new(MemoryStore::new(vec![bin("b-1", "s-1")]));
            let mut app = app(&store);

            app.submit(SensorId("s-1".into()), 10.0);
            app.submit(SensorId("s-1".into()), 60.0);
            app.drain().await;

            let stored = store.get(&BinId("b-1".into())).expect("bin present");
            assert!(approx(stored.current_fill_percentage, 40.0), "round {round}");
            assert_eq!(stored.alert_state(), AlertState::Normal, "round {round}");
            assert_eq!(stored.last_alert_time, None, "round {round}");
            assert_eq!(app.counters.alerts.load(Ordering::Relaxed), 1, "round {round}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn interleaved_sensors_keep_their_own_order() {
        let store = Arc::new(MemoryStore::new(vec![bin("b-1", "s-1"), bin("b-2", "s-2")]));
        let mut app = app(&store);

        for distance in [50.0, 5.0, 70.0] {
            app.submit(SensorId("s-1".into()), distance);
            app.submit(SensorId("s-2".into()), 100.0 - distance);
        }
        app.submit(SensorId("s-unknown".into()), 1.0);
        app.drain().await;

        let first = store.get(&BinId("b-1".into())).expect("bin present");
        let second = store.get(&BinId("b-2".into())).expect("bin present");
        assert!(approx(first.current_fill_percentage, 30.0), "{first:?}");
        assert!(approx(second.current_fill_percentage, 70.0), "{second:?}");
        assert_eq!(app.counters.readings.load(Ordering::Relaxed), 7);
        assert_eq!(app.counters.unresolved.load(Ordering::Relaxed), 1);
    }
}
