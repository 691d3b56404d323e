//! The background sampling loop and the state it shares with readers.
//!
//! History, statistics and the log handle live behind a single mutex. The loop takes it only to publish an outcome; it is never
//! held across a probe or the sleep between probes.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;

use crate::error::{MonitorError, Result};
use crate::history::HistoryRing;
use crate::outcome::Outcome;
use crate::probe::Prober;
use crate::projector::{Projector, RenderSnapshot};
use crate::result_log::ResultLogger;
use crate::statistics::Statistics;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Receives a fresh snapshot after every probe.
///
/// Called on the sampling thread, so implementations must hand the value
/// off quickly rather than render in place.
pub trait SnapshotSink: Send + 'static {
    fn on_snapshot_ready(&self, snapshot: RenderSnapshot);
}

impl SnapshotSink for mpsc::Sender<RenderSnapshot> {
    fn on_snapshot_ready(&self, snapshot: RenderSnapshot) {
        // A closed receiver just means nobody is watching any more.
        let _ = self.send(snapshot);
    }
}

/// Cadence and display settings for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub projector: Projector,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            projector: Projector::default(),
        }
    }
}

#[derive(Debug)]
struct MonitorState {
    destination: String,
    history: HistoryRing,
    statistics: Statistics,
    logger: ResultLogger,
    projector: Projector,
}

impl MonitorState {
    fn project(&self) -> RenderSnapshot {
        self.projector.project(
            &self.history,
            &self.statistics,
            &self.destination,
            self.logger.path(),
        )
    }
}

/// Cloneable handle to the state guarded by the session lock.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<MonitorState>>,
}

impl SharedState {
    pub fn new(destination: impl Into<String>, logger: ResultLogger, projector: Projector) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorState {
                destination: destination.into(),
                history: HistoryRing::new(),
                statistics: Statistics::new(),
                logger,
                projector,
            })),
        }
    }

    /// Creates the session log and wraps it with empty history and statistics.
    pub fn open(destination: &str, log_file: &Path, projector: Projector) -> Result<Self> {
        let logger = ResultLogger::create(log_file)?;
        Ok(Self::new(destination, logger, projector))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MonitorState>> {
        self.inner.lock().map_err(|_| MonitorError::StatePoisoned)
    }

    /// Records, counts and logs one outcome in a single critical section,
    /// returning the projection taken before the lock is released.
    pub fn publish(&self, at: NaiveDateTime, outcome: Outcome) -> Result<RenderSnapshot> {
        let mut state = self.lock()?;
        state.history.record(outcome);
        state.statistics.update(&outcome);

        let MonitorState {
            destination,
            logger,
            ..
        } = &mut *state;
        logger.append(at, destination, &outcome)?;

        Ok(state.project())
    }

    /// Fresh projection of the current state.
    pub fn snapshot(&self) -> Result<RenderSnapshot> {
        Ok(self.lock()?.project())
    }

    pub fn history(&self) -> Result<Vec<Outcome>> {
        Ok(self.lock()?.history.snapshot())
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        Ok(self.lock()?.logger.path().to_path_buf())
    }
}

/// Drives the prober forever at a fixed cadence until cancelled.
pub struct SamplingLoop<P, S> {
    destination: String,
    settings: MonitorSettings,
    prober: P,
    sink: S,
    shared: SharedState,
}

impl<P: Prober, S: SnapshotSink> SamplingLoop<P, S> {
    pub fn new(
        destination: impl Into<String>,
        settings: MonitorSettings,
        prober: P,
        sink: S,
        shared: SharedState,
    ) -> Self {
        Self {
            destination: destination.into(),
            settings,
            prober,
            sink,
            shared,
        }
    }

    /// Runs until `cancel` turns true or its sender is dropped.
    ///
    /// Cancellation is checked at the top of each iteration, so a probe in
    /// flight is always completed and recorded. Only a failed log write or
    /// a poisoned lock ends the loop with an error.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> Result<()> {
        log::info!(
            "Sampling {} every {}ms (timeout {}ms)",
            self.destination,
            self.settings.interval.as_millis(),
            self.settings.timeout.as_millis()
        );

        let mut iterations: u64 = 0;
        loop {
            if *cancel.borrow_and_update() {
                break;
            }

            let outcome = self.prober.probe(&self.destination, self.settings.timeout).await;
            if !outcome.success {
                log::debug!("Probe to {} failed", self.destination);
            }

            let snapshot = match self.shared.publish(Local::now().naive_local(), outcome) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::error!("Stopping sampling of {}: {e}", self.destination);
                    return Err(e);
                }
            };
            self.sink.on_snapshot_ready(snapshot);
            iterations += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        log::info!("Stopped sampling {} after {iterations} probes", self.destination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;

    use super::*;

    /// Replays a fixed script, then cancels once it runs out.
    struct ScriptedProber {
        script: Mutex<VecDeque<Outcome>>,
        cancel: watch::Sender<bool>,
    }

    impl Prober for ScriptedProber {
        async fn probe(&self, _destination: &str, timeout: Duration) -> Outcome {
            let (outcome, drained) = {
                let mut script = self.script.lock().unwrap();
                let outcome = script.pop_front().unwrap_or(Outcome::failure(timeout));
                (outcome, script.is_empty())
            };
            if drained {
                let _ = self.cancel.send(true);
            }
            outcome
        }
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(3000),
            projector: Projector::default(),
        }
    }

    async fn run_script(script: Vec<Outcome>) -> (SharedState, mpsc::Receiver<RenderSnapshot>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedState::open("10.0.0.1", &dir.path().join("run.csv"), Projector::default()).unwrap();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (tx, rx) = mpsc::channel();
        let prober = ScriptedProber {
            script: Mutex::new(script.into()),
            cancel: cancel_tx,
        };

        SamplingLoop::new("10.0.0.1", settings(), prober, tx, shared.clone())
            .run(cancel_rx)
            .await
            .unwrap();
        (shared, rx, dir)
    }

    #[tokio::test]
    async fn unreachable_host_three_ticks() {
        let failed = Outcome::failure(Duration::from_millis(3000));
        let (shared, rx, _dir) = run_script(vec![failed; 3]).await;

        let snapshot = shared.snapshot().unwrap();
        assert_eq!(snapshot.statistics.num_sent, 3);
        assert_eq!(snapshot.statistics.num_received, 0);
        assert_eq!(snapshot.statistics.pct_lost, 100.0);

        let content = fs::read_to_string(shared.log_path().unwrap()).unwrap();
        let rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.contains(",10.0.0.1,False,3000,0")));

        assert_eq!(rx.try_iter().count(), 3);
    }

    #[tokio::test]
    async fn mixed_results_feed_statistics_and_history() {
        let mut script: Vec<Outcome> = [10, 20, 30, 40, 50, 60, 70]
            .into_iter()
            .map(|rtt| Outcome::success(rtt, 55))
            .collect();
        script.extend([Outcome::failure(Duration::from_millis(3000)); 3]);
        let (shared, rx, _dir) = run_script(script.clone()).await;

        let stats = shared.snapshot().unwrap().statistics;
        assert_eq!(stats.num_sent, 10);
        assert_eq!(stats.num_received, 7);
        assert_eq!((stats.min_time, stats.max_time, stats.avg_time), (10, 70, 40));
        assert!((stats.pct_lost - 30.0).abs() < 1e-9);
        assert_eq!(shared.history().unwrap(), script);

        // The last snapshot delivered matches what a reader sees afterwards.
        let last = rx.try_iter().last().unwrap();
        assert_eq!(last, shared.snapshot().unwrap());
    }

    #[tokio::test]
    async fn cancelled_before_start_never_probes() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedState::open("h", &dir.path().join("run.csv"), Projector::default()).unwrap();
        let (cancel_tx, cancel_rx) = watch::channel(true);
        let (tx, rx) = mpsc::channel();
        let prober = ScriptedProber {
            script: Mutex::new(VecDeque::new()),
            cancel: cancel_tx,
        };

        SamplingLoop::new("h", settings(), prober, tx, shared.clone())
            .run(cancel_rx)
            .await
            .unwrap();
        assert_eq!(shared.snapshot().unwrap().statistics.num_sent, 0);
        assert!(shared.history().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_sender_stops_the_loop() {
        struct Always;
        impl Prober for Always {
            async fn probe(&self, _destination: &str, _timeout: Duration) -> Outcome {
                Outcome::success(1, 64)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let shared = SharedState::open("h", &dir.path().join("run.csv"), Projector::default()).unwrap();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        drop(cancel_tx);
        let (tx, _rx) = mpsc::channel();

        SamplingLoop::new("h", settings(), Always, tx, shared.clone())
            .run(cancel_rx)
            .await
            .unwrap();
        assert_eq!(shared.snapshot().unwrap().statistics.num_sent, 1);
    }

    #[tokio::test]
    async fn failed_log_write_ends_the_loop() {
        use crate::result_log::{FailAfter, LOG_HEADER};

        let logger = ResultLogger::from_writer("full.csv", FailAfter::new(LOG_HEADER.len() + 1)).unwrap();
        let shared = SharedState::new("h", logger, Projector::default());
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let (tx, rx) = mpsc::channel();
        let prober = ScriptedProber {
            script: Mutex::new(VecDeque::from([Outcome::success(5, 64), Outcome::success(6, 64)])),
            cancel: watch::channel(false).0,
        };

        let result = SamplingLoop::new("h", settings(), prober, tx, shared.clone())
            .run(cancel_rx)
            .await;
        assert!(matches!(result, Err(MonitorError::LogWrite { .. })));
        assert!(rx.try_recv().is_err());
        // The outcome reached memory before the write failed.
        assert_eq!(shared.history().unwrap(), vec![Outcome::success(5, 64)]);
    }
}
