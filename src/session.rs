//! One monitoring session: a fixed destination, one log file and exactly one
//! sampling thread.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::NaiveDateTime;
use tokio::sync::watch;

use crate::error::{MonitorError, Result};
use crate::probe::Prober;
use crate::result_log::{LOG_DIR_NAME, session_file_name};
use crate::sampler::{MonitorSettings, SamplingLoop, SharedState, SnapshotSink};

/// `<documents>/pingLog`
pub fn default_log_dir() -> Result<PathBuf> {
    dirs::document_dir()
        .map(|dir| dir.join(LOG_DIR_NAME))
        .ok_or(MonitorError::NoDocumentDir)
}

/// Destination and log file, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    destination_host: String,
    log_file_path: PathBuf,
}

impl SessionConfig {
    pub fn new(destination_host: &str, log_dir: &Path, started_at: NaiveDateTime) -> Result<Self> {
        let destination_host = destination_host.trim();
        if destination_host.is_empty() {
            return Err(MonitorError::EmptyDestination);
        }
        // The host is written verbatim into every CSV row.
        if destination_host.contains([',', '\r', '\n']) {
            return Err(MonitorError::InvalidDestination(destination_host.to_string()));
        }

        Ok(Self {
            destination_host: destination_host.to_string(),
            log_file_path: log_dir.join(session_file_name(started_at, destination_host)),
        })
    }

    pub fn destination_host(&self) -> &str {
        &self.destination_host
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

struct Worker {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
}

enum Phase {
    Idle,
    Running(Worker),
    Stopped,
}

/// Idle until started once, then Running until stopped. Not restartable.
pub struct Session {
    config: SessionConfig,
    settings: MonitorSettings,
    phase: Phase,
    shared: Option<SharedState>,
}

impl Session {
    pub fn new(config: SessionConfig, settings: MonitorSettings) -> Self {
        Self {
            config,
            settings,
            phase: Phase::Idle,
            shared: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// A running session whose thread already exited (e.g. after a failed
    /// log write) reports Stopped.
    pub fn state(&self) -> SessionState {
        match &self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Running(worker) if worker.handle.is_finished() => SessionState::Stopped,
            Phase::Running(_) => SessionState::Running,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    /// Shared state for readers; present once the session has started.
    pub fn shared(&self) -> Option<&SharedState> {
        self.shared.as_ref()
    }

    /// Creates the log file and spawns the sampling thread.
    pub fn start<P: Prober, S: SnapshotSink>(&mut self, prober: P, sink: S) -> Result<SharedState> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(MonitorError::AlreadyStarted);
        }

        let shared = SharedState::open(
            &self.config.destination_host,
            &self.config.log_file_path,
            self.settings.projector,
        )?;
        self.launch(shared, prober, sink)
    }

    fn launch<P: Prober, S: SnapshotSink>(&mut self, shared: SharedState, prober: P, sink: S) -> Result<SharedState> {
        let destination = self.config.destination_host.clone();
        let (cancel, cancel_rx) = watch::channel(false);
        let sampling = SamplingLoop::new(destination.clone(), self.settings, prober, sink, shared.clone());

        let handle = thread::Builder::new()
            .name("sampling-loop".to_string())
            .spawn(move || -> Result<()> {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                rt.block_on(sampling.run(cancel_rx))
            })?;

        log::info!(
            "Started monitoring {destination}, logging to {}",
            self.config.log_file_path.display()
        );
        self.phase = Phase::Running(Worker { cancel, handle });
        self.shared = Some(shared.clone());
        Ok(shared)
    }

    /// Signals the loop to finish after its current probe without waiting.
    pub fn request_stop(&self) {
        if let Phase::Running(worker) = &self.phase {
            let _ = worker.cancel.send(true);
        }
    }

    /// Cancels the loop and waits for it, returning the error that ended it
    /// early, if any.
    pub fn stop(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Idle => {
                self.phase = Phase::Idle;
                Err(MonitorError::NotRunning)
            }
            Phase::Stopped => Ok(()),
            Phase::Running(worker) => {
                let _ = worker.cancel.send(true);
                let result = worker
                    .handle
                    .join()
                    .map_err(|_| MonitorError::WorkerPanicked)?;
                log::info!("Stopped monitoring {}", self.config.destination_host);
                result
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.request_stop();
    }
}
