use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a monitoring session.
///
/// Probe failures are not errors: they are recorded as failed outcomes.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("destination host must not be empty")]
    EmptyDestination,

    #[error("destination host {0:?} contains a comma or line break")]
    InvalidDestination(String),

    #[error("session has already been started")]
    AlreadyStarted,

    #[error("session is not running")]
    NotRunning,

    #[error("could not find the documents directory")]
    NoDocumentDir,

    #[error("failed to write result log {}: {source}", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("shared monitor state is poisoned")]
    StatePoisoned,

    #[error("sampling thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
