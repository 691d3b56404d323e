//! Continuous single-host reachability monitor.
//!
//! A background [`SamplingLoop`] pings the destination once per cadence tick,
//! records each [`Outcome`] into a bounded [`HistoryRing`], the running
//! [`Statistics`] and an append-only CSV log, all under one lock, then hands a
//! [`RenderSnapshot`] to whatever presentation layer is attached.

pub mod app;
pub mod config;
pub mod dns_cache;
pub mod error;
pub mod history;
pub mod outcome;
pub mod probe;
pub mod projector;
pub mod result_log;
pub mod sampler;
pub mod session;
pub mod statistics;

pub use app::PingLoggerApp;
pub use config::AppConfig;
pub use error::{MonitorError, Result};
pub use history::{HISTORY_CAPACITY, HistoryRing};
pub use outcome::Outcome;
pub use probe::{IcmpProber, Prober};
pub use projector::{DisplayPoint, PointCategory, Projector, RenderSnapshot};
pub use result_log::ResultLogger;
pub use sampler::{MonitorSettings, SamplingLoop, SharedState, SnapshotSink};
pub use session::{Session, SessionConfig, SessionState};
pub use statistics::{Statistics, StatisticsSummary};
