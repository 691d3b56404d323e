//! Turns history and statistics into something a renderer can draw.
//!
//! Heights use a logarithmic mapping so that variation below 50ms stays
//! visible while multi-second outliers remain bounded by the display extent.

use std::path::{Path, PathBuf};

use crate::history::{HISTORY_CAPACITY, HistoryRing};
use crate::outcome::Outcome;
use crate::statistics::{Statistics, StatisticsSummary};

/// Round trips at or below this are drawn as fast.
pub const DEFAULT_FAST_THRESHOLD_MS: u32 = 50;

/// Display units per decade of milliseconds.
pub const LOG_SCALE: f64 = 95.0;

/// Tallest bar the display can show.
pub const MAX_DISPLAY_EXTENT: f64 = 350.0;

const GRID_DECADES: [f64; 5] = [1.0, 10.0, 100.0, 1000.0, 10000.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCategory {
    /// Slot not written yet, drawn hidden.
    NoData,
    SuccessFast,
    SuccessSlow,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    pub category: PointCategory,
    pub round_trip_millis: u32,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub value_ms: f64,
    pub height: f64,
    pub major: bool,
}

/// A point-in-time copy of ring and statistics, safe to hand to another
/// thread.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub destination: String,
    pub log_file: PathBuf,
    /// One point per ring slot, oldest first, unfilled slots trailing.
    pub points: Vec<DisplayPoint>,
    pub statistics: StatisticsSummary,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    pub fast_threshold_ms: u32,
    pub max_extent: f64,
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            fast_threshold_ms: DEFAULT_FAST_THRESHOLD_MS,
            max_extent: MAX_DISPLAY_EXTENT,
        }
    }
}

pub fn log_height(millis: f64) -> f64 {
    LOG_SCALE * millis.max(1.0).log10()
}

impl Projector {
    pub fn with_fast_threshold(mut self, fast_threshold_ms: u32) -> Self {
        self.fast_threshold_ms = fast_threshold_ms;
        self
    }

    pub fn classify(&self, outcome: &Outcome) -> PointCategory {
        if !outcome.success {
            PointCategory::Failure
        } else if outcome.round_trip_millis <= self.fast_threshold_ms {
            PointCategory::SuccessFast
        } else {
            PointCategory::SuccessSlow
        }
    }

    pub fn point(&self, outcome: &Outcome) -> DisplayPoint {
        let category = self.classify(outcome);
        let height = match category {
            PointCategory::Failure => self.max_extent,
            _ => log_height(f64::from(outcome.round_trip_millis)).min(self.max_extent),
        };
        DisplayPoint {
            category,
            round_trip_millis: outcome.round_trip_millis,
            height,
        }
    }

    pub fn project<const N: usize>(
        &self,
        history: &HistoryRing<N>,
        statistics: &Statistics,
        destination: &str,
        log_file: &Path,
    ) -> RenderSnapshot {
        let empty = DisplayPoint {
            category: PointCategory::NoData,
            round_trip_millis: 0,
            height: 0.0,
        };
        let mut points: Vec<DisplayPoint> = history.iter().map(|o| self.point(o)).collect();
        points.resize(N, empty);

        let statistics = statistics.snapshot();
        RenderSnapshot {
            destination: destination.to_string(),
            log_file: log_file.to_path_buf(),
            points,
            summary: summary_text(&statistics, log_file),
            statistics,
        }
    }

    /// Decade lines plus one minor line per multiple inside each decade,
    /// limited to what fits in the display extent.
    pub fn grid_lines(&self) -> Vec<GridLine> {
        let mut lines = Vec::new();
        let mut prev: Option<f64> = None;
        for decade in GRID_DECADES {
            if let Some(step) = prev {
                let mut value = step * 2.0;
                while value < decade {
                    lines.push(GridLine {
                        value_ms: value,
                        height: log_height(value),
                        major: false,
                    });
                    value += step;
                }
            }
            lines.push(GridLine {
                value_ms: decade,
                height: log_height(decade),
                major: true,
            });
            prev = Some(decade);
        }
        lines.retain(|line| line.height <= self.max_extent);
        lines
    }
}

pub fn summary_text(stats: &StatisticsSummary, log_file: &Path) -> String {
    let (min, max) = if stats.has_replies() {
        (stats.min_time.to_string(), stats.max_time.to_string())
    } else {
        ("-".to_string(), "-".to_string())
    };
    format!(
        "{} packets sent, {} received ({:.3}% lost)\nMin={}ms, Max={}ms, avg={}ms\nLog file {}",
        stats.num_sent,
        stats.num_received,
        stats.pct_lost,
        min,
        max,
        stats.avg_time,
        log_file.display()
    )
}

/// Empty snapshot shown before the first probe completes.
pub fn initial_snapshot(destination: &str, log_file: &Path) -> RenderSnapshot {
    Projector::default().project(
        &HistoryRing::<HISTORY_CAPACITY>::new(),
        &Statistics::new(),
        destination,
        log_file,
    )
}
