use std::time::Duration;

/// Result of a single echo request. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub success: bool,
    pub round_trip_millis: u32,
    pub time_to_live: u32,
}

impl Outcome {
    pub fn success(round_trip_millis: u32, time_to_live: u32) -> Self {
        Self {
            success: true,
            round_trip_millis,
            time_to_live,
        }
    }

    /// A failed probe reports the timeout as its round trip and a zero TTL.
    pub fn failure(timeout: Duration) -> Self {
        Self {
            success: false,
            round_trip_millis: duration_millis(timeout),
            time_to_live: 0,
        }
    }
}

/// Whole milliseconds, saturating at `u32::MAX`.
pub fn duration_millis(duration: Duration) -> u32 {
    duration.as_millis().min(u32::MAX as u128) as u32
}
