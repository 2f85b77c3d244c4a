//! Live tracking summary.
//!
//! One summary is computed per tick while a session is active and
//! handed to every registered observer. Speed is the session average in
//! km/h; a zero elapsed time reports zero speed rather than NaN.

use crate::core::types::ActivityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a running session, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Average speed over the session in km/h
    pub speed_kmh: f64,
    /// Total distance travelled in whole meters
    pub distance_meters: u32,
    /// Whole minutes elapsed since the session started
    pub elapsed_minutes: i64,
    /// Remaining seconds, zero-padded to two digits
    pub elapsed_seconds: String,
    /// Current activity label
    pub activity: ActivityKind,
}

impl Summary {
    /// Compute a summary for a session started at `started_at`, observed
    /// at `now`, with `distance_meters` travelled so far.
    pub fn compute(
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
        distance_meters: f64,
        activity: ActivityKind,
    ) -> Self {
        let millis = (now - started_at).num_milliseconds().max(0);
        let minutes = millis / 60_000;
        let seconds = (millis - minutes * 60_000) / 1_000;

        let speed_kmh = if millis == 0 {
            0.0
        } else {
            let hours = millis as f64 / 3_600_000.0;
            (distance_meters / 1_000.0) / hours
        };

        Self {
            speed_kmh,
            distance_meters: distance_meters.max(0.0) as u32,
            elapsed_minutes: minutes,
            elapsed_seconds: format!("{seconds:02}"),
            activity,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} km/h  {} m  {}:{}  {}",
            self.speed_kmh,
            self.distance_meters,
            self.elapsed_minutes,
            self.elapsed_seconds,
            self.activity
        )
    }
}

/// Receives the summary emitted on each tick.
///
/// Implemented by the display layer; the tracker never blocks on an
/// observer.
pub trait SummaryObserver: Send {
    fn summary(&mut self, summary: &Summary);
}
