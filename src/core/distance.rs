//! Distance accumulation over a stream of position fixes.
//!
//! The accumulator keeps the most recent fix as its anchor and reports
//! the great-circle distance from that anchor on every update, so the
//! total follows the travelled path rather than the straight line back
//! to the start.

use crate::core::types::Position;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two fixes in meters (haversine).
pub fn haversine_meters(a: &Position, b: &Position) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Tracks the session anchor and produces cumulative distance increments.
///
/// Holds no state beyond the anchor; reset on every stop-then-start
/// cycle.
#[derive(Debug, Default)]
pub struct DistanceAccumulator {
    anchor: Option<Position>,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self { anchor: None }
    }

    /// Create an accumulator re-anchored at a restored position.
    pub fn with_anchor(anchor: Option<Position>) -> Self {
        Self { anchor }
    }

    /// Feed a new fix and return the incremental meters travelled.
    ///
    /// The first fix establishes the anchor and contributes zero. Never
    /// returns a negative value.
    pub fn update(&mut self, position: Position) -> f64 {
        let increment = match self.anchor {
            Some(ref anchor) => haversine_meters(anchor, &position).max(0.0),
            None => 0.0,
        };
        self.anchor = Some(position);
        increment
    }

    pub fn anchor(&self) -> Option<&Position> {
        self.anchor.as_ref()
    }

    /// Clear the anchor for a fresh session.
    pub fn reset(&mut self) {
        self.anchor = None;
    }
}
