//! Value types shared across the tracking pipeline.
//!
//! All events carry UTC timestamps. `Position` is the only value that
//! crosses the persistence boundary; its byte encoding lives in the
//! session store.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A single position fix from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Timestamp of the fix
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Create a fix stamped with the current time.
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, Utc::now())
    }
}

/// Classified physical activity, as reported by the activity provider.
///
/// Doubles as the resolved label shown in the summary and written to the
/// session store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivityKind {
    Still,
    OnFoot,
    Walking,
    Running,
    OnBicycle,
    InVehicle,
    Tilting,
    #[default]
    Unknown,
}

impl ActivityKind {
    /// Human-readable label, also the persisted representation.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Still => "still",
            ActivityKind::OnFoot => "on foot",
            ActivityKind::Walking => "walking",
            ActivityKind::Running => "running",
            ActivityKind::OnBicycle => "on bicycle",
            ActivityKind::InVehicle => "in vehicle",
            ActivityKind::Tilting => "tilting",
            ActivityKind::Unknown => "unknown",
        }
    }

    /// Parse a persisted label. Unrecognized input maps to `Unknown`
    /// rather than failing, so a corrupt record never aborts a restore.
    pub fn from_label(label: &str) -> Self {
        match label {
            "still" => ActivityKind::Still,
            "on foot" => ActivityKind::OnFoot,
            "walking" => ActivityKind::Walking,
            "running" => ActivityKind::Running,
            "on bicycle" => ActivityKind::OnBicycle,
            "in vehicle" => ActivityKind::InVehicle,
            "tilting" => ActivityKind::Tilting,
            _ => ActivityKind::Unknown,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ActivityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(ActivityKind::from_label(&label))
    }
}

/// One guess from the activity provider: a kind plus a 0-100 confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCandidate {
    pub kind: ActivityKind,
    pub confidence: u8,
}

impl ActivityCandidate {
    pub fn new(kind: ActivityKind, confidence: u8) -> Self {
        Self { kind, confidence }
    }
}

/// Screen power transition delivered by the power-state source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    ScreenOn,
    ScreenOff,
}

/// Command from the user-facing control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Start,
    Stop,
    /// Stop if tracking, then ask the host to shut the agent down.
    LongPress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_label_round_trip() {
        for kind in [
            ActivityKind::Still,
            ActivityKind::OnFoot,
            ActivityKind::Walking,
            ActivityKind::Running,
            ActivityKind::OnBicycle,
            ActivityKind::InVehicle,
            ActivityKind::Tilting,
            ActivityKind::Unknown,
        ] {
            assert_eq!(ActivityKind::from_label(kind.label()), kind);
        }
    }

    #[test]
    fn test_unrecognized_label_is_unknown() {
        assert_eq!(ActivityKind::from_label("levitating"), ActivityKind::Unknown);
        assert_eq!(ActivityKind::from_label(""), ActivityKind::Unknown);
    }

    #[test]
    fn test_activity_serializes_as_label() {
        let json = serde_json::to_string(&ActivityKind::OnBicycle).unwrap();
        assert_eq!(json, "\"on bicycle\"");
        let back: ActivityKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActivityKind::OnBicycle);
    }
}
