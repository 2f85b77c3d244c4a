//! Core tracking logic.
//!
//! This module contains:
//! - Value types shared across the pipeline
//! - Activity classification (batch -> single label)
//! - Distance accumulation over position fixes
//! - The per-tick summary
//! - The tracking state machine that ties them together

pub mod classify;
pub mod distance;
pub mod summary;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use classify::resolve;
pub use distance::{haversine_meters, DistanceAccumulator};
pub use summary::{Summary, SummaryObserver};
pub use tracker::{
    Flow, Session, StateHandle, TrackerEvent, TrackingState, TrackingStateMachine,
};
pub use types::{ActivityCandidate, ActivityKind, Position, PowerEvent, UserCommand};
