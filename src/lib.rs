//! Speed Tracker Agent - background session tracker.
//!
//! This library fuses three independent input streams - a periodic
//! clock tick, position fixes, and classified physical-activity
//! batches - into a single running summary (elapsed time, distance,
//! average speed, activity label), and persists enough state to resume
//! an interrupted session across process restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Speed Tracker Agent                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌──────────┐  ┌────────┐                     │
//! │  │ Position │  │ Activity │  │ Ticker │   external sources  │
//! │  └────┬─────┘  └────┬─────┘  └───┬────┘                     │
//! │       │             │            │      ┌───────────┐       │
//! │       ▼             ▼            ▼      │   Power   │       │
//! │  ╔═════════════════════════════════╗◀──│   Gate    │       │
//! │  ║       single event queue        ║    └───────────┘       │
//! │  ╚═══════════════╦═════════════════╝                        │
//! │                  ▼                                          │
//! │        ┌──────────────────┐       ┌───────────────┐         │
//! │        │  TrackingState   │──────▶│ SessionStore  │         │
//! │        │     Machine      │       └───────────────┘         │
//! │        └────────┬─────────┘                                 │
//! │                 ▼                                           │
//! │        ┌──────────────────┐                                 │
//! │        │ SummaryObservers │                                 │
//! │        └──────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are applied strictly one at a time by the worker draining the
//! queue; the state machine owns the session and is the only writer of
//! persisted state.
//!
//! # Example
//!
//! ```no_run
//! use speed_tracker_agent::{agent, core, provider, store};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let (sender, receiver) = crossbeam_channel::unbounded();
//! let tick_pending = Arc::new(AtomicBool::new(false));
//!
//! let mut machine = core::TrackingStateMachine::new(
//!     store::SessionStore::new("/tmp/session.json".into()),
//!     Box::new(provider::SimPositionProvider::spawn(
//!         provider::SimWalkConfig::default(),
//!         sender.clone(),
//!     )),
//!     Box::new(provider::SimActivityProvider::spawn(
//!         Duration::from_secs(10),
//!         sender.clone(),
//!     )),
//!     Box::new(agent::ThreadTicker::new(
//!         Duration::from_secs(1),
//!         sender.clone(),
//!         tick_pending.clone(),
//!     )),
//! );
//!
//! // Resume a persisted session, or wait for a start command.
//! machine.restore();
//! ```

pub mod agent;
pub mod config;
pub mod core;
pub mod power;
pub mod provider;
pub mod store;

// Re-export key types at crate root for convenience
pub use agent::{EventLoop, ExitReason, ThreadTicker};
pub use config::Config;
pub use crate::core::{
    ActivityCandidate, ActivityKind, DistanceAccumulator, Flow, Position, PowerEvent, Session,
    StateHandle, Summary, SummaryObserver, TrackerEvent, TrackingState, TrackingStateMachine,
    UserCommand,
};
pub use power::PowerStateGate;
pub use provider::{
    ActivityProvider, PositionProvider, PowerSource, SimActivityProvider, SimPositionProvider,
    SimPowerSource, SimWalkConfig, Ticker,
};
pub use store::{PersistedSession, SessionStore, StoreError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
