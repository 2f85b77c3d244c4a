//! The tracking state machine.
//!
//! Owns the session lifecycle (idle -> active -> paused -> idle),
//! orchestrates distance accumulation and activity resolution, drives
//! the periodic summary tick, and decides what persisted state to write
//! on each transition. All events are applied one at a time by a single
//! worker; see the agent event loop.

use crate::core::classify;
use crate::core::distance::DistanceAccumulator;
use crate::core::summary::{Summary, SummaryObserver};
use crate::core::types::{ActivityCandidate, ActivityKind, Position, PowerEvent, UserCommand};
use crate::provider::{ActivityProvider, PositionProvider, Ticker};
use crate::store::{PersistedSession, SessionStore};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Active,
    Paused,
}

/// Read-only view of the tracker's current state, shareable across
/// threads. Used by the power gate and the display layer; only the
/// state machine writes it.
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<AtomicU8>);

const STATE_IDLE: u8 = 0;
const STATE_ACTIVE: u8 = 1;
const STATE_PAUSED: u8 = 2;

impl StateHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(STATE_IDLE)))
    }

    fn set(&self, state: TrackingState) {
        let raw = match state {
            TrackingState::Idle => STATE_IDLE,
            TrackingState::Active => STATE_ACTIVE,
            TrackingState::Paused => STATE_PAUSED,
        };
        self.0.store(raw, Ordering::SeqCst);
    }

    pub fn state(&self) -> TrackingState {
        match self.0.load(Ordering::SeqCst) {
            STATE_ACTIVE => TrackingState::Active,
            STATE_PAUSED => TrackingState::Paused,
            _ => TrackingState::Idle,
        }
    }

    /// True while a session exists (active or paused).
    pub fn has_session(&self) -> bool {
        self.state() != TrackingState::Idle
    }
}

/// An event delivered to the tracker queue.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Command(UserCommand),
    Power(PowerEvent),
    /// A position fix, tagged with the subscription epoch it was
    /// delivered under.
    Position { epoch: u64, position: Position },
    /// A batch of activity candidates, tagged like position fixes.
    Activity {
        epoch: u64,
        candidates: Vec<ActivityCandidate>,
    },
    /// Periodic summary tick, stamped by the tick source.
    Tick { at: DateTime<Utc> },
    /// A sensing collaborator failed its connection; the host must
    /// terminate the agent.
    ProviderFailure,
}

/// What the event loop should do after an event is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Hand control back to the host to terminate the agent.
    Terminate,
}

/// The in-memory record of one start-to-stop tracking interval.
#[derive(Debug, Clone)]
pub struct Session {
    /// Position recorded at start; absent until the first fix when the
    /// provider had no last-known position.
    pub anchor: Option<Position>,
    pub started_at: DateTime<Utc>,
    pub distance_meters: f64,
    pub activity: ActivityKind,
}

pub struct TrackingStateMachine {
    state: TrackingState,
    handle: StateHandle,
    session: Option<Session>,
    accumulator: DistanceAccumulator,
    /// Bumped on every subscribe; events tagged with an older epoch are
    /// from a superseded subscription and are dropped.
    epoch: u64,
    store: SessionStore,
    positions: Box<dyn PositionProvider>,
    activities: Box<dyn ActivityProvider>,
    ticker: Box<dyn Ticker>,
    observers: Vec<Box<dyn SummaryObserver>>,
}

impl TrackingStateMachine {
    pub fn new(
        store: SessionStore,
        positions: Box<dyn PositionProvider>,
        activities: Box<dyn ActivityProvider>,
        ticker: Box<dyn Ticker>,
    ) -> Self {
        Self {
            state: TrackingState::Idle,
            handle: StateHandle::new(),
            session: None,
            accumulator: DistanceAccumulator::new(),
            epoch: 0,
            store,
            positions,
            activities,
            ticker,
            observers: Vec::new(),
        }
    }

    /// Shareable read-only view of the current state.
    pub fn state_handle(&self) -> StateHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Register an observer for per-tick summaries.
    pub fn add_observer(&mut self, observer: Box<dyn SummaryObserver>) {
        self.observers.push(observer);
    }

    /// Resume a persisted session, if one exists.
    ///
    /// Called once at startup. Distance is not persisted: the
    /// accumulator is re-anchored at the stored position and reports
    /// zero until a fresh fix arrives. The provider's current last-known
    /// fix, when available, is applied immediately as that first fix.
    pub fn restore(&mut self) {
        if self.state != TrackingState::Idle {
            return;
        }

        let Some(persisted) = self.store.load() else {
            return;
        };

        tracing::info!(
            started_at = %persisted.started_at,
            activity = %persisted.activity,
            "resuming persisted session"
        );

        self.session = Some(Session {
            anchor: Some(persisted.anchor),
            started_at: persisted.started_at,
            distance_meters: 0.0,
            activity: persisted.activity,
        });
        self.accumulator = DistanceAccumulator::with_anchor(Some(persisted.anchor));
        self.set_state(TrackingState::Active);
        self.subscribe_all();

        if let Some(fix) = self.positions.last_known() {
            self.apply_fix(fix);
        }
    }

    /// Apply one event. Events that do not apply in the current state
    /// are no-ops; nothing here ever panics past the machine.
    pub fn handle(&mut self, event: TrackerEvent) -> Flow {
        match event {
            TrackerEvent::Command(UserCommand::Start) => {
                if self.state == TrackingState::Idle {
                    self.start_session();
                }
            }
            TrackerEvent::Command(UserCommand::Stop) => {
                if self.state != TrackingState::Idle {
                    self.stop_session();
                }
            }
            TrackerEvent::Command(UserCommand::LongPress) => {
                // Always forces a stop, then asks the host to shut down.
                if self.state != TrackingState::Idle {
                    self.stop_session();
                }
                tracing::info!("long press: requesting host termination");
                return Flow::Terminate;
            }
            TrackerEvent::Power(PowerEvent::ScreenOff) => {
                if self.state == TrackingState::Active {
                    self.pause();
                }
            }
            TrackerEvent::Power(PowerEvent::ScreenOn) => {
                if self.state == TrackingState::Paused {
                    self.resume();
                }
            }
            TrackerEvent::Position { epoch, position } => {
                if self.state == TrackingState::Active && epoch == self.epoch {
                    self.apply_fix(position);
                } else {
                    tracing::debug!(epoch, "dropping stale or out-of-state position fix");
                }
            }
            TrackerEvent::Activity { epoch, candidates } => {
                if self.state == TrackingState::Active && epoch == self.epoch {
                    self.apply_activity(&candidates);
                } else {
                    tracing::debug!(epoch, "dropping stale or out-of-state activity batch");
                }
            }
            TrackerEvent::Tick { at } => {
                if self.state == TrackingState::Active {
                    self.emit_summary(at);
                }
            }
            TrackerEvent::ProviderFailure => {
                // Leave the persisted record intact so the session
                // resumes on the next launch.
                tracing::warn!("provider connection failed, requesting host termination");
                self.unsubscribe_all();
                return Flow::Terminate;
            }
        }

        Flow::Continue
    }

    fn start_session(&mut self) {
        let anchor = self.positions.last_known();
        let session = Session {
            anchor,
            started_at: Utc::now(),
            distance_meters: 0.0,
            activity: ActivityKind::Unknown,
        };

        match anchor {
            Some(position) => {
                let persisted = PersistedSession {
                    anchor: position,
                    started_at: session.started_at,
                    activity: session.activity,
                };
                if let Err(e) = self.store.save(&persisted) {
                    tracing::warn!("could not persist session: {e}");
                }
            }
            None => {
                // No resumable record until the first fix establishes
                // the anchor; drop anything stale meanwhile.
                if let Err(e) = self.store.clear() {
                    tracing::warn!("could not clear session store: {e}");
                }
            }
        }

        self.accumulator = DistanceAccumulator::with_anchor(anchor);
        self.session = Some(session);
        self.set_state(TrackingState::Active);
        self.subscribe_all();
        tracing::info!("tracking started");
    }

    fn stop_session(&mut self) {
        self.unsubscribe_all();
        if let Err(e) = self.store.clear() {
            tracing::warn!("could not clear session store: {e}");
        }
        self.session = None;
        self.accumulator.reset();
        self.set_state(TrackingState::Idle);
        tracing::info!("tracking stopped");
    }

    fn pause(&mut self) {
        self.unsubscribe_all();
        self.set_state(TrackingState::Paused);
        tracing::info!("tracking paused");
    }

    fn resume(&mut self) {
        self.set_state(TrackingState::Active);
        self.subscribe_all();
        tracing::info!("tracking resumed");
    }

    fn subscribe_all(&mut self) {
        self.epoch += 1;
        self.positions.subscribe(self.epoch);
        self.activities.subscribe(self.epoch);
        self.ticker.start();
    }

    fn unsubscribe_all(&mut self) {
        self.positions.unsubscribe();
        self.activities.unsubscribe();
        self.ticker.stop();
    }

    fn apply_fix(&mut self, position: Position) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.anchor.is_none() {
            // First fix of an anchor-less session: becomes the de-facto
            // anchor and makes the session resumable.
            session.anchor = Some(position);
            let persisted = PersistedSession {
                anchor: position,
                started_at: session.started_at,
                activity: session.activity,
            };
            if let Err(e) = self.store.save(&persisted) {
                tracing::warn!("could not persist session: {e}");
            }
        }

        let increment = self.accumulator.update(position);
        session.distance_meters += increment;
    }

    fn apply_activity(&mut self, candidates: &[ActivityCandidate]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let label = classify::resolve(candidates);
        if label != session.activity {
            session.activity = label;
            if let Err(e) = self.store.save_activity(label) {
                tracing::warn!("could not persist activity: {e}");
            }
        }
    }

    fn emit_summary(&mut self, at: DateTime<Utc>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let summary = Summary::compute(
            session.started_at,
            at,
            session.distance_meters,
            session.activity,
        );
        for observer in &mut self.observers {
            observer.summary(&summary);
        }
    }

    fn set_state(&mut self, state: TrackingState) {
        self.state = state;
        self.handle.set(state);
    }
}
