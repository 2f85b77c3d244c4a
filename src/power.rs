//! Power-state gate.
//!
//! Translates screen power transitions into pause/resume events on the
//! tracker queue. Events arriving while no session exists are dropped;
//! the gate holds no state of its own beyond the queue sender and the
//! shared state handle.

use crate::core::tracker::{StateHandle, TrackerEvent};
use crate::core::types::PowerEvent;
use crossbeam_channel::Sender;

#[derive(Clone)]
pub struct PowerStateGate {
    events: Sender<TrackerEvent>,
    state: StateHandle,
}

impl PowerStateGate {
    pub fn new(events: Sender<TrackerEvent>, state: StateHandle) -> Self {
        Self { events, state }
    }

    /// Forward a power transition to the tracker, unless idle.
    pub fn on_power_event(&self, event: PowerEvent) {
        if !self.state.has_session() {
            tracing::debug!(?event, "no session, dropping power event");
            return;
        }

        let _ = self.events.send(TrackerEvent::Power(event));
    }
}
