//! Simulated sensing providers.
//!
//! Thread-backed stand-ins for the real location, activity, and power
//! sources, so the binary and integration scenarios exercise the full
//! pipeline without hardware. The position provider walks a straight
//! line at constant speed; the activity provider answers the recurring
//! request with a canned batch rotation; the power source can cycle the
//! screen to demonstrate pause/resume.

use crate::core::distance::EARTH_RADIUS_METERS;
use crate::core::tracker::TrackerEvent;
use crate::core::types::{ActivityCandidate, ActivityKind, Position, PowerEvent};
use crate::power::PowerStateGate;
use crate::provider::{ActivityProvider, PositionProvider, PowerSource};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Motion parameters for the simulated walker.
#[derive(Debug, Clone)]
pub struct SimWalkConfig {
    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Ground speed in meters per second
    pub speed_mps: f64,
    /// Heading in degrees clockwise from north
    pub bearing_deg: f64,
    /// Interval between fixes
    pub fix_interval: Duration,
}

impl Default for SimWalkConfig {
    fn default() -> Self {
        Self {
            start_latitude: 52.5200,
            start_longitude: 13.4050,
            speed_mps: 1.4, // walking pace
            bearing_deg: 90.0,
            fix_interval: Duration::from_secs(5),
        }
    }
}

struct SubscriptionState {
    subscribed: AtomicBool,
    epoch: AtomicU64,
    running: AtomicBool,
}

impl SubscriptionState {
    fn new() -> Self {
        Self {
            subscribed: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Simulated position-fix provider.
///
/// The walker thread runs for the provider's whole lifetime so
/// `last_known` keeps advancing like a real location service; fixes are
/// only delivered to the queue while subscribed.
pub struct SimPositionProvider {
    state: Arc<SubscriptionState>,
    last: Arc<Mutex<Option<Position>>>,
    handle: Option<JoinHandle<()>>,
}

impl SimPositionProvider {
    pub fn spawn(config: SimWalkConfig, events: Sender<TrackerEvent>) -> Self {
        let state = Arc::new(SubscriptionState::new());
        let last = Arc::new(Mutex::new(None));

        let thread_state = state.clone();
        let thread_last = last.clone();
        let handle = thread::spawn(move || {
            let dt = config.fix_interval.as_secs_f64();
            let bearing = config.bearing_deg.to_radians();
            let step_north = config.speed_mps * dt * bearing.cos();
            let step_east = config.speed_mps * dt * bearing.sin();

            let mut latitude = config.start_latitude;
            let mut longitude = config.start_longitude;

            while thread_state.running.load(Ordering::SeqCst) {
                thread::sleep(config.fix_interval);
                if !thread_state.running.load(Ordering::SeqCst) {
                    break;
                }

                latitude += (step_north / EARTH_RADIUS_METERS).to_degrees();
                longitude +=
                    (step_east / (EARTH_RADIUS_METERS * latitude.to_radians().cos())).to_degrees();

                let position = Position::now(latitude, longitude);
                *thread_last.lock().unwrap() = Some(position);

                if thread_state.subscribed.load(Ordering::SeqCst) {
                    let event = TrackerEvent::Position {
                        epoch: thread_state.epoch.load(Ordering::SeqCst),
                        position,
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            state,
            last,
            handle: Some(handle),
        }
    }
}

impl PositionProvider for SimPositionProvider {
    fn last_known(&self) -> Option<Position> {
        *self.last.lock().unwrap()
    }

    fn subscribe(&mut self, epoch: u64) {
        self.state.epoch.store(epoch, Ordering::SeqCst);
        self.state.subscribed.store(true, Ordering::SeqCst);
    }

    fn unsubscribe(&mut self) {
        self.state.subscribed.store(false, Ordering::SeqCst);
    }
}

impl Drop for SimPositionProvider {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Simulated activity provider answering the recurring classification
/// request with a rotation of plausible batches.
pub struct SimActivityProvider {
    state: Arc<SubscriptionState>,
    handle: Option<JoinHandle<()>>,
}

impl SimActivityProvider {
    pub fn spawn(interval: Duration, events: Sender<TrackerEvent>) -> Self {
        let state = Arc::new(SubscriptionState::new());

        let thread_state = state.clone();
        let handle = thread::spawn(move || {
            let mut step = 0usize;
            while thread_state.running.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if !thread_state.running.load(Ordering::SeqCst) {
                    break;
                }

                if thread_state.subscribed.load(Ordering::SeqCst) {
                    let event = TrackerEvent::Activity {
                        epoch: thread_state.epoch.load(Ordering::SeqCst),
                        candidates: batch_for(step),
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                    step = step.wrapping_add(1);
                }
            }
        });

        Self {
            state,
            handle: Some(handle),
        }
    }
}

/// Canned candidate batches, rotated per request.
fn batch_for(step: usize) -> Vec<ActivityCandidate> {
    match step % 4 {
        0 => vec![
            ActivityCandidate::new(ActivityKind::OnFoot, 72),
            ActivityCandidate::new(ActivityKind::Walking, 58),
            ActivityCandidate::new(ActivityKind::Running, 21),
        ],
        1 => vec![
            ActivityCandidate::new(ActivityKind::OnFoot, 68),
            ActivityCandidate::new(ActivityKind::Walking, 44),
            ActivityCandidate::new(ActivityKind::Running, 61),
        ],
        2 => vec![
            ActivityCandidate::new(ActivityKind::Still, 55),
            ActivityCandidate::new(ActivityKind::OnFoot, 30),
        ],
        _ => vec![
            ActivityCandidate::new(ActivityKind::OnFoot, 80),
            ActivityCandidate::new(ActivityKind::Walking, 75),
            ActivityCandidate::new(ActivityKind::Running, 12),
        ],
    }
}

impl ActivityProvider for SimActivityProvider {
    fn subscribe(&mut self, epoch: u64) {
        self.state.epoch.store(epoch, Ordering::SeqCst);
        self.state.subscribed.store(true, Ordering::SeqCst);
    }

    fn unsubscribe(&mut self) {
        self.state.subscribed.store(false, Ordering::SeqCst);
    }
}

impl Drop for SimActivityProvider {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Simulated power-state source that alternates screen-off and
/// screen-on with the given period.
pub struct SimPowerSource {
    cycle: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimPowerSource {
    pub fn new(cycle: Duration) -> Self {
        Self {
            cycle,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl PowerSource for SimPowerSource {
    fn subscribe(&mut self, gate: PowerStateGate) {
        if self.handle.is_some() {
            return;
        }

        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();
        let cycle = self.cycle;

        self.handle = Some(thread::spawn(move || {
            let mut screen_on = true;
            while running.load(Ordering::SeqCst) {
                thread::sleep(cycle);
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                screen_on = !screen_on;
                gate.on_power_event(if screen_on {
                    PowerEvent::ScreenOn
                } else {
                    PowerEvent::ScreenOff
                });
            }
        }));
    }

    fn unsubscribe(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SimPowerSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_walker_emits_fixes_while_subscribed() {
        let (sender, receiver) = unbounded();
        let config = SimWalkConfig {
            fix_interval: Duration::from_millis(10),
            ..SimWalkConfig::default()
        };
        let mut provider = SimPositionProvider::spawn(config, sender);

        provider.subscribe(3);
        let event = receiver
            .recv_timeout(Duration::from_secs(2))
            .expect("no fix delivered");
        match event {
            TrackerEvent::Position { epoch, .. } => assert_eq!(epoch, 3),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(provider.last_known().is_some());

        provider.unsubscribe();
    }

    #[test]
    fn test_walker_moves_east() {
        let (sender, receiver) = unbounded();
        let config = SimWalkConfig {
            start_latitude: 0.0,
            start_longitude: 0.0,
            speed_mps: 10.0,
            bearing_deg: 90.0,
            fix_interval: Duration::from_millis(10),
        };
        let mut provider = SimPositionProvider::spawn(config, sender);
        provider.subscribe(1);

        let mut last = None;
        for _ in 0..3 {
            if let Ok(TrackerEvent::Position { position, .. }) =
                receiver.recv_timeout(Duration::from_secs(2))
            {
                last = Some(position);
            }
        }

        let position = last.expect("no fixes delivered");
        assert!(position.longitude > 0.0);
        assert!(position.latitude.abs() < 1e-9);
    }

    #[test]
    fn test_activity_batches_resolve_to_known_labels() {
        for step in 0..8 {
            let label = crate::core::classify::resolve(&batch_for(step));
            assert_ne!(label, ActivityKind::Tilting);
        }
        // The rotation covers walking, running, and still.
        assert_eq!(
            crate::core::classify::resolve(&batch_for(0)),
            ActivityKind::Walking
        );
        assert_eq!(
            crate::core::classify::resolve(&batch_for(1)),
            ActivityKind::Running
        );
        assert_eq!(
            crate::core::classify::resolve(&batch_for(2)),
            ActivityKind::Still
        );
    }
}
