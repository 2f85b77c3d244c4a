//! Integration tests for the session lifecycle and the restart-resume
//! protocol, driven against a real on-disk store.

use speed_tracker_agent::core::{
    ActivityCandidate, ActivityKind, Position, PowerEvent, Summary, SummaryObserver, TrackerEvent,
    TrackingState, TrackingStateMachine, UserCommand,
};
use speed_tracker_agent::provider::{ActivityProvider, PositionProvider, Ticker};
use speed_tracker_agent::store::SessionStore;
use chrono::Duration;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct EpochProbe(Arc<AtomicU64>);

impl EpochProbe {
    fn last(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

struct TestPositions {
    last: Arc<Mutex<Option<Position>>>,
    probe: EpochProbe,
}

impl PositionProvider for TestPositions {
    fn last_known(&self) -> Option<Position> {
        *self.last.lock().unwrap()
    }

    fn subscribe(&mut self, epoch: u64) {
        self.probe.0.store(epoch, Ordering::SeqCst);
    }

    fn unsubscribe(&mut self) {}
}

struct TestActivities {
    probe: EpochProbe,
}

impl ActivityProvider for TestActivities {
    fn subscribe(&mut self, epoch: u64) {
        self.probe.0.store(epoch, Ordering::SeqCst);
    }

    fn unsubscribe(&mut self) {}
}

struct TestTicker;

impl Ticker for TestTicker {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}

struct CollectingObserver {
    summaries: Arc<Mutex<Vec<Summary>>>,
}

impl SummaryObserver for CollectingObserver {
    fn summary(&mut self, summary: &Summary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }
}

struct Harness {
    machine: TrackingStateMachine,
    positions: EpochProbe,
    activities: EpochProbe,
    last_known: Arc<Mutex<Option<Position>>>,
    summaries: Arc<Mutex<Vec<Summary>>>,
}

fn store_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "speed-tracker-lifecycle-{}-{}",
        name,
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("session.json")
}

/// Build a machine against the named store. `last_known` feeds the
/// position provider's cached fix.
fn harness(path: PathBuf, last_known: Option<Position>) -> Harness {
    let positions = EpochProbe::default();
    let activities = EpochProbe::default();
    let last_known = Arc::new(Mutex::new(last_known));
    let summaries = Arc::new(Mutex::new(Vec::new()));

    let mut machine = TrackingStateMachine::new(
        SessionStore::new(path),
        Box::new(TestPositions {
            last: last_known.clone(),
            probe: positions.clone(),
        }),
        Box::new(TestActivities {
            probe: activities.clone(),
        }),
        Box::new(TestTicker),
    );
    machine.add_observer(Box::new(CollectingObserver {
        summaries: summaries.clone(),
    }));

    Harness {
        machine,
        positions,
        activities,
        last_known,
        summaries,
    }
}

fn fresh_store(name: &str) -> PathBuf {
    let path = store_path(name);
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn test_full_lifecycle() {
    let path = fresh_store("full");
    let start_fix = Position::now(0.0, 0.0);
    let mut h = harness(path.clone(), Some(start_fix));

    // Start: active session, zero distance, unknown activity.
    h.machine.handle(TrackerEvent::Command(UserCommand::Start));
    assert_eq!(h.machine.state(), TrackingState::Active);
    let started_at = h.machine.session().unwrap().started_at;

    // Walk ~1.11 km east along the equator.
    let epoch = h.positions.last();
    h.machine.handle(TrackerEvent::Position {
        epoch,
        position: Position::now(0.0, 0.01),
    });

    // The provider settles on running.
    h.machine.handle(TrackerEvent::Activity {
        epoch: h.activities.last(),
        candidates: vec![
            ActivityCandidate::new(ActivityKind::OnFoot, 85),
            ActivityCandidate::new(ActivityKind::Walking, 40),
            ActivityCandidate::new(ActivityKind::Running, 70),
        ],
    });

    // One minute in, the tick reports the fused summary.
    h.machine.handle(TrackerEvent::Tick {
        at: started_at + Duration::seconds(60),
    });
    {
        let summaries = h.summaries.lock().unwrap();
        let summary = summaries.last().unwrap();
        assert!((summary.distance_meters as f64 - 1112.0).abs() < 5.0);
        assert_eq!(summary.elapsed_minutes, 1);
        assert!((summary.speed_kmh - 66.7).abs() < 0.5);
        assert_eq!(summary.activity, ActivityKind::Running);
    }

    // Screen off pauses; ticks stay silent.
    h.machine.handle(TrackerEvent::Power(PowerEvent::ScreenOff));
    assert_eq!(h.machine.state(), TrackingState::Paused);
    let emitted_before = h.summaries.lock().unwrap().len();
    h.machine.handle(TrackerEvent::Tick {
        at: started_at + Duration::seconds(90),
    });
    assert_eq!(h.summaries.lock().unwrap().len(), emitted_before);

    // Screen on resumes with a fresh subscription epoch.
    h.machine.handle(TrackerEvent::Power(PowerEvent::ScreenOn));
    assert_eq!(h.machine.state(), TrackingState::Active);
    assert!(h.positions.last() > epoch);

    // Stop destroys the session and the persisted record.
    h.machine.handle(TrackerEvent::Command(UserCommand::Stop));
    assert_eq!(h.machine.state(), TrackingState::Idle);
    assert!(h.machine.session().is_none());
    assert!(SessionStore::new(path).load().is_none());
}

#[test]
fn test_restart_resumes_session() {
    let path = fresh_store("restart");
    let anchor = Position::now(52.520008, 13.404954);

    {
        let mut h = harness(path.clone(), Some(anchor));
        h.machine.handle(TrackerEvent::Command(UserCommand::Start));
        h.machine.handle(TrackerEvent::Activity {
            epoch: h.activities.last(),
            candidates: vec![ActivityCandidate::new(ActivityKind::OnBicycle, 95)],
        });
        // Process dies: no stop command, record stays on disk.
    }

    let mut h = harness(path, Some(anchor));
    h.machine.restore();

    assert_eq!(h.machine.state(), TrackingState::Active);
    let session = h.machine.session().unwrap();
    assert_eq!(session.activity, ActivityKind::OnBicycle);
    let restored_anchor = session.anchor.unwrap();
    assert_eq!(restored_anchor.latitude.to_bits(), anchor.latitude.to_bits());
    assert_eq!(restored_anchor.longitude.to_bits(), anchor.longitude.to_bits());
    // Distance does not survive the restart.
    assert_eq!(session.distance_meters, 0.0);
}

#[test]
fn test_restore_applies_current_last_known_fix() {
    let path = fresh_store("restore-fix");
    let anchor = Position::now(0.0, 0.0);

    {
        let mut h = harness(path.clone(), Some(anchor));
        h.machine.handle(TrackerEvent::Command(UserCommand::Start));
    }

    // By the time the agent relaunches the device has moved.
    let mut h = harness(path, Some(Position::now(0.0, 0.01)));
    h.machine.restore();

    let session = h.machine.session().unwrap();
    assert!((session.distance_meters - 1112.0).abs() < 5.0);
}

#[test]
fn test_stale_fix_after_restart_is_ignored() {
    let path = fresh_store("stale");
    let anchor = Position::now(0.0, 0.0);
    let mut h = harness(path, Some(anchor));

    h.machine.handle(TrackerEvent::Command(UserCommand::Start));
    let old_epoch = h.positions.last();
    h.machine.handle(TrackerEvent::Command(UserCommand::Stop));
    h.machine.handle(TrackerEvent::Command(UserCommand::Start));

    // Late delivery from the torn-down subscription.
    h.machine.handle(TrackerEvent::Position {
        epoch: old_epoch,
        position: Position::now(45.0, 45.0),
    });

    assert_eq!(h.machine.session().unwrap().distance_meters, 0.0);
}

#[test]
fn test_anchorless_start_becomes_resumable_on_first_fix() {
    let path = fresh_store("anchorless");
    let mut h = harness(path.clone(), None);

    h.machine.handle(TrackerEvent::Command(UserCommand::Start));
    // Nothing resumable yet: no anchor has been recorded.
    assert!(SessionStore::new(path.clone()).load().is_none());

    *h.last_known.lock().unwrap() = Some(Position::now(10.0, 10.0));
    h.machine.handle(TrackerEvent::Position {
        epoch: h.positions.last(),
        position: Position::now(10.0, 10.0),
    });

    let persisted = SessionStore::new(path).load().expect("record should exist");
    assert_eq!(persisted.anchor.latitude, 10.0);
}
