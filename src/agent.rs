//! The agent runtime: one ordered event queue, one worker.
//!
//! Every external source (ticker, position fixes, activity batches,
//! power gate, user commands) pushes onto a single crossbeam channel;
//! the loop drains it and applies events to the state machine one at a
//! time, in arrival order. Persistence happens synchronously on this
//! worker, so no other locking is needed.

use crate::core::tracker::{Flow, TrackerEvent, TrackingStateMachine};
use crate::provider::Ticker;
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Why the event loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The shutdown flag was raised (Ctrl+C or host stop).
    Shutdown,
    /// The state machine asked the host to terminate.
    Terminated,
    /// All event senders disconnected.
    Disconnected,
}

/// Periodic tick source backed by a thread.
///
/// Cancellable: `stop` joins the thread, so no tick outlives a pause or
/// stop. At most one tick is ever in flight; if the worker has not yet
/// drained the previous one, the interval is skipped instead of queuing
/// a duplicate.
pub struct ThreadTicker {
    interval: Duration,
    events: Sender<TrackerEvent>,
    pending: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTicker {
    pub fn new(
        interval: Duration,
        events: Sender<TrackerEvent>,
        pending: Arc<AtomicBool>,
    ) -> Self {
        Self {
            interval,
            events,
            pending,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl Ticker for ThreadTicker {
    fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        // Fresh flag per generation so a stopping thread can never race
        // a restarted one.
        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();

        let interval = self.interval;
        let events = self.events.clone();
        let pending = self.pending.clone();

        self.handle = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                // Collapse rapid duplicates: skip if the previous tick
                // has not been drained yet.
                if pending
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    continue;
                }

                if events.send(TrackerEvent::Tick { at: Utc::now() }).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drains the tracker queue and applies events to the machine.
pub struct EventLoop {
    receiver: Receiver<TrackerEvent>,
    tick_pending: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl EventLoop {
    pub fn new(
        receiver: Receiver<TrackerEvent>,
        tick_pending: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            receiver,
            tick_pending,
            shutdown,
        }
    }

    /// Run until shutdown, termination, or sender disconnect.
    pub fn run(&self, machine: &mut TrackingStateMachine) -> ExitReason {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if matches!(event, TrackerEvent::Tick { .. }) {
                        self.tick_pending.store(false, Ordering::SeqCst);
                    }

                    if machine.handle(event) == Flow::Terminate {
                        return ExitReason::Terminated;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    tracing::warn!("all event sources disconnected");
                    return ExitReason::Disconnected;
                }
            }
        }

        ExitReason::Shutdown
    }
}
