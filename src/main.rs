//! Speed Tracker Agent CLI
//!
//! Background tracker fusing position fixes, activity classification,
//! and screen power events into a live session summary.

use chrono::Utc;
use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use speed_tracker_agent::{
    agent::{EventLoop, ExitReason, ThreadTicker},
    config::Config,
    core::{Summary, SummaryObserver, TrackerEvent, TrackingStateMachine, UserCommand},
    power::PowerStateGate,
    provider::{PowerSource, SimActivityProvider, SimPositionProvider, SimPowerSource, SimWalkConfig},
    store::SessionStore,
    VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "speed-tracker")]
#[command(version = VERSION)]
#[command(about = "Background speed and distance tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking (resumes a persisted session if one exists)
    Start {
        /// Simulated walker speed in m/s
        #[arg(long, default_value = "1.4")]
        speed: f64,

        /// Simulated walker heading in degrees clockwise from north
        #[arg(long, default_value = "90.0")]
        bearing: f64,

        /// Simulated start latitude
        #[arg(long, default_value = "52.5200")]
        lat: f64,

        /// Simulated start longitude
        #[arg(long, default_value = "13.4050")]
        lon: f64,

        /// Cycle the simulated screen off/on every N seconds to
        /// exercise pause/resume
        #[arg(long)]
        power_cycle: Option<u64>,
    },

    /// Show whether a resumable session is persisted
    Status,

    /// Clear the persisted session
    Reset,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            speed,
            bearing,
            lat,
            lon,
            power_cycle,
        } => cmd_start(speed, bearing, lat, lon, power_cycle),
        Commands::Status => cmd_status(),
        Commands::Reset => cmd_reset(),
        Commands::Config => cmd_config(),
    }
}

/// Prints the per-tick summary line to the console.
struct ConsoleObserver;

impl SummaryObserver for ConsoleObserver {
    fn summary(&mut self, summary: &Summary) {
        println!("[{}] {}", Utc::now().format("%H:%M:%S"), summary);
    }
}

fn cmd_start(speed: f64, bearing: f64, lat: f64, lon: f64, power_cycle: Option<u64>) {
    init_tracing();

    println!("Speed Tracker Agent v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Starting tracker...");
    println!("  Tick interval: {}s", config.tick_interval.as_secs());
    println!("  Fix interval: {}s", config.fix_interval.as_secs());
    println!("  Walker: {speed} m/s, bearing {bearing}° from ({lat}, {lon})");
    match power_cycle {
        Some(secs) => println!("  Power cycling: every {secs}s"),
        None => println!("  Power cycling: disabled"),
    }
    println!();
    println!("Press Ctrl+C to stop (the session survives a restart)");
    println!();

    // One ordered queue; every source pushes, one worker drains.
    let (sender, receiver) = unbounded();
    let tick_pending = Arc::new(AtomicBool::new(false));

    let walk = SimWalkConfig {
        start_latitude: lat,
        start_longitude: lon,
        speed_mps: speed,
        bearing_deg: bearing,
        fix_interval: config.fix_interval,
    };
    let positions = SimPositionProvider::spawn(walk, sender.clone());
    let activities = SimActivityProvider::spawn(config.activity_interval, sender.clone());
    let ticker = ThreadTicker::new(config.tick_interval, sender.clone(), tick_pending.clone());

    let store = SessionStore::new(config.session_store_path());
    let mut machine = TrackingStateMachine::new(
        store,
        Box::new(positions),
        Box::new(activities),
        Box::new(ticker),
    );
    machine.add_observer(Box::new(ConsoleObserver));

    // Screen power events flow through the gate, which drops them
    // while no session exists.
    let gate = PowerStateGate::new(sender.clone(), machine.state_handle());
    let mut power_source = power_cycle.map(|secs| {
        let mut source = SimPowerSource::new(Duration::from_secs(secs));
        source.subscribe(gate.clone());
        source
    });

    // Set up Ctrl+C handler
    let shutdown = Arc::new(AtomicBool::new(false));
    ctrlc_handler(shutdown.clone());

    // Resume a persisted session, otherwise this launch is the start
    // command.
    machine.restore();
    if !machine.state_handle().has_session() {
        let _ = sender.send(TrackerEvent::Command(UserCommand::Start));
    } else {
        println!("Resumed a persisted session.");
    }

    let event_loop = EventLoop::new(receiver, tick_pending, shutdown);
    let reason = event_loop.run(&mut machine);

    if let Some(ref mut source) = power_source {
        source.unsubscribe();
    }

    println!();
    match reason {
        ExitReason::Shutdown => {
            println!("Stopping agent.");
            if machine.state_handle().has_session() {
                println!("Session persisted; run `speed-tracker start` to resume.");
            }
        }
        ExitReason::Terminated => println!("Agent terminated."),
        ExitReason::Disconnected => eprintln!("Event sources disconnected unexpectedly."),
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();
    let store = SessionStore::new(config.session_store_path());

    println!("Speed Tracker Agent Status");
    println!("==========================");
    println!();

    match store.load() {
        Some(session) => {
            println!("Resumable session:");
            println!(
                "  Anchor: ({:.6}, {:.6})",
                session.anchor.latitude, session.anchor.longitude
            );
            println!("  Started: {}", session.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  Activity: {}", session.activity);
            println!();
            println!("Run `speed-tracker start` to resume it.");
        }
        None => {
            println!("No resumable session.");
        }
    }
}

fn cmd_reset() {
    let config = Config::load().unwrap_or_default();
    let store = SessionStore::new(config.session_store_path());

    match store.clear() {
        Ok(()) => println!("Persisted session cleared."),
        Err(e) => {
            eprintln!("Error clearing session: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(shutdown: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("speed_tracker_agent=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
