//! leap-pointer: drive the desktop pointer with hand-tracking gestures.
//!
//! Reads tracking frames as JSON lines from stdin (or `--input`) and writes
//! pointer commands as s-expressions to stdout for a platform helper.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use leap_pointer::focus::{CommandProbe, FocusGate};
use leap_pointer::pointer::{Actuator, LogActuator, PointerDevice, SexpActuator};
use leap_pointer::source::FrameFeed;
use leap_pointer::{Config, Engine};

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser, Debug)]
#[command(
    name = "leap-pointer",
    about = "Hand-tracking gesture control for the desktop pointer"
)]
struct Cli {
    /// Frame stream to read (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Log pointer actions instead of emitting commands
    #[arg(long)]
    dry_run: bool,

    /// Cursor sensitivity around the range center [default: 1.5]
    #[arg(long, short = 's')]
    sensitivity: Option<f32>,

    /// Cursor smoothing factor, 0 = none [default: 0.3]
    #[arg(long, short = 'm')]
    smoothing: Option<f32>,

    /// Pinch strength that engages a click [default: 0.7]
    #[arg(long)]
    pinch_engage: Option<f32>,

    /// Pinch strength below which a click releases [default: 0.3]
    #[arg(long)]
    pinch_release: Option<f32>,

    /// Pinch strength smoothing factor [default: 0.5]
    #[arg(long)]
    pinch_smoothing: Option<f32>,

    /// Grab strength classified as a fist [default: 0.9]
    #[arg(long)]
    fist_threshold: Option<f32>,

    /// Grab strength below which a hand is open [default: 0.3]
    #[arg(long)]
    open_threshold: Option<f32>,

    /// Pinch strength classified as a pinch pose [default: 0.7]
    #[arg(long)]
    pinch_threshold: Option<f32>,

    /// Seconds a pinch must be held to start a drag [default: 0.15]
    #[arg(long)]
    drag_delay: Option<f64>,

    /// Seconds both fists must be held to exit [default: 2.0]
    #[arg(long)]
    exit_hold_time: Option<f64>,

    /// Maximum seconds between clicks of a double-click [default: 0.4]
    #[arg(long)]
    double_click_window: Option<f64>,

    /// Scroll ticks per millimetre of vertical motion [default: 0.5]
    #[arg(long)]
    scroll_sensitivity: Option<f32>,

    /// Scroll ticks per millimetre of palm distance change [default: 0.2]
    #[arg(long)]
    zoom_sensitivity: Option<f32>,

    /// Sensor x range in mm as MIN,MAX [default: -150,150]
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    leap_x_range: Option<(f32, f32)>,

    /// Sensor y range in mm as MIN,MAX [default: 100,350]
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    leap_y_range: Option<(f32, f32)>,

    /// Screen width in pixels [default: 1920]
    #[arg(long)]
    screen_width: Option<u32>,

    /// Screen height in pixels [default: 1080]
    #[arg(long)]
    screen_height: Option<u32>,

    /// Only act while this application is frontmost
    #[arg(long)]
    target_window: Option<String>,

    /// Shell command printing the frontmost application name
    #[arg(long)]
    focus_command: Option<String>,

    /// Focus poll period in milliseconds
    #[arg(long, default_value_t = 100)]
    focus_poll_ms: u64,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

impl Cli {
    /// Defaults overridden by whatever was given on the command line.
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            sensitivity: self.sensitivity.unwrap_or(defaults.sensitivity),
            smoothing: self.smoothing.unwrap_or(defaults.smoothing),
            pinch_engage: self.pinch_engage.unwrap_or(defaults.pinch_engage),
            pinch_release: self.pinch_release.unwrap_or(defaults.pinch_release),
            pinch_smoothing: self.pinch_smoothing.unwrap_or(defaults.pinch_smoothing),
            fist_threshold: self.fist_threshold.unwrap_or(defaults.fist_threshold),
            open_threshold: self.open_threshold.unwrap_or(defaults.open_threshold),
            pinch_threshold: self.pinch_threshold.unwrap_or(defaults.pinch_threshold),
            drag_delay: self.drag_delay.unwrap_or(defaults.drag_delay),
            exit_hold_time: self.exit_hold_time.unwrap_or(defaults.exit_hold_time),
            double_click_window: self.double_click_window.unwrap_or(defaults.double_click_window),
            scroll_sensitivity: self.scroll_sensitivity.unwrap_or(defaults.scroll_sensitivity),
            zoom_sensitivity: self.zoom_sensitivity.unwrap_or(defaults.zoom_sensitivity),
            leap_x_range: self.leap_x_range.unwrap_or(defaults.leap_x_range),
            leap_y_range: self.leap_y_range.unwrap_or(defaults.leap_y_range),
            screen_width: self.screen_width.unwrap_or(defaults.screen_width),
            screen_height: self.screen_height.unwrap_or(defaults.screen_height),
            target_window: self.target_window.clone(),
        }
    }
}

/// Parse `MIN,MAX`.
fn parse_range(s: &str) -> Result<(f32, f32), String> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid bound {v:?}: {e}"))
    };
    Ok((parse(min)?, parse(max)?))
}

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("leap-pointer {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // stdout carries the command stream; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leap_pointer=info".into()),
        )
        .init();

    let config = cli.config();
    config.validate().context("invalid configuration")?;

    info!("leap-pointer v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "screen {}x{}, sensitivity {}, smoothing {}",
        config.screen_width, config.screen_height, config.sensitivity, config.smoothing
    );
    info!(
        "pinch engage {} / release {}, drag delay {}s, double-click window {}s",
        config.pinch_engage, config.pinch_release, config.drag_delay, config.double_click_window
    );
    info!(
        "gestures: right hand = cursor, pinch = click/drag, left fist + right open = scroll, \
         both open = pan, both pinch = zoom, both fists for {}s = exit",
        config.exit_hold_time
    );

    let input: Box<dyn BufRead + Send> = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open frame stream {}", path.display()))?;
            info!("reading frames from {}", path.display());
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let actuator: Arc<dyn Actuator> = if cli.dry_run {
        info!("dry run: pointer actions are logged only");
        Arc::new(LogActuator)
    } else {
        Arc::new(SexpActuator::new(io::stdout()))
    };
    let pointer = Arc::new(PointerDevice::new(actuator));
    let mut engine = Engine::new(config.clone(), pointer.clone())?;

    let mut gate = match &config.target_window {
        Some(target) => {
            let probe = cli
                .focus_command
                .clone()
                .map(CommandProbe::new)
                .unwrap_or_else(CommandProbe::platform_default);
            info!("focus gate: {} (via `{}`)", target, probe.command);
            let gate = FocusGate::spawn(
                Box::new(probe),
                target.clone(),
                Duration::from_millis(cli.focus_poll_ms),
                pointer.clone(),
            )
            .context("failed to start focus poller")?;
            engine = engine.with_focus(gate.flag());
            Some(gate)
        }
        None => None,
    };

    install_signal_handlers();

    let feed = FrameFeed::spawn(input).context("failed to start frame reader")?;
    let result = engine.run(&feed, &SHUTDOWN_REQUESTED);

    // Held buttons are released on every exit path.
    engine.shutdown();
    if let Some(gate) = gate.as_mut() {
        gate.stop();
    }

    result.context("tracking source failed")?;
    Ok(())
}
