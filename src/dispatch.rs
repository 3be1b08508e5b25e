//! Frame dispatcher: the engine's single entry point per tracking frame.
//!
//! Order of work for each frame:
//! 1. focus gate (consume a pending focus-loss reset, skip while inactive)
//! 2. hands-lost check (release everything, back to cursor)
//! 3. per-hand loss (hard-reset that hand's pinch machine)
//! 4. mode arbitration (release and reset on every real transition)
//! 5. the active mode's handler
//!
//! All state here is owned by the frame path.  The only datum shared with
//! another thread is the focus flag and the held-button set inside
//! [`PointerDevice`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::focus::FocusFlag;
use crate::gesture::modes::ModeContext;
use crate::gesture::{
    classify, select_mode, ClickConfig, CoordinateMapper, Frame, Hand, Mode, ModeKind,
    ModeOutcome, PerHand, PoseThresholds, StickyClick,
};
use crate::pointer::{Button, PointerDevice};
use crate::source::{Feed, FrameFeed};

/// Seconds of frame time between status lines.
const STATUS_INTERVAL_S: f64 = 60.0;

/// Longest wait for a frame before the shutdown flag is checked again.
pub const FEED_TICK: Duration = Duration::from_millis(100);

/// Why [`Engine::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    EndOfStream,
    Shutdown,
    ExitGesture,
}

/// Gesture engine state for one session.
pub struct Engine {
    config: Config,
    mapper: CoordinateMapper,
    thresholds: PoseThresholds,
    pointer: Arc<PointerDevice>,
    /// Present when a target window is configured.
    focus: Option<Arc<FocusFlag>>,
    mode: Mode,
    clicks: PerHand<StickyClick>,
    frames: u64,
    last_status_s: Option<f64>,
}

impl Engine {
    /// Validate `config` and build an engine in cursor mode.
    pub fn new(config: Config, pointer: Arc<PointerDevice>) -> Result<Self> {
        config.validate()?;
        let click = ClickConfig::from_config(&config);
        Ok(Self {
            mapper: CoordinateMapper::from_config(&config),
            thresholds: PoseThresholds::from_config(&config),
            clicks: PerHand::new(
                StickyClick::new(Hand::Left, click.clone()),
                StickyClick::new(Hand::Right, click),
            ),
            config,
            pointer,
            focus: None,
            mode: Mode::default(),
            frames: 0,
            last_status_s: None,
        })
    }

    /// Gate frame processing on a focus flag.
    pub fn with_focus(mut self, flag: Arc<FocusFlag>) -> Self {
        self.focus = Some(flag);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pointer(&self) -> &Arc<PointerDevice> {
        &self.pointer
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn click_machine(&self, hand: Hand) -> &StickyClick {
        self.clicks.get(hand)
    }

    /// Frames processed so far, including gated ones.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Process one tracking frame.
    pub fn process(&mut self, frame: &Frame) -> ModeOutcome {
        self.frames += 1;
        self.maybe_log_status(frame.timestamp_s);

        if let Some(flag) = self.focus.clone() {
            if flag.take_reset_request() {
                // A frame in flight when focus was lost may have pressed after
                // the poller released.
                self.pointer.release_all();
                self.reset("focus lost");
            }
            if !flag.is_active() {
                return ModeOutcome::Continue;
            }
        }

        if frame.is_empty() {
            if self.pointer.release_all() > 0 {
                info!("[Released] hands lost");
            }
            self.reset("hands lost");
            return ModeOutcome::Continue;
        }

        for hand in Hand::BOTH {
            if frame.hand(hand).is_none() && self.clicks.get_mut(hand).force_reset() {
                self.pointer.release(Button::Left);
                info!("[Drag cancelled] {} hand lost", hand.as_str());
            }
        }

        let left = frame.left.as_ref().map(|h| classify(h, &self.thresholds));
        let right = frame.right.as_ref().map(|h| classify(h, &self.thresholds));
        let current = self.mode.kind();
        let next = select_mode(current, left, right);
        if next != current {
            info!(
                "[Mode] {} -> {} (left {}, right {})",
                current.as_str(),
                next.as_str(),
                left.map_or("none", |p| p.as_str()),
                right.map_or("none", |p| p.as_str()),
            );
            self.pointer.release_all();
            self.reset_clicks();
            self.mode = Mode::enter(next);
        }

        let mut ctx = ModeContext {
            config: &self.config,
            mapper: &self.mapper,
            pointer: &self.pointer,
            clicks: &mut self.clicks,
        };
        self.mode.handle(frame, &mut ctx)
    }

    /// Feed frames until end of stream, `shutdown` is set, or the exit
    /// gesture completes.  `shutdown` is checked every [`FEED_TICK`] even
    /// while the stream is idle.
    pub fn run(&mut self, feed: &FrameFeed, shutdown: &AtomicBool) -> Result<RunExit> {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown signal received, exiting");
                return Ok(RunExit::Shutdown);
            }

            match feed.next(FEED_TICK)? {
                Feed::Frame(frame) => {
                    if self.process(&frame) == ModeOutcome::Exit {
                        info!("Exit gesture completed");
                        return Ok(RunExit::ExitGesture);
                    }
                }
                Feed::Idle => {}
                Feed::Ended => return Ok(RunExit::EndOfStream),
            }
        }
    }

    /// Mandatory cleanup before the process exits.  Returns the number of
    /// buttons released.
    pub fn shutdown(&mut self) -> usize {
        let released = self.pointer.release_all();
        self.reset_clicks();
        self.mode = Mode::default();
        info!(
            "Engine shut down after {} frames, released {} button(s)",
            self.frames, released
        );
        released
    }

    /// Engine status as an s-expression.
    pub fn status_sexp(&self) -> String {
        let focus = match &self.focus {
            None => ":ungated",
            Some(flag) if flag.is_active() => "t",
            Some(_) => "nil",
        };
        format!(
            "(:mode {} :held {} :focus {} :pinch {} :frames {})",
            self.mode.kind().as_str(),
            self.pointer.held_sexp(),
            focus,
            self.clicks.get(Hand::Right).state().as_str(),
            self.frames,
        )
    }

    /// Drop back to cursor mode with idle pinch machines.
    fn reset(&mut self, reason: &str) {
        self.reset_clicks();
        if self.mode.kind() != ModeKind::Cursor {
            debug!("{}: {} -> cursor", reason, self.mode.kind().as_str());
            self.mode = Mode::default();
        }
    }

    fn reset_clicks(&mut self) {
        for hand in Hand::BOTH {
            self.clicks.get_mut(hand).force_reset();
        }
    }

    fn maybe_log_status(&mut self, now_s: f64) {
        match self.last_status_s {
            None => self.last_status_s = Some(now_s),
            Some(last) if now_s - last >= STATUS_INTERVAL_S => {
                self.last_status_s = Some(now_s);
                info!("Status: {}", self.status_sexp());
            }
            Some(_) => {}
        }
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
use crate::gesture::HandSample;
#[cfg(test)]
use crate::error::{ConfigError, Error};
#[cfg(test)]
use crate::pointer::{Call, RecordingActuator};

#[cfg(test)]
fn make_engine() -> (Arc<RecordingActuator>, Engine) {
    let recorder = Arc::new(RecordingActuator::default());
    let pointer = Arc::new(PointerDevice::new(recorder.clone()));
    let config = Config {
        smoothing: 0.0,
        pinch_smoothing: 0.0,
        sensitivity: 1.0,
        ..Config::default()
    };
    let engine = match Engine::new(config, pointer) {
        Ok(engine) => engine,
        Err(e) => panic!("default test config rejected: {}", e),
    };
    (recorder, engine)
}

/// Hand at the center of the default ranges.
#[cfg(test)]
fn make_hand(grab: f32, pinch: f32) -> HandSample {
    HandSample::new([0.0, 225.0, 0.0], grab, pinch)
}

#[cfg(test)]
fn make_frame(t: f64, left: Option<HandSample>, right: Option<HandSample>) -> Frame {
    Frame {
        timestamp_s: t,
        left,
        right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> HandSample {
        make_hand(0.0, 0.0)
    }

    fn fist() -> HandSample {
        make_hand(1.0, 0.0)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let pointer = Arc::new(PointerDevice::new(Arc::new(RecordingActuator::default())));
        let config = Config {
            leap_x_range: (10.0, 10.0),
            ..Config::default()
        };
        assert!(matches!(
            Engine::new(config, pointer),
            Err(Error::Config(ConfigError::DegenerateRange {
                axis: "leap_x_range",
                ..
            }))
        ));
    }

    #[test]
    fn test_right_hand_moves_cursor() {
        let (rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, None, Some(open())));
        assert_eq!(rec.take(), vec![Call::MoveTo(960, 540)]);
        assert_eq!(engine.mode_kind(), ModeKind::Cursor);
    }

    #[test]
    fn test_no_hands_releases_held_buttons() {
        let (rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, Some(open()), Some(open())));
        assert_eq!(engine.mode_kind(), ModeKind::Pan);
        assert_eq!(rec.take(), vec![Call::Press(Button::Middle)]);

        engine.process(&make_frame(0.1, None, None));
        assert_eq!(rec.take(), vec![Call::Release(Button::Middle)]);
        assert_eq!(engine.mode_kind(), ModeKind::Cursor);

        engine.process(&make_frame(0.2, None, None));
        assert!(rec.take().is_empty());
    }

    #[test]
    fn test_right_hand_loss_cancels_drag() {
        let (rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, None, Some(make_hand(0.0, 0.9))));
        engine.process(&make_frame(0.2, None, Some(make_hand(0.0, 0.9))));
        assert!(engine.click_machine(Hand::Right).is_dragging());

        // Lone left keeps cursor mode but the right machine resets.
        engine.process(&make_frame(0.3, Some(open()), None));
        assert_eq!(engine.mode_kind(), ModeKind::Cursor);
        assert!(!engine.click_machine(Hand::Right).is_dragging());
        assert_eq!(
            rec.take(),
            vec![
                Call::MoveTo(960, 540),
                Call::MoveTo(960, 540),
                Call::Press(Button::Left),
                Call::Release(Button::Left),
            ]
        );
    }

    #[test]
    fn test_mode_change_releases_buttons() {
        let (rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, Some(open()), Some(open())));
        engine.process(&make_frame(0.1, None, Some(open())));
        assert_eq!(engine.mode_kind(), ModeKind::Cursor);
        assert_eq!(
            rec.take(),
            vec![
                Call::Press(Button::Middle),
                Call::Release(Button::Middle),
                Call::MoveTo(960, 540),
            ]
        );
    }

    #[test]
    fn test_lone_left_keeps_scroll() {
        let (rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, Some(fist()), Some(open())));
        assert_eq!(engine.mode_kind(), ModeKind::Scroll);
        engine.process(&make_frame(0.1, Some(fist()), None));
        assert_eq!(engine.mode_kind(), ModeKind::Scroll);
        engine.process(&make_frame(0.2, None, None));
        assert_eq!(engine.mode_kind(), ModeKind::Cursor);
        assert!(rec.take().is_empty());
    }

    #[test]
    fn test_two_fists_exit_once() {
        let (_rec, mut engine) = make_engine();
        let outcomes: Vec<_> = [0.0, 1.0, 2.0, 2.5]
            .iter()
            .map(|t| engine.process(&make_frame(*t, Some(fist()), Some(fist()))))
            .collect();
        assert_eq!(engine.mode_kind(), ModeKind::ExitPending);
        assert_eq!(
            outcomes,
            vec![
                ModeOutcome::Continue,
                ModeOutcome::Continue,
                ModeOutcome::Exit,
                ModeOutcome::Continue,
            ]
        );
    }

    #[test]
    fn test_focus_gate_skips_frames_while_inactive() {
        let (rec, engine) = make_engine();
        let flag = Arc::new(FocusFlag::default());
        let mut engine = engine.with_focus(flag.clone());

        engine.process(&make_frame(0.0, None, Some(open())));
        assert!(rec.take().is_empty());

        flag.set_active(true);
        engine.process(&make_frame(0.1, None, Some(open())));
        assert_eq!(rec.take(), vec![Call::MoveTo(960, 540)]);
    }

    #[test]
    fn test_focus_loss_resets_engine() {
        let (rec, engine) = make_engine();
        let flag = Arc::new(FocusFlag::default());
        flag.set_active(true);
        let mut engine = engine.with_focus(flag.clone());

        engine.process(&make_frame(0.0, Some(open()), Some(open())));
        assert_eq!(engine.mode_kind(), ModeKind::Pan);
        rec.take();

        assert!(flag.set_active(false));
        engine.process(&make_frame(0.1, Some(open()), Some(open())));
        assert_eq!(engine.mode_kind(), ModeKind::Cursor);
        assert_eq!(rec.take(), vec![Call::Release(Button::Middle)]);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let (rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, Some(open()), Some(open())));
        rec.take();
        assert_eq!(engine.shutdown(), 1);
        assert_eq!(engine.shutdown(), 0);
        assert_eq!(rec.take(), vec![Call::Release(Button::Middle)]);
    }

    #[test]
    fn test_status_sexp() {
        let (_rec, mut engine) = make_engine();
        engine.process(&make_frame(0.0, Some(open()), Some(open())));
        assert_eq!(
            engine.status_sexp(),
            "(:mode pan :held (:middle) :focus :ungated :pinch idle :frames 1)"
        );
        assert!(lexpr::from_str(&engine.status_sexp()).is_ok());
    }

    #[test]
    fn test_run_stops_on_shutdown_with_idle_stream() {
        let (rec, mut engine) = make_engine();
        let (tx, rx) = std::sync::mpsc::channel::<Vec<u8>>();
        let feed = FrameFeed::spawn(std::io::BufReader::new(crate::source::make_stalled(rx)))
            .unwrap();

        // Both hands open: pan holds the middle button, then the stream
        // goes quiet without closing.
        tx.send(b"{\"timestamp\": 0, \"hands\": [\
            {\"type\": \"left\", \"palmPosition\": [0, 225, 0]},\
            {\"type\": \"right\", \"palmPosition\": [0, 225, 0]}]}\n"
            .to_vec())
            .unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let signal = {
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(300));
                shutdown.store(true, Ordering::SeqCst);
            })
        };

        let started = std::time::Instant::now();
        assert_eq!(engine.run(&feed, &shutdown).unwrap(), RunExit::Shutdown);
        assert!(started.elapsed() < Duration::from_secs(5));
        signal.join().unwrap();

        assert_eq!(engine.frames(), 1);
        assert_eq!(engine.shutdown(), 1);
        assert_eq!(
            rec.take(),
            vec![Call::Press(Button::Middle), Call::Release(Button::Middle)]
        );
        drop(tx);
    }

    #[test]
    fn test_run_ends_with_stream() {
        let (_rec, mut engine) = make_engine();
        let feed = FrameFeed::spawn(std::io::Cursor::new(
            b"{\"timestamp\": 0, \"hands\": []}\n".to_vec(),
        ))
        .unwrap();
        let shutdown = AtomicBool::new(false);
        assert_eq!(engine.run(&feed, &shutdown).unwrap(), RunExit::EndOfStream);
        assert_eq!(engine.frames(), 1);
    }
}
