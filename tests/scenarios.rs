//! End-to-end gesture scenarios driven through the public engine API.

use std::io::{BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use leap_pointer::focus::{poll_once, FocusFlag, FocusProbe};
use leap_pointer::gesture::{Frame, HandSample, ModeKind, ModeOutcome};
use leap_pointer::pointer::{Actuator, Button, PointerDevice};
use leap_pointer::source::{FrameFeed, FrameReader};
use leap_pointer::{Config, Engine, RunExit};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    MoveTo(i32, i32),
    MoveBy(i32, i32),
    Press(Button),
    Release(Button),
    Click(Button, u32),
    Scroll(i32, i32),
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    fail_all: AtomicBool,
}

impl Recorder {
    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn record(&self, call: Call) -> anyhow::Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            anyhow::bail!("actuator offline");
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl Actuator for Recorder {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.record(Call::MoveTo(x, y))
    }
    fn move_by(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.record(Call::MoveBy(dx, dy))
    }
    fn press(&self, button: Button) -> anyhow::Result<()> {
        self.record(Call::Press(button))
    }
    fn release(&self, button: Button) -> anyhow::Result<()> {
        self.record(Call::Release(button))
    }
    fn click(&self, button: Button, count: u32) -> anyhow::Result<()> {
        self.record(Call::Click(button, count))
    }
    fn scroll(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.record(Call::Scroll(dx, dy))
    }
}

/// Focus source that always reports the same application.
struct Frontmost(&'static str);

impl FocusProbe for Frontmost {
    fn frontmost_app_name(&mut self) -> anyhow::Result<Option<String>> {
        Ok(Some(self.0.to_string()))
    }
}

/// Actuator whose first press runs a focus poll on another thread that
/// sees a different application in front.
struct FocusThief {
    recorder: Recorder,
    flag: Arc<FocusFlag>,
    device: OnceLock<Weak<PointerDevice>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl FocusThief {
    fn new(flag: Arc<FocusFlag>) -> Self {
        Self {
            recorder: Recorder::default(),
            flag,
            device: OnceLock::new(),
            poller: Mutex::new(None),
        }
    }

    fn join_poller(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.join().unwrap();
        }
    }
}

impl Actuator for FocusThief {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.recorder.move_to(x, y)
    }
    fn move_by(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.recorder.move_by(dx, dy)
    }
    fn press(&self, button: Button) -> anyhow::Result<()> {
        let mut poller = self.poller.lock();
        if poller.is_none() {
            if let Some(device) = self.device.get().and_then(Weak::upgrade) {
                let flag = self.flag.clone();
                *poller = Some(thread::spawn(move || {
                    poll_once(&mut Frontmost("Terminal"), "blender", &flag, &device);
                }));
                thread::sleep(Duration::from_millis(50));
            }
        }
        self.recorder.press(button)
    }
    fn release(&self, button: Button) -> anyhow::Result<()> {
        self.recorder.release(button)
    }
    fn click(&self, button: Button, count: u32) -> anyhow::Result<()> {
        self.recorder.click(button, count)
    }
    fn scroll(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.recorder.scroll(dx, dy)
    }
}

fn make_engine(config: Config) -> (Arc<Recorder>, Engine) {
    let recorder = Arc::new(Recorder::default());
    let pointer = Arc::new(PointerDevice::new(recorder.clone()));
    let engine = Engine::new(config, pointer).unwrap();
    (recorder, engine)
}

/// Config with smoothing off so each sample acts immediately.
fn crisp_config() -> Config {
    Config {
        smoothing: 0.0,
        pinch_smoothing: 0.0,
        sensitivity: 1.0,
        ..Config::default()
    }
}

fn pinching(pinch: f32) -> HandSample {
    HandSample::new([0.0, 225.0, 0.0], 0.0, pinch)
}

fn open() -> HandSample {
    HandSample::new([0.0, 225.0, 0.0], 0.0, 0.0)
}

fn fist() -> HandSample {
    HandSample::new([0.0, 225.0, 0.0], 1.0, 0.0)
}

fn right_only(t: f64, hand: HandSample) -> Frame {
    Frame {
        timestamp_s: t,
        left: None,
        right: Some(hand),
    }
}

fn both(t: f64, left: HandSample, right: HandSample) -> Frame {
    Frame {
        timestamp_s: t,
        left: Some(left),
        right: Some(right),
    }
}

fn presses_only(calls: Vec<Call>) -> Vec<Call> {
    calls
        .into_iter()
        .filter(|c| matches!(c, Call::Press(..) | Call::Release(..)))
        .collect()
}

fn buttons_only(calls: Vec<Call>) -> Vec<Call> {
    calls
        .into_iter()
        .filter(|c| !matches!(c, Call::MoveTo(..)))
        .collect()
}

#[test]
fn test_ramp_and_hold_drags_without_clicking() {
    let config = Config {
        pinch_engage: 0.7,
        pinch_release: 0.3,
        drag_delay: 0.15,
        ..Config::default()
    };
    let (rec, mut engine) = make_engine(config);

    // 0 -> 0.9 over 0.1s, then held until 0.3s, 20ms apart.
    let frames: Vec<Frame> = (0..=15)
        .map(|i| {
            let t = i as f64 * 0.02;
            let pinch = (i as f32 * 0.18).min(0.9);
            right_only(t, pinching(pinch))
        })
        .collect();
    for frame in &frames {
        assert_eq!(engine.process(frame), ModeOutcome::Continue);
    }

    let calls = rec.take();
    let moves = calls.iter().filter(|c| matches!(c, Call::MoveTo(..))).count();
    assert_eq!(moves, frames.len());
    assert_eq!(buttons_only(calls), vec![Call::Press(Button::Left)]);
    assert!(engine.click_machine(leap_pointer::gesture::Hand::Right).is_dragging());
}

#[test]
fn test_hysteresis_single_engage_single_release() {
    let (rec, mut engine) = make_engine(crisp_config());
    for (i, pinch) in [0.0, 0.5, 0.75, 0.5, 0.35, 0.2].iter().enumerate() {
        engine.process(&right_only(i as f64 * 0.02, pinching(*pinch)));
    }
    // Engaged at 0.04, released at 0.10: a click, not a drag.
    assert_eq!(buttons_only(rec.take()), vec![Call::Click(Button::Left, 1)]);
}

#[test]
fn test_held_pinch_drags_then_releases() {
    let (rec, mut engine) = make_engine(crisp_config());
    engine.process(&right_only(0.00, pinching(0.9)));
    engine.process(&right_only(0.20, pinching(0.9)));
    engine.process(&right_only(0.25, pinching(0.1)));
    assert_eq!(
        buttons_only(rec.take()),
        vec![Call::Press(Button::Left), Call::Release(Button::Left)]
    );
}

#[test]
fn test_double_click_within_window() {
    let (rec, mut engine) = make_engine(crisp_config());
    for (t, p) in [(0.0, 0.9), (0.05, 0.1), (0.25, 0.9), (0.30, 0.1)] {
        engine.process(&right_only(t, pinching(p)));
    }
    assert_eq!(
        buttons_only(rec.take()),
        vec![Call::Click(Button::Left, 1), Call::Click(Button::Left, 2)]
    );
}

#[test]
fn test_clicks_outside_window_are_independent() {
    let (rec, mut engine) = make_engine(crisp_config());
    for (t, p) in [(0.0, 0.9), (0.05, 0.1), (0.50, 0.9), (0.55, 0.1)] {
        engine.process(&right_only(t, pinching(p)));
    }
    assert_eq!(
        buttons_only(rec.take()),
        vec![Call::Click(Button::Left, 1), Call::Click(Button::Left, 1)]
    );
}

#[test]
fn test_two_fists_select_exit_even_when_pinching() {
    let (_rec, mut engine) = make_engine(crisp_config());
    let pinchy_fist = HandSample::new([0.0, 225.0, 0.0], 1.0, 1.0);
    engine.process(&both(0.0, pinchy_fist, pinchy_fist));
    assert_eq!(engine.mode_kind(), ModeKind::ExitPending);
}

#[test]
fn test_exit_gesture_terminates_once() {
    let (_rec, mut engine) = make_engine(crisp_config());
    let exits = (0..=30)
        .map(|i| engine.process(&both(i as f64 * 0.1, fist(), fist())))
        .filter(|o| *o == ModeOutcome::Exit)
        .count();
    assert_eq!(exits, 1);
}

#[test]
fn test_lone_left_keeps_scroll_then_hands_lost() {
    let (rec, mut engine) = make_engine(crisp_config());
    engine.process(&both(0.0, fist(), open()));
    assert_eq!(engine.mode_kind(), ModeKind::Scroll);

    engine.process(&Frame {
        timestamp_s: 0.1,
        left: Some(fist()),
        right: None,
    });
    assert_eq!(engine.mode_kind(), ModeKind::Scroll);

    engine.process(&Frame::empty(0.2));
    assert_eq!(engine.mode_kind(), ModeKind::Cursor);
    assert!(rec.take().is_empty());
}

#[test]
fn test_hands_lost_releases_pan_button() {
    let (rec, mut engine) = make_engine(crisp_config());
    engine.process(&both(0.0, open(), open()));
    assert_eq!(engine.mode_kind(), ModeKind::Pan);

    // Lone left: pan retained, middle stays down.
    engine.process(&Frame {
        timestamp_s: 0.1,
        left: Some(open()),
        right: None,
    });
    assert_eq!(engine.mode_kind(), ModeKind::Pan);
    assert!(engine.pointer().held().is_held(Button::Middle));

    engine.process(&Frame::empty(0.2));
    assert_eq!(
        rec.take(),
        vec![Call::Press(Button::Middle), Call::Release(Button::Middle)]
    );
    assert!(!engine.pointer().held().any());
}

#[test]
fn test_release_all_is_idempotent() {
    let (rec, mut engine) = make_engine(crisp_config());
    engine.process(&both(0.0, open(), open()));
    rec.take();
    assert_eq!(engine.pointer().release_all(), 1);
    assert_eq!(engine.pointer().release_all(), 0);
    assert_eq!(engine.shutdown(), 0);
    assert_eq!(rec.take(), vec![Call::Release(Button::Middle)]);
}

#[test]
fn test_center_maps_to_screen_center() {
    let (rec, mut engine) = make_engine(crisp_config());
    engine.process(&right_only(0.0, open()));
    assert_eq!(rec.take(), vec![Call::MoveTo(960, 540)]);
}

#[test]
fn test_actuator_failures_do_not_stop_the_engine() {
    let (rec, mut engine) = make_engine(crisp_config());
    rec.fail_all.store(true, Ordering::SeqCst);
    engine.process(&both(0.0, open(), open()));
    engine.process(&both(0.1, open(), open()));
    assert_eq!(engine.mode_kind(), ModeKind::Pan);
    assert!(!engine.pointer().held().any());

    rec.fail_all.store(false, Ordering::SeqCst);
    engine.process(&both(0.2, open(), open()));
    assert_eq!(rec.take(), vec![Call::Press(Button::Middle)]);
}

#[test]
fn test_focus_loss_pauses_until_refocused() {
    let (rec, engine) = make_engine(crisp_config());
    let flag = Arc::new(FocusFlag::default());
    flag.set_active(true);
    let mut engine = engine.with_focus(flag.clone());

    engine.process(&right_only(0.0, open()));
    assert_eq!(rec.take(), vec![Call::MoveTo(960, 540)]);

    flag.set_active(false);
    engine.process(&right_only(0.1, open()));
    assert!(rec.take().is_empty());

    flag.set_active(true);
    engine.process(&right_only(0.2, open()));
    assert_eq!(rec.take(), vec![Call::MoveTo(960, 540)]);
}

#[test]
fn test_json_stream_drives_engine() {
    let stream = "\
{\"serviceVersion\": \"2.3.1\"}
{\"timestamp\": 0, \"hands\": [{\"type\": \"right\", \"palmPosition\": [0, 225, 0], \"pinchStrength\": 0.9}]}
garbage
{\"timestamp\": 50000, \"hands\": [{\"type\": \"right\", \"palmPosition\": [0, 225, 0], \"pinchStrength\": 0.1}]}
{\"timestamp\": 100000, \"hands\": []}
";
    let (rec, mut engine) = make_engine(crisp_config());
    let mut reader = FrameReader::new(stream.as_bytes());
    while let Some(frame) = reader.next_frame().unwrap() {
        engine.process(&frame);
    }
    assert_eq!(reader.skipped(), 1);
    assert_eq!(engine.frames(), 3);
    assert_eq!(buttons_only(rec.take()), vec![Call::Click(Button::Left, 1)]);
}

#[test]
fn test_focus_loss_during_press_leaves_nothing_held() {
    let flag = Arc::new(FocusFlag::default());
    flag.set_active(true);
    let thief = Arc::new(FocusThief::new(flag.clone()));
    let pointer = Arc::new(PointerDevice::new(thief.clone()));
    let _ = thief.device.set(Arc::downgrade(&pointer));
    let mut engine = Engine::new(crisp_config(), pointer)
        .unwrap()
        .with_focus(flag.clone());

    // Entering pan presses middle while the poller sees focus leave.
    engine.process(&both(0.0, open(), open()));
    thief.join_poller();
    assert!(!flag.is_active());
    assert_eq!(
        presses_only(thief.recorder.take()),
        vec![Call::Press(Button::Middle), Call::Release(Button::Middle)]
    );
    assert!(!engine.pointer().held().any());

    engine.process(&both(0.1, open(), open()));
    assert_eq!(engine.mode_kind(), ModeKind::Cursor);
    assert_eq!(engine.shutdown(), 0);
    assert!(thief.recorder.take().is_empty());
}

#[test]
fn test_shutdown_flag_stops_idle_stream_and_releases() {
    let (mut writer, reader) = UnixStream::pair().unwrap();
    writer
        .write_all(
            b"{\"timestamp\": 0, \"hands\": [\
              {\"type\": \"left\", \"palmPosition\": [0, 225, 0]},\
              {\"type\": \"right\", \"palmPosition\": [0, 225, 0]}]}\n",
        )
        .unwrap();

    let (rec, mut engine) = make_engine(crisp_config());
    let feed = FrameFeed::spawn(BufReader::new(reader)).unwrap();
    let shutdown = Arc::new(AtomicBool::new(false));
    let signal = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            shutdown.store(true, Ordering::SeqCst);
        })
    };

    // The writer stays open, so no more frames and no end of stream.
    let started = Instant::now();
    assert_eq!(engine.run(&feed, &shutdown).unwrap(), RunExit::Shutdown);
    assert!(started.elapsed() < Duration::from_secs(5));
    signal.join().unwrap();

    assert_eq!(engine.mode_kind(), ModeKind::Pan);
    assert_eq!(engine.shutdown(), 1);
    assert_eq!(
        rec.take(),
        vec![Call::Press(Button::Middle), Call::Release(Button::Middle)]
    );
    drop(writer);
}
