//! Interaction modes and their per-frame handlers.
//!
//! Each mode carries its own scratch state (anchors, fractional
//! remainders, timers) inside its enum variant.  A mode change replaces
//! the whole value, so nothing recorded in one session of a mode can
//! leak into the next.

use tracing::{debug, info};

use super::arbiter::ModeKind;
use super::filter::PointFilter;
use super::hand_tracking::{Frame, Hand, PerHand};
use super::mapper::CoordinateMapper;
use super::sticky_click::{ClickEvent, StickyClick};
use crate::config::Config;
use crate::pointer::{Button, PointerDevice};

// ── Per-mode state ─────────────────────────────────────────

/// Cursor mode: smoothed pointer position.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    pub smoothed: PointFilter,
}

/// Scroll mode: last right-palm height and unsent fractional ticks.
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    pub last_y: Option<f32>,
    pub residual: f32,
}

/// Pan mode: last two-hand average position and unsent fractional pixels.
#[derive(Debug, Clone, Default)]
pub struct PanState {
    pub anchor: Option<[f32; 2]>,
    pub residual: [f32; 2],
}

/// Zoom mode: last palm-to-palm distance and unsent fractional ticks.
#[derive(Debug, Clone, Default)]
pub struct ZoomState {
    pub last_distance: Option<f32>,
    pub residual: f32,
}

/// Exit countdown.
#[derive(Debug, Clone, Default)]
pub struct ExitState {
    /// When both fists were first seen in this hold.
    pub since_s: Option<f64>,
    /// Last whole-second countdown value announced.
    pub last_notice: Option<u64>,
    /// Termination already signalled.
    pub fired: bool,
}

/// Active interaction mode with its state.
#[derive(Debug, Clone)]
pub enum Mode {
    Cursor(CursorState),
    Scroll(ScrollState),
    Pan(PanState),
    Zoom(ZoomState),
    ExitPending(ExitState),
}

impl Default for Mode {
    fn default() -> Self {
        Mode::enter(ModeKind::Cursor)
    }
}

/// What the dispatcher should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    Continue,
    /// The exit gesture completed: terminate the program.
    Exit,
}

/// Shared collaborators and per-hand machines a handler may use.
pub struct ModeContext<'a> {
    pub config: &'a Config,
    pub mapper: &'a CoordinateMapper,
    pub pointer: &'a PointerDevice,
    pub clicks: &'a mut PerHand<StickyClick>,
}

impl Mode {
    /// Fresh state for `kind`.
    pub fn enter(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Cursor => Mode::Cursor(CursorState::default()),
            ModeKind::Scroll => Mode::Scroll(ScrollState::default()),
            ModeKind::Pan => Mode::Pan(PanState::default()),
            ModeKind::Zoom => Mode::Zoom(ZoomState::default()),
            ModeKind::ExitPending => Mode::ExitPending(ExitState::default()),
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Cursor(_) => ModeKind::Cursor,
            Mode::Scroll(_) => ModeKind::Scroll,
            Mode::Pan(_) => ModeKind::Pan,
            Mode::Zoom(_) => ModeKind::Zoom,
            Mode::ExitPending(_) => ModeKind::ExitPending,
        }
    }

    /// Run this mode's handler for one frame.
    pub fn handle(&mut self, frame: &Frame, ctx: &mut ModeContext<'_>) -> ModeOutcome {
        match self {
            Mode::Cursor(state) => handle_cursor(state, frame, ctx),
            Mode::Scroll(state) => handle_scroll(state, frame, ctx),
            Mode::Pan(state) => handle_pan(state, frame, ctx),
            Mode::Zoom(state) => handle_zoom(state, frame, ctx),
            Mode::ExitPending(state) => return handle_exit(state, frame, ctx),
        }
        ModeOutcome::Continue
    }
}

// ── Handlers ───────────────────────────────────────────────

/// Right palm drives the cursor; right pinch clicks and drags.
fn handle_cursor(state: &mut CursorState, frame: &Frame, ctx: &mut ModeContext<'_>) {
    let Some(right) = frame.right else {
        return;
    };

    let target = ctx.mapper.map(right.palm);
    let (x, y) = state.smoothed.update(target, ctx.config.smoothing);
    ctx.pointer.move_to(x, y);

    let click = ctx.clicks.get_mut(Hand::Right);
    for event in click.update(right.pinch_strength, frame.timestamp_s) {
        match event {
            ClickEvent::Engaged => {}
            ClickEvent::Click => {
                info!("[Click]");
                ctx.pointer.click(Button::Left, 1);
            }
            ClickEvent::DoubleClick => {
                info!("[Double Click]");
                ctx.pointer.click(Button::Left, 2);
            }
            ClickEvent::DragStart => {
                info!("[Drag Start]");
                ctx.pointer.press(Button::Left);
            }
            ClickEvent::DragEnd => {
                info!("[Drag End]");
                ctx.pointer.release(Button::Left);
            }
        }
    }
}

/// Right palm height drives the scroll wheel.
fn handle_scroll(state: &mut ScrollState, frame: &Frame, ctx: &mut ModeContext<'_>) {
    let Some(right) = frame.right else {
        state.last_y = None;
        return;
    };

    let y = right.palm[1];
    if let Some(prev) = state.last_y {
        let delta = (y - prev) * ctx.config.scroll_sensitivity;
        let ticks = take_whole(&mut state.residual, delta);
        ctx.pointer.scroll(0, ticks);
    }
    state.last_y = Some(y);
}

/// Both palms together drag with the middle button held.
fn handle_pan(state: &mut PanState, frame: &Frame, ctx: &mut ModeContext<'_>) {
    let (Some(left), Some(right)) = (frame.left, frame.right) else {
        state.anchor = None;
        return;
    };

    ctx.pointer.press(Button::Middle);

    let avg = [
        (left.palm[0] + right.palm[0]) / 2.0,
        (left.palm[1] + right.palm[1]) / 2.0,
    ];
    if let Some(anchor) = state.anchor {
        let sensitivity = ctx.config.sensitivity;
        let dx = take_whole(&mut state.residual[0], (avg[0] - anchor[0]) * sensitivity);
        let dy = take_whole(&mut state.residual[1], -(avg[1] - anchor[1]) * sensitivity);
        ctx.pointer.move_by(dx, dy);
    } else {
        debug!("Pan anchored at ({:.1}, {:.1})", avg[0], avg[1]);
    }
    state.anchor = Some(avg);
}

/// Palm-to-palm distance drives the scroll wheel.
fn handle_zoom(state: &mut ZoomState, frame: &Frame, ctx: &mut ModeContext<'_>) {
    let (Some(left), Some(right)) = (frame.left, frame.right) else {
        state.last_distance = None;
        return;
    };

    let distance = left.palm_distance(&right);
    if let Some(prev) = state.last_distance {
        let delta = (distance - prev) * ctx.config.zoom_sensitivity;
        let ticks = take_whole(&mut state.residual, delta);
        ctx.pointer.scroll(0, ticks);
    }
    state.last_distance = Some(distance);
}

/// Both fists held for `exit_hold_time` terminate the program once.
/// The hold must be continuous: losing either hand restarts it.
fn handle_exit(state: &mut ExitState, frame: &Frame, ctx: &mut ModeContext<'_>) -> ModeOutcome {
    if frame.left.is_none() || frame.right.is_none() {
        if state.since_s.take().is_some() {
            info!("Exit hold interrupted");
        }
        state.last_notice = None;
        return ModeOutcome::Continue;
    }
    if state.fired {
        return ModeOutcome::Continue;
    }

    let hold = ctx.config.exit_hold_time;
    let now = frame.timestamp_s;
    let since = *state.since_s.get_or_insert_with(|| {
        info!("Both fists: hold {:.1}s to exit, open a hand to cancel", hold);
        now
    });

    let held = now - since;
    if held >= hold {
        state.fired = true;
        info!("Exit gesture held for {:.1}s, exiting", held);
        return ModeOutcome::Exit;
    }

    let remaining = (hold - held).ceil() as u64;
    if state.last_notice != Some(remaining) {
        state.last_notice = Some(remaining);
        info!("Exiting in {}...", remaining);
    }
    ModeOutcome::Continue
}

/// Add `delta` to `residual` and take out its whole part.
fn take_whole(residual: &mut f32, delta: f32) -> i32 {
    *residual += delta;
    let whole = residual.trunc();
    *residual -= whole;
    whole as i32
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
use super::hand_tracking::HandSample;
#[cfg(test)]
use super::sticky_click::ClickConfig;
#[cfg(test)]
use crate::pointer::{make_device, Call};

#[cfg(test)]
fn make_clicks(config: &Config) -> PerHand<StickyClick> {
    let click = ClickConfig::from_config(config);
    PerHand::new(
        StickyClick::new(Hand::Left, click.clone()),
        StickyClick::new(Hand::Right, click),
    )
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
fn at(x: f32, y: f32, z: f32) -> HandSample {
    HandSample::new([x, y, z], 0.0, 0.0)
}
