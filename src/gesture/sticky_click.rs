//! Sticky pinch: hysteresis state machine that turns a hand's pinch
//! strength into click, double-click, and drag events.
//!
//! Engaging requires the smoothed strength to reach `engage`; releasing
//! requires it to fall strictly below `release`.  A pinch released before
//! `drag_delay` is a click; one held past it becomes a drag.  One instance
//! exists per hand.

use tracing::debug;

use super::filter::ScalarFilter;
use super::hand_tracking::Hand;
use crate::config::Config;

// ── State ──────────────────────────────────────────────────

/// Pinch state for one hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickState {
    /// No pinch in progress.
    Idle,
    /// Pinch engaged at `since_s`; not yet known whether click or drag.
    Engaged { since_s: f64 },
    /// Pinch held past the drag delay; the button is down.
    Dragging,
}

impl ClickState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Engaged { .. } => "engaged",
            Self::Dragging => "dragging",
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// Events emitted by the sticky pinch machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickEvent {
    /// Strength crossed the engage threshold.
    Engaged,
    /// Quick pinch released.
    Click,
    /// Quick pinch released within the double-click window of the last click.
    DoubleClick,
    /// Pinch held past the drag delay: press and hold.
    DragStart,
    /// Dragging pinch released: release the button.
    DragEnd,
}

// ── Thresholds ─────────────────────────────────────────────

/// Thresholds and timing for the sticky pinch.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickConfig {
    pub engage: f32,
    pub release: f32,
    /// Smoothing factor applied to raw pinch strength.
    pub smoothing: f32,
    pub drag_delay_s: f64,
    pub double_click_window_s: f64,
}

impl ClickConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            engage: config.pinch_engage,
            release: config.pinch_release,
            smoothing: config.pinch_smoothing,
            drag_delay_s: config.drag_delay,
            double_click_window_s: config.double_click_window,
        }
    }
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ── Machine ────────────────────────────────────────────────

/// Sticky pinch tracker for a single hand.
#[derive(Debug, Clone)]
pub struct StickyClick {
    pub hand: Hand,
    pub config: ClickConfig,
    state: ClickState,
    pinch: ScalarFilter,
    /// Time of the last single click, for double-click detection.
    last_click_s: Option<f64>,
}

impl StickyClick {
    pub fn new(hand: Hand, config: ClickConfig) -> Self {
        Self {
            hand,
            config,
            state: ClickState::Idle,
            pinch: ScalarFilter::default(),
            last_click_s: None,
        }
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    /// Last smoothed pinch strength, if any sample has been seen.
    pub fn smoothed_pinch(&self) -> Option<f32> {
        self.pinch.value()
    }

    /// Whether this machine believes its button is held.
    pub fn is_dragging(&self) -> bool {
        self.state == ClickState::Dragging
    }

    /// Feed one raw pinch sample taken at `now_s`.
    pub fn update(&mut self, raw_pinch: f32, now_s: f64) -> Vec<ClickEvent> {
        let pinch = self.pinch.update(raw_pinch, self.config.smoothing);
        let mut events = Vec::new();

        if let ClickState::Idle = self.state {
            if pinch >= self.config.engage {
                self.state = ClickState::Engaged { since_s: now_s };
                debug!("Pinch engaged on {} hand ({:.2})", self.hand.as_str(), pinch);
                events.push(ClickEvent::Engaged);
            }
            return events;
        }

        if let ClickState::Engaged { since_s } = self.state {
            if now_s - since_s >= self.config.drag_delay_s {
                self.state = ClickState::Dragging;
                events.push(ClickEvent::DragStart);
            }
        }

        if pinch < self.config.release {
            match self.state {
                ClickState::Dragging => events.push(ClickEvent::DragEnd),
                ClickState::Engaged { .. } => events.push(self.register_click(now_s)),
                ClickState::Idle => {}
            }
            self.state = ClickState::Idle;
        }

        events
    }

    /// Click or double-click, depending on the last click time.
    fn register_click(&mut self, now_s: f64) -> ClickEvent {
        match self.last_click_s {
            Some(last) if now_s - last <= self.config.double_click_window_s => {
                self.last_click_s = None;
                ClickEvent::DoubleClick
            }
            _ => {
                self.last_click_s = Some(now_s);
                ClickEvent::Click
            }
        }
    }

    /// Hard reset after hand loss, focus loss, or a mode change.
    ///
    /// Returns `true` if a drag was in progress.  Emits nothing and leaves
    /// the double-click history untouched.
    pub fn force_reset(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        if self.state != ClickState::Idle {
            debug!(
                "Pinch reset on {} hand (was {})",
                self.hand.as_str(),
                self.state.as_str()
            );
        }
        self.state = ClickState::Idle;
        self.pinch.reset();
        was_dragging
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn make_click() -> StickyClick {
    StickyClick::new(
        Hand::Right,
        ClickConfig {
            engage: 0.7,
            release: 0.3,
            smoothing: 0.0,
            drag_delay_s: 0.15,
            double_click_window_s: 0.4,
        },
    )
}

/// Feed `(time, strength)` samples, collecting every event.
#[cfg(test)]
fn run(click: &mut StickyClick, samples: &[(f64, f32)]) -> Vec<ClickEvent> {
    samples
        .iter()
        .flat_map(|&(t, p)| click.update(p, t))
        .collect()
}
