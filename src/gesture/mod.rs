//! Gesture interpretation: filters, mapping, and the mode state machine.
//!
//! Provides:
//! - `hand_tracking`: per-frame hand data and handedness
//! - `filter`: exponential smoothing for pinch strength and cursor position
//! - `mapper`: sensor-space to screen-space coordinates
//! - `sticky_click`: per-hand pinch hysteresis (click, double-click, drag)
//! - `arbiter`: hand pose classification and mode selection
//! - `modes`: per-mode state and frame handlers

pub mod arbiter;
pub mod filter;
pub mod hand_tracking;
pub mod mapper;
pub mod modes;
pub mod sticky_click;

pub use arbiter::{classify, select_mode, HandPose, ModeKind, PoseThresholds};
pub use hand_tracking::{Frame, Hand, HandSample, PerHand};
pub use mapper::CoordinateMapper;
pub use modes::{Mode, ModeOutcome};
pub use sticky_click::{ClickConfig, ClickEvent, ClickState, StickyClick};
