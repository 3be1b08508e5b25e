//! Hand pose classification and interaction mode selection.
//!
//! Each present hand is classified as fist, pinch, open, or neutral; the
//! pair of poses then selects the active [`ModeKind`].  The right hand is
//! the pointing hand: a lone right hand always means cursor control, while
//! a lone left hand keeps whatever mode is active.

use super::hand_tracking::HandSample;
use crate::config::Config;

// ── Hand pose ──────────────────────────────────────────────

/// Coarse classification of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandPose {
    /// Grab strength at or above the fist threshold.
    Fist,
    /// Not a fist, pinch strength at or above the pinch threshold.
    Pinch,
    /// Grab strength below the open threshold.
    Open,
    /// Anything in between.
    Neutral,
}

impl HandPose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fist => "fist",
            Self::Pinch => "pinch",
            Self::Open => "open",
            Self::Neutral => "neutral",
        }
    }

    /// Open or neutral: a relaxed hand.
    fn is_relaxed(&self) -> bool {
        matches!(self, Self::Open | Self::Neutral)
    }
}

/// Thresholds used by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseThresholds {
    pub fist: f32,
    pub open: f32,
    pub pinch: f32,
}

impl PoseThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fist: config.fist_threshold,
            open: config.open_threshold,
            pinch: config.pinch_threshold,
        }
    }
}

/// Classify a hand sample.  Fist wins over pinch, pinch over open.
pub fn classify(hand: &HandSample, thresholds: &PoseThresholds) -> HandPose {
    if hand.grab_strength >= thresholds.fist {
        HandPose::Fist
    } else if hand.pinch_strength >= thresholds.pinch {
        HandPose::Pinch
    } else if hand.grab_strength < thresholds.open {
        HandPose::Open
    } else {
        HandPose::Neutral
    }
}

// ── Mode kind ──────────────────────────────────────────────

/// Interaction mode, without per-mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Cursor,
    Scroll,
    Pan,
    Zoom,
    ExitPending,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Scroll => "scroll",
            Self::Pan => "pan",
            Self::Zoom => "zoom",
            Self::ExitPending => "exit-pending",
        }
    }
}

/// Select the mode for this frame's poses.
///
/// Rules in priority order: no hands or a lone right hand select cursor;
/// a lone left hand keeps `current`; two hands pick by pose pair.
pub fn select_mode(
    current: ModeKind,
    left: Option<HandPose>,
    right: Option<HandPose>,
) -> ModeKind {
    match (left, right) {
        (None, None) | (None, Some(_)) => ModeKind::Cursor,
        (Some(_), None) => current,
        (Some(l), Some(r)) => match (l, r) {
            (HandPose::Fist, HandPose::Fist) => ModeKind::ExitPending,
            (HandPose::Fist, r) if r.is_relaxed() => ModeKind::Scroll,
            (HandPose::Pinch, HandPose::Pinch) => ModeKind::Zoom,
            (l, r) if l.is_relaxed() && r.is_relaxed() => ModeKind::Pan,
            _ => ModeKind::Cursor,
        },
    }
}

// ── Tests ──────────────────────────────────────────────────
