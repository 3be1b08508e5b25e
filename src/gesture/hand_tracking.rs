//! Hand tracking data model: per-hand samples and the per-tick frame.
//!
//! A frame carries at most one hand of each handedness.  No identity is
//! kept across frames beyond the left/right tag.

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a handedness tag ("left" or "right", any case).
    pub fn parse(s: &str) -> Option<Hand> {
        if s.eq_ignore_ascii_case("left") {
            Some(Hand::Left)
        } else if s.eq_ignore_ascii_case("right") {
            Some(Hand::Right)
        } else {
            None
        }
    }

    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];
}

// ── Hand sample ────────────────────────────────────────────

/// Sensor data for one tracked hand in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSample {
    /// Palm center in device space (mm): x right, y up, z toward the user.
    pub palm: [f32; 3],
    /// Whole-hand closure (0.0 open – 1.0 fist).
    pub grab_strength: f32,
    /// Thumb–index contact estimate (0.0 apart – 1.0 touching).
    pub pinch_strength: f32,
}

impl HandSample {
    pub fn new(palm: [f32; 3], grab_strength: f32, pinch_strength: f32) -> Self {
        Self {
            palm,
            grab_strength,
            pinch_strength,
        }
    }

    /// Euclidean distance between two palm centers.
    pub fn palm_distance(&self, other: &HandSample) -> f32 {
        let dx = other.palm[0] - self.palm[0];
        let dy = other.palm[1] - self.palm[1];
        let dz = other.palm[2] - self.palm[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ── Frame ──────────────────────────────────────────────────

/// One tick of tracking input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Capture time in seconds (monotonic within a session).
    pub timestamp_s: f64,
    pub left: Option<HandSample>,
    pub right: Option<HandSample>,
}

impl Frame {
    /// Frame with no hands.
    pub fn empty(timestamp_s: f64) -> Self {
        Self {
            timestamp_s,
            left: None,
            right: None,
        }
    }

    /// Build a frame from tagged hands.  When the source reports two hands
    /// with the same tag, the first one wins.
    pub fn from_hands<I>(timestamp_s: f64, hands: I) -> Self
    where
        I: IntoIterator<Item = (Hand, HandSample)>,
    {
        let mut frame = Self::empty(timestamp_s);
        for (hand, sample) in hands {
            let slot = match hand {
                Hand::Left => &mut frame.left,
                Hand::Right => &mut frame.right,
            };
            if slot.is_none() {
                *slot = Some(sample);
            }
        }
        frame
    }

    pub fn hand(&self, hand: Hand) -> Option<&HandSample> {
        match hand {
            Hand::Left => self.left.as_ref(),
            Hand::Right => self.right.as_ref(),
        }
    }

    /// Whether no hand is present.
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

// ── Per-hand container ─────────────────────────────────────

/// One value per hand, indexed by handedness.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerHand<T> {
    pub left: T,
    pub right: T,
}

impl<T> PerHand<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, hand: Hand) -> &T {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, hand: Hand) -> &mut T {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
