//! Session configuration: tunable thresholds, timing windows, axis ranges
//! and screen geometry.
//!
//! Built once at startup (defaults overridden by the CLI), validated, and
//! never mutated afterwards.

use crate::error::ConfigError;

/// Immutable tunable parameters for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Expansion of the usable tracking volume about its center (1.0 = none).
    pub sensitivity: f32,
    /// Cursor position smoothing factor in [0, 1); 0 disables smoothing.
    pub smoothing: f32,

    /// Smoothed pinch strength that starts a click/drag.
    pub pinch_engage: f32,
    /// Smoothed pinch strength below which a click/drag ends.
    pub pinch_release: f32,
    /// Pinch strength smoothing factor in [0, 1).
    pub pinch_smoothing: f32,

    /// Grab strength at or above which a hand is a fist.
    pub fist_threshold: f32,
    /// Grab strength below which a hand is open.
    pub open_threshold: f32,
    /// Raw pinch strength at or above which a hand is pinching (mode selection).
    pub pinch_threshold: f32,

    /// Seconds a pinch must be held before it becomes a drag.
    pub drag_delay: f64,
    /// Seconds both fists must be held before the program exits.
    pub exit_hold_time: f64,
    /// Two clicks within this many seconds form a double-click.
    pub double_click_window: f64,

    /// Scroll ticks per device unit of vertical hand travel.
    pub scroll_sensitivity: f32,
    /// Scroll ticks per device unit of inter-palm distance change.
    pub zoom_sensitivity: f32,

    /// Sensor-space x bounds (mm from device center) mapped to the screen.
    pub leap_x_range: (f32, f32),
    /// Sensor-space y bounds (mm above the device) mapped to the screen.
    pub leap_y_range: (f32, f32),

    pub screen_width: u32,
    pub screen_height: u32,

    /// Frames are only processed while this application has focus.
    pub target_window: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensitivity: 1.5,
            smoothing: 0.3,
            pinch_engage: 0.7,
            pinch_release: 0.3,
            pinch_smoothing: 0.5,
            fist_threshold: 0.9,
            open_threshold: 0.3,
            pinch_threshold: 0.7,
            drag_delay: 0.15,
            exit_hold_time: 2.0,
            double_click_window: 0.4,
            scroll_sensitivity: 0.5,
            zoom_sensitivity: 0.2,
            leap_x_range: (-150.0, 150.0),
            leap_y_range: (100.0, 350.0),
            screen_width: 1920,
            screen_height: 1080,
            target_window: None,
        }
    }
}

impl Config {
    /// Validate every field. Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("leap_x_range", self.leap_x_range)?;
        check_range("leap_y_range", self.leap_y_range)?;

        check_factor("smoothing", self.smoothing)?;
        check_factor("pinch_smoothing", self.pinch_smoothing)?;

        check_unit("pinch_engage", self.pinch_engage)?;
        check_unit("pinch_release", self.pinch_release)?;
        check_unit("fist_threshold", self.fist_threshold)?;
        check_unit("open_threshold", self.open_threshold)?;
        check_unit("pinch_threshold", self.pinch_threshold)?;

        if self.pinch_engage <= self.pinch_release {
            return Err(ConfigError::ThresholdOrder {
                upper_name: "pinch_engage",
                upper: self.pinch_engage,
                lower_name: "pinch_release",
                lower: self.pinch_release,
            });
        }
        if self.fist_threshold <= self.open_threshold {
            return Err(ConfigError::ThresholdOrder {
                upper_name: "fist_threshold",
                upper: self.fist_threshold,
                lower_name: "open_threshold",
                lower: self.open_threshold,
            });
        }

        check_positive("drag_delay", self.drag_delay)?;
        check_positive("exit_hold_time", self.exit_hold_time)?;
        check_positive("double_click_window", self.double_click_window)?;
        check_positive("sensitivity", self.sensitivity as f64)?;
        check_positive("scroll_sensitivity", self.scroll_sensitivity as f64)?;
        check_positive("zoom_sensitivity", self.zoom_sensitivity as f64)?;

        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ConfigError::InvalidScreen {
                width: self.screen_width,
                height: self.screen_height,
            });
        }

        if let Some(name) = &self.target_window {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyTargetWindow);
            }
        }

        Ok(())
    }
}

fn check_range(axis: &'static str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() || max <= min {
        return Err(ConfigError::DegenerateRange { axis, min, max });
    }
    Ok(())
}

/// Smoothing factors: 1.0 would freeze the signal forever.
fn check_factor(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            expected: "[0, 1)",
        });
    }
    Ok(())
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            expected: "[0, 1]",
        });
    }
    Ok(())
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            expected: "(0, inf)",
        });
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────
