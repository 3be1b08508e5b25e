//! Sensor-space to screen-space mapping.
//!
//! Normalizes palm x/y against the configured interaction box, expands the
//! usable center by `sensitivity`, and inverts the vertical axis (a higher
//! hand means a lower on-screen y).  Range degeneracy is rejected by
//! `Config::validate`, so `map` never divides by zero.

use crate::config::Config;

/// Maps device-space palm positions to screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMapper {
    pub x_range: (f32, f32),
    pub y_range: (f32, f32),
    pub sensitivity: f32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl CoordinateMapper {
    pub fn from_config(config: &Config) -> Self {
        Self {
            x_range: config.leap_x_range,
            y_range: config.leap_y_range,
            sensitivity: config.sensitivity,
            screen_width: config.screen_width,
            screen_height: config.screen_height,
        }
    }

    /// Map a palm position to a pixel `(x, y)`.  The z axis is ignored.
    pub fn map(&self, position: [f32; 3]) -> (i32, i32) {
        let nx = self.expand(normalize(position[0], self.x_range));
        let ny = self.expand(normalize(position[1], self.y_range));
        let px = (nx * self.screen_width as f32).round() as i32;
        let py = ((1.0 - ny) * self.screen_height as f32).round() as i32;
        (px, py)
    }

    fn expand(&self, n: f32) -> f32 {
        (0.5 + (n - 0.5) * self.sensitivity).clamp(0.0, 1.0)
    }
}

fn normalize(v: f32, (min, max): (f32, f32)) -> f32 {
    ((v - min) / (max - min)).clamp(0.0, 1.0)
}

// ── Tests ──────────────────────────────────────────────────
