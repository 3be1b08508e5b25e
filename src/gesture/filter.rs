//! Exponential smoothing for pinch strength and cursor position.

/// Smooth one scalar sample: `(1 - factor) * raw + factor * prev`.
///
/// The first sample (`prev == None`) passes through unchanged.
pub fn smooth_scalar(prev: Option<f32>, raw: f32, factor: f32) -> f32 {
    match prev {
        Some(prev) => lerp(prev, raw, 1.0 - factor),
        None => raw,
    }
}

/// Componentwise [`smooth_scalar`] on a pixel position, rounded to whole pixels.
pub fn smooth_point(prev: Option<(i32, i32)>, raw: (i32, i32), factor: f32) -> (i32, i32) {
    match prev {
        Some((px, py)) => (
            smooth_scalar(Some(px as f32), raw.0 as f32, factor).round() as i32,
            smooth_scalar(Some(py as f32), raw.1 as f32, factor).round() as i32,
        ),
        None => raw,
    }
}

/// Scalar filter that retains its last output.
#[derive(Debug, Clone, Default)]
pub struct ScalarFilter {
    value: Option<f32>,
}

impl ScalarFilter {
    pub fn update(&mut self, raw: f32, factor: f32) -> f32 {
        let next = smooth_scalar(self.value, raw, factor);
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Pixel-position filter that retains its last output.
#[derive(Debug, Clone, Default)]
pub struct PointFilter {
    value: Option<(i32, i32)>,
}

impl PointFilter {
    pub fn update(&mut self, raw: (i32, i32), factor: f32) -> (i32, i32) {
        let next = smooth_point(self.value, raw, factor);
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<(i32, i32)> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ── Tests ──────────────────────────────────────────────────
