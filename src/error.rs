//! Error taxonomy for the gesture engine.
//!
//! Configuration problems are rejected before the frame loop starts.
//! Transient sensor anomalies never surface here: they are recovered
//! inside the engine by forced state resets.

use thiserror::Error;

/// A configuration value that cannot be used to run a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Axis range with `max <= min` (or a non-finite bound).
    #[error("{axis} range is degenerate: min {min} must be below max {max}")]
    DegenerateRange {
        axis: &'static str,
        min: f32,
        max: f32,
    },
    /// A scalar parameter outside its accepted interval.
    #[error("{name} must be in {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
    /// Two thresholds that must be ordered for hysteresis to work.
    #[error("{upper_name} ({upper}) must be greater than {lower_name} ({lower})")]
    ThresholdOrder {
        upper_name: &'static str,
        upper: f32,
        lower_name: &'static str,
        lower: f32,
    },
    /// Screen dimensions of zero.
    #[error("screen size must be positive, got {width}x{height}")]
    InvalidScreen { width: u32, height: u32 },
    /// `target_window` given but blank.
    #[error("target window name must not be blank")]
    EmptyTargetWindow,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The tracking source failed and cannot deliver more frames.
    #[error("tracking source I/O error: {0}")]
    Source(#[from] std::io::Error),

    /// A single tracking message could not be decoded.
    #[error("tracking message decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
