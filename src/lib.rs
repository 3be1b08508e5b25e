//! leap-pointer: turn hand-tracking frames into pointer actions.
//!
//! Provides:
//! - `gesture`: filtering, mapping, pinch hysteresis, and mode arbitration
//! - `pointer`: the actuator collaborator and held-button bookkeeping
//! - `dispatch`: the per-frame engine
//! - `focus`: optional gating on the frontmost application
//! - `source`: JSON frame stream decoding and the reader thread
//! - `config` / `error`: session parameters and the error taxonomy

pub mod config;
pub mod dispatch;
pub mod error;
pub mod focus;
pub mod gesture;
pub mod pointer;
pub mod source;

pub use config::Config;
pub use dispatch::{Engine, RunExit};
pub use error::{ConfigError, Error, Result};
