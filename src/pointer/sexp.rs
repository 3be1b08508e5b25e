//! Concrete actuators.
//!
//! `SexpActuator` serializes each pointer operation as one s-expression
//! per line, for a platform helper that owns the real input device.
//! `LogActuator` only logs, for dry runs.

use std::io::Write;

use parking_lot::Mutex;
use tracing::info;

use super::{Actuator, Button};

// ── Command stream ─────────────────────────────────────────

/// Writes pointer commands as s-expressions, one per line.
pub struct SexpActuator<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> SexpActuator<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume the actuator and return the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, command: String) -> anyhow::Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}", command)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Actuator for SexpActuator<W> {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.emit(format!("(:pointer :move-to :x {} :y {})", x, y))
    }

    fn move_by(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.emit(format!("(:pointer :move-by :dx {} :dy {})", dx, dy))
    }

    fn press(&self, button: Button) -> anyhow::Result<()> {
        self.emit(format!("(:pointer :press :button :{})", button.as_str()))
    }

    fn release(&self, button: Button) -> anyhow::Result<()> {
        self.emit(format!("(:pointer :release :button :{})", button.as_str()))
    }

    fn click(&self, button: Button, count: u32) -> anyhow::Result<()> {
        self.emit(format!(
            "(:pointer :click :button :{} :count {})",
            button.as_str(),
            count
        ))
    }

    fn scroll(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.emit(format!("(:pointer :scroll :dx {} :dy {})", dx, dy))
    }
}

// ── Dry run ────────────────────────────────────────────────

/// Logs pointer commands instead of performing them.  Cursor motion is
/// logged at trace level to keep the output readable.
#[derive(Debug, Default)]
pub struct LogActuator;

impl Actuator for LogActuator {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        tracing::trace!("move-to {} {}", x, y);
        Ok(())
    }

    fn move_by(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        tracing::trace!("move-by {} {}", dx, dy);
        Ok(())
    }

    fn press(&self, button: Button) -> anyhow::Result<()> {
        info!("press {}", button.as_str());
        Ok(())
    }

    fn release(&self, button: Button) -> anyhow::Result<()> {
        info!("release {}", button.as_str());
        Ok(())
    }

    fn click(&self, button: Button, count: u32) -> anyhow::Result<()> {
        info!("click {} x{}", button.as_str(), count);
        Ok(())
    }

    fn scroll(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        info!("scroll {} {}", dx, dy);
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────
