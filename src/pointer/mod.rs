//! Pointing-device side of the engine.
//!
//! Provides:
//! - `Actuator`: the collaborator that moves the cursor and presses buttons
//! - `PointerDevice`: best-effort wrapper that owns the held-button set
//! - `sexp`: concrete actuators (command stream writer, dry-run logger)
//!
//! The held-button set is the single source of truth for what the
//! actuator believes is pressed.  It is shared between the frame path and
//! the focus poller, so it sits behind one lock that is held across both
//! the bookkeeping change and the matching actuator call.  A press and a
//! concurrent release therefore reach the actuator in the same order they
//! change the set.  Actuators must not call back into the device.

pub mod sexp;

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub use sexp::{LogActuator, SexpActuator};

// ── Buttons ────────────────────────────────────────────────

/// Pointer buttons the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Middle,
}

impl Button {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
        }
    }

    pub const ALL: [Button; 2] = [Button::Left, Button::Middle];
}

// ── Actuator collaborator ──────────────────────────────────

/// Primitive pointer operations.  Screen coordinates are pixels from the
/// top-left corner; positive scroll `dy` scrolls up.
pub trait Actuator: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()>;
    fn move_by(&self, dx: i32, dy: i32) -> anyhow::Result<()>;
    fn press(&self, button: Button) -> anyhow::Result<()>;
    fn release(&self, button: Button) -> anyhow::Result<()>;
    fn click(&self, button: Button, count: u32) -> anyhow::Result<()>;
    fn scroll(&self, dx: i32, dy: i32) -> anyhow::Result<()>;
}

// ── Held buttons ───────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
struct HeldSet {
    left: bool,
    middle: bool,
}

impl HeldSet {
    fn slot(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Left => &mut self.left,
            Button::Middle => &mut self.middle,
        }
    }

    fn get(&self, button: Button) -> bool {
        match button {
            Button::Left => self.left,
            Button::Middle => self.middle,
        }
    }
}

/// Buttons currently held down.
#[derive(Debug, Default)]
pub struct HeldButtons {
    set: Mutex<HeldSet>,
}

impl HeldButtons {
    pub fn is_held(&self, button: Button) -> bool {
        self.set.lock().get(button)
    }

    pub fn any(&self) -> bool {
        let set = *self.set.lock();
        Button::ALL.iter().any(|b| set.get(*b))
    }

    fn lock(&self) -> MutexGuard<'_, HeldSet> {
        self.set.lock()
    }
}

// ── Pointer device ─────────────────────────────────────────

/// Actuator plus held-button bookkeeping.
///
/// Every call is best effort: actuator failures are logged and dropped.
pub struct PointerDevice {
    actuator: Arc<dyn Actuator>,
    held: HeldButtons,
}

impl PointerDevice {
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self {
            actuator,
            held: HeldButtons::default(),
        }
    }

    pub fn held(&self) -> &HeldButtons {
        &self.held
    }

    pub fn move_to(&self, x: i32, y: i32) {
        best_effort("move_to", self.actuator.move_to(x, y));
    }

    pub fn move_by(&self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        best_effort("move_by", self.actuator.move_by(dx, dy));
    }

    pub fn click(&self, button: Button, count: u32) {
        best_effort("click", self.actuator.click(button, count));
    }

    pub fn scroll(&self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        best_effort("scroll", self.actuator.scroll(dx, dy));
    }

    /// Press and hold.  No-op if already held.
    pub fn press(&self, button: Button) {
        let mut held = self.held.lock();
        if held.get(button) {
            return;
        }
        match self.actuator.press(button) {
            Ok(()) => *held.slot(button) = true,
            Err(e) => warn!("actuator press({}) failed: {:#}", button.as_str(), e),
        }
    }

    /// Release a held button.  No-op if not held.
    pub fn release(&self, button: Button) {
        let mut held = self.held.lock();
        if std::mem::take(held.slot(button)) {
            best_effort("release", self.actuator.release(button));
        }
    }

    /// Release every held button.  Returns how many were released.
    pub fn release_all(&self) -> usize {
        let mut held = self.held.lock();
        let mut released = 0;
        for button in Button::ALL {
            if std::mem::take(held.slot(button)) {
                best_effort("release", self.actuator.release(button));
                released += 1;
            }
        }
        drop(held);
        if released > 0 {
            debug!("Released {} held button(s)", released);
        }
        released
    }

    /// Held buttons as an s-expression list, e.g. `(:left)` or `nil`.
    pub fn held_sexp(&self) -> String {
        let set = *self.held.lock();
        let held: Vec<String> = Button::ALL
            .iter()
            .filter(|b| set.get(**b))
            .map(|b| format!(":{}", b.as_str()))
            .collect();
        if held.is_empty() {
            "nil".to_string()
        } else {
            format!("({})", held.join(" "))
        }
    }
}

fn best_effort(op: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        warn!("actuator {} failed: {:#}", op, e);
    }
}

// ── Test double ────────────────────────────────────────────

#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

/// One recorded actuator call.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MoveTo(i32, i32),
    MoveBy(i32, i32),
    Press(Button),
    Release(Button),
    Click(Button, u32),
    Scroll(i32, i32),
}

/// Actuator that records every call.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub calls: Mutex<Vec<Call>>,
    /// When set, `press` fails.
    pub fail_press: AtomicBool,
}

#[cfg(test)]
impl RecordingActuator {
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    fn push(&self, call: Call) -> anyhow::Result<()> {
        self.calls.lock().push(call);
        Ok(())
    }
}

#[cfg(test)]
impl Actuator for RecordingActuator {
    fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.push(Call::MoveTo(x, y))
    }
    fn move_by(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.push(Call::MoveBy(dx, dy))
    }
    fn press(&self, button: Button) -> anyhow::Result<()> {
        if self.fail_press.load(Ordering::SeqCst) {
            anyhow::bail!("press rejected");
        }
        self.push(Call::Press(button))
    }
    fn release(&self, button: Button) -> anyhow::Result<()> {
        self.push(Call::Release(button))
    }
    fn click(&self, button: Button, count: u32) -> anyhow::Result<()> {
        self.push(Call::Click(button, count))
    }
    fn scroll(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.push(Call::Scroll(dx, dy))
    }
}

/// Pointer device over a fresh recorder.
#[cfg(test)]
pub fn make_device() -> (Arc<RecordingActuator>, PointerDevice) {
    let recorder = Arc::new(RecordingActuator::default());
    let device = PointerDevice::new(recorder.clone());
    (recorder, device)
}

// ── Tests ──────────────────────────────────────────────────
