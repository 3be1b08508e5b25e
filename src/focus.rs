//! Focus gating: only drive the pointer while a target application is
//! frontmost.
//!
//! A background thread polls the focus collaborator on a fixed period and
//! publishes a single "target active" flag.  On the edge from active to
//! inactive it releases every held button itself and raises a one-shot
//! reset request that the frame path consumes before its next frame.

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::pointer::PointerDevice;

/// Default poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ── Focus collaborator ─────────────────────────────────────

/// Reports the name of the application that currently has input focus.
pub trait FocusProbe: Send {
    fn frontmost_app_name(&mut self) -> anyhow::Result<Option<String>>;
}

/// Runs a shell command and reads the frontmost application name from its
/// standard output.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    pub command: String,
}

impl CommandProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Platform default: System Events on macOS, xdotool elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new(
                "osascript -e 'tell application \"System Events\" to get name of \
                 first application process whose frontmost is true'",
            )
        } else {
            Self::new("xdotool getactivewindow getwindowname")
        }
    }
}

impl FocusProbe for CommandProbe {
    fn frontmost_app_name(&mut self) -> anyhow::Result<Option<String>> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("failed to run focus command `{}`", self.command))?;
        if !output.status.success() {
            anyhow::bail!("focus command exited with {}", output.status);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }
}

// ── Shared flag ────────────────────────────────────────────

/// State shared between the poller and the frame path.
#[derive(Debug, Default)]
pub struct FocusFlag {
    active: AtomicBool,
    reset_requested: AtomicBool,
}

impl FocusFlag {
    /// Whether the target application was frontmost at the last poll.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Consume the one-shot reset request raised on focus loss.
    pub fn take_reset_request(&self) -> bool {
        self.reset_requested.swap(false, Ordering::SeqCst)
    }

    /// Publish a focus state.  Returns `true` on an active-to-inactive edge.
    pub fn set_active(&self, active: bool) -> bool {
        let was_active = self.active.swap(active, Ordering::SeqCst);
        if was_active && !active {
            self.reset_requested.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }
}

/// Case-insensitive full-name comparison.
pub fn matches_target(frontmost: Option<&str>, target: &str) -> bool {
    frontmost.is_some_and(|name| name.to_lowercase() == target.to_lowercase())
}

/// Poll the probe once and apply the result.
///
/// A failing probe leaves the previous state in place.
pub fn poll_once(
    probe: &mut dyn FocusProbe,
    target: &str,
    flag: &FocusFlag,
    pointer: &PointerDevice,
) {
    let frontmost = match probe.frontmost_app_name() {
        Ok(name) => name,
        Err(e) => {
            warn!("focus query failed: {:#}", e);
            return;
        }
    };

    let active = matches_target(frontmost.as_deref(), target);
    let was_active = flag.is_active();
    if flag.set_active(active) {
        let released = pointer.release_all();
        info!(
            "[Focus lost to {}] tracking paused, released {} button(s)",
            frontmost.as_deref().unwrap_or("unknown"),
            released
        );
    } else if active && !was_active {
        info!("[Focus on {}] tracking resumed", target);
    }
}

// ── Poller ─────────────────────────────────────────────────

/// Background focus poller.  Stops and joins on drop.
pub struct FocusGate {
    flag: Arc<FocusFlag>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FocusGate {
    /// Poll once synchronously, then keep polling every `interval` on a
    /// dedicated thread.
    pub fn spawn(
        mut probe: Box<dyn FocusProbe>,
        target: String,
        interval: Duration,
        pointer: Arc<PointerDevice>,
    ) -> std::io::Result<Self> {
        let flag = Arc::new(FocusFlag::default());
        let stop = Arc::new(AtomicBool::new(false));

        poll_once(probe.as_mut(), &target, &flag, &pointer);
        if !flag.is_active() {
            info!("Waiting for {} to take focus", target);
        }

        let handle = {
            let flag = flag.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("focus-poll".to_string())
                .spawn(move || {
                    debug!("Focus poller started ({}ms)", interval.as_millis());
                    while !stop.load(Ordering::SeqCst) {
                        thread::sleep(interval);
                        poll_once(probe.as_mut(), &target, &flag, &pointer);
                    }
                    debug!("Focus poller stopped");
                })?
        };

        Ok(Self {
            flag,
            stop,
            handle: Some(handle),
        })
    }

    pub fn flag(&self) -> Arc<FocusFlag> {
        self.flag.clone()
    }

    /// Stop polling and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("focus poller panicked");
            }
        }
    }
}

impl Drop for FocusGate {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
use crate::pointer::{make_device, Button, Call};

/// Probe that replays a scripted sequence, repeating the last entry.
#[cfg(test)]
struct ScriptedProbe {
    script: Vec<anyhow::Result<Option<String>>>,
}

#[cfg(test)]
impl ScriptedProbe {
    fn new(names: &[Option<&str>]) -> Self {
        Self {
            script: names
                .iter()
                .rev()
                .map(|n| Ok(n.map(str::to_string)))
                .collect(),
        }
    }
}

#[cfg(test)]
impl FocusProbe for ScriptedProbe {
    fn frontmost_app_name(&mut self) -> anyhow::Result<Option<String>> {
        if self.script.len() > 1 {
            return self.script.pop().unwrap_or(Ok(None));
        }
        match self.script.last() {
            Some(Ok(name)) => Ok(name.clone()),
            Some(Err(e)) => Err(anyhow::anyhow!("{}", e)),
            None => Ok(None),
        }
    }
}
