//! Tracking source: JSON frame stream decoding.
//!
//! The tracking service speaks one JSON object per message.  Frame
//! messages carry a microsecond `timestamp` and a `hands` array; a message
//! with `serviceVersion` announces the connection.  Everything else is
//! ignored.  Messages arrive one per line on a reader (stdin or a file fed
//! by a WebSocket bridge).
//!
//! [`FrameFeed`] moves the blocking reads onto their own thread so the
//! consumer can wait with a timeout.

use std::io::{self, BufRead};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::gesture::{Frame, Hand, HandSample};

/// Thumb and index tip distance (mm) at which derived pinch is full.
const PINCH_CLOSED_MM: f32 = 20.0;
/// Distance range (mm) over which derived pinch falls from 1 to 0.
const PINCH_SPAN_MM: f32 = 60.0;

const POINTABLE_THUMB: i64 = 0;
const POINTABLE_INDEX: i64 = 1;

// ── Wire format ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    service_version: Option<serde_json::Value>,
    /// Microseconds.
    timestamp: Option<f64>,
    hands: Option<Vec<WireHand>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireHand {
    #[serde(rename = "type")]
    kind: String,
    palm_position: [f32; 3],
    pinch_strength: Option<f32>,
    grab_strength: Option<f32>,
    #[serde(default)]
    pointables: Vec<WirePointable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePointable {
    #[serde(rename = "type")]
    kind: Option<i64>,
    tip_position: Option<[f32; 3]>,
}

// ── Decoded messages ───────────────────────────────────────

/// One decoded tracking message.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMessage {
    Frame(Frame),
    /// Service handshake.  Logged only.
    Connected { version: String },
    /// Anything that is neither a frame nor a handshake.
    Other,
}

/// Decode one message.  `fallback_s` is used as the frame time when the
/// message has no timestamp.
pub fn decode_message(text: &str, fallback_s: f64) -> Result<SourceMessage> {
    let msg: WireMessage = serde_json::from_str(text)?;

    if let Some(version) = msg.service_version {
        let version = match version {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return Ok(SourceMessage::Connected { version });
    }

    let Some(hands) = msg.hands else {
        return Ok(SourceMessage::Other);
    };

    let timestamp_s = msg.timestamp.map_or(fallback_s, |us| us / 1_000_000.0);
    let tagged = hands.into_iter().filter_map(|hand| {
        let Some(tag) = Hand::parse(&hand.kind) else {
            debug!("ignoring hand with unknown type {:?}", hand.kind);
            return None;
        };
        let pinch = hand
            .pinch_strength
            .unwrap_or_else(|| pinch_from_pointables(&hand.pointables));
        let grab = hand.grab_strength.unwrap_or(0.0);
        Some((tag, HandSample::new(hand.palm_position, grab, pinch)))
    });
    Ok(SourceMessage::Frame(Frame::from_hands(timestamp_s, tagged)))
}

/// Pinch strength from the thumb to index tip distance, for services that
/// do not report it.  Zero when either tip is missing.
fn pinch_from_pointables(pointables: &[WirePointable]) -> f32 {
    let tip = |kind| {
        pointables
            .iter()
            .find(|p| p.kind == Some(kind))
            .and_then(|p| p.tip_position)
    };
    let (Some(thumb), Some(index)) = (tip(POINTABLE_THUMB), tip(POINTABLE_INDEX)) else {
        return 0.0;
    };
    let dx = thumb[0] - index[0];
    let dy = thumb[1] - index[1];
    let dz = thumb[2] - index[2];
    let distance = (dx * dx + dy * dy + dz * dz).sqrt();
    (1.0 - (distance - PINCH_CLOSED_MM) / PINCH_SPAN_MM).clamp(0.0, 1.0)
}

// ── Line reader ────────────────────────────────────────────

/// Reads frames from a line-delimited JSON stream.
///
/// Malformed lines are logged and skipped.  I/O errors are returned.
pub struct FrameReader<R> {
    reader: R,
    started: Instant,
    buf: String,
    line_no: u64,
    skipped: u64,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            started: Instant::now(),
            buf: String::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines skipped as malformed so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                info!("[Disconnected] tracking stream ended after {} lines", self.line_no);
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let fallback_s = self.started.elapsed().as_secs_f64();
            match decode_message(line, fallback_s) {
                Ok(SourceMessage::Frame(frame)) => return Ok(Some(frame)),
                Ok(SourceMessage::Connected { version }) => {
                    info!("[Connected] tracking service v{}", version);
                }
                Ok(SourceMessage::Other) => {
                    debug!("line {}: ignoring non-frame message", self.line_no);
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!("line {}: skipping malformed message: {}", self.line_no, e);
                }
            }
        }
    }
}

// ── Reader thread ──────────────────────────────────────────

/// Frames buffered between the reader thread and the consumer.
const FEED_CAPACITY: usize = 16;

/// Result of one wait on a [`FrameFeed`].
#[derive(Debug)]
pub enum Feed {
    Frame(Frame),
    /// Nothing arrived within the timeout.
    Idle,
    /// End of stream.
    Ended,
}

/// A [`FrameReader`] running on a dedicated thread.
///
/// The thread is detached and stops once the stream ends or the feed is
/// dropped.
pub struct FrameFeed {
    rx: Receiver<Result<Frame>>,
}

impl FrameFeed {
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> io::Result<Self> {
        let (tx, rx) = sync_channel(FEED_CAPACITY);
        let mut frames = FrameReader::new(reader);
        thread::Builder::new()
            .name("frame-reader".to_string())
            .spawn(move || loop {
                let item = match frames.next_frame() {
                    Ok(Some(frame)) => Ok(frame),
                    Ok(None) => break,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if tx.send(item).is_err() || failed {
                    break;
                }
            })?;
        Ok(Self { rx })
    }

    /// Wait up to `timeout` for the next frame.
    pub fn next(&self, timeout: Duration) -> Result<Feed> {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(frame)) => Ok(Feed::Frame(frame)),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => Ok(Feed::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(Feed::Ended),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn make_reader(text: &str) -> FrameReader<std::io::Cursor<Vec<u8>>> {
    FrameReader::new(std::io::Cursor::new(text.as_bytes().to_vec()))
}

/// Reader fed by a channel; blocks until a chunk arrives or the sender
/// is dropped.
#[cfg(test)]
pub(crate) struct Stalled {
    rx: Receiver<Vec<u8>>,
    pending: std::io::Cursor<Vec<u8>>,
}

#[cfg(test)]
pub(crate) fn make_stalled(rx: Receiver<Vec<u8>>) -> Stalled {
    Stalled {
        rx,
        pending: std::io::Cursor::new(Vec::new()),
    }
}

#[cfg(test)]
impl std::io::Read for Stalled {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let n = std::io::Read::read(&mut self.pending, buf)?;
            if n > 0 {
                return Ok(n);
            }
            match self.rx.recv() {
                Ok(chunk) => self.pending = std::io::Cursor::new(chunk),
                Err(_) => return Ok(0),
            }
        }
    }
}
