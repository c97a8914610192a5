//! Pitch events delivered to the host

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

/// A detected pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEvent {
    /// Fundamental frequency in Hz
    pub pitch: f32,
    /// Arrival index of the frame block the pitch was computed from
    pub sequence: u64,
}

impl PitchEvent {
    /// Render as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Consumer end of a session's pitch event stream
///
/// Several handles may exist; each event is delivered to exactly one of them.
/// Once the session's workers have shut down, `recv` drains what is left and
/// then returns `None`.
#[derive(Debug, Clone)]
pub struct PitchEvents {
    rx: Receiver<PitchEvent>,
}

impl PitchEvents {
    pub(crate) fn new(rx: Receiver<PitchEvent>) -> Self {
        Self { rx }
    }

    /// Block until the next event
    pub fn recv(&self) -> Option<PitchEvent> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<PitchEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PitchEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocking iterator over events, ending when the session shuts down
    pub fn iter(&self) -> impl Iterator<Item = PitchEvent> + '_ {
        self.rx.iter()
    }

    /// Events waiting to be received
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
