//! Custom error types for the commander.
//!
//! This module defines the primary error type, `CommanderError`, for the
//! entire crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to classify failures, from caller mistakes to transport
//! conditions.
//!
//! ## Error taxonomy
//!
//! - **`UnsupportedAngle`**: the caller requested a movement angle with no
//!   known byte encoding. Surfaced synchronously at the call site and never
//!   retried, since it is a programming error rather than a line condition.
//! - **`NoStartMarker`** / **`MalformedLength`** / **`SyncMismatch`**:
//!   parse-level failures on received bytes. The session folds these into
//!   the timeout/retry path so that transient line noise is tolerated
//!   identically to a missing response.
//! - **`ResponseTimeout`**: no valid frame arrived inside the wait window.
//!   Feeds the consecutive-failure counter.
//! - **`SessionFault`**: the retry threshold was exceeded. Terminal until an
//!   explicit reset; indicates persistent loss of device communication.
//! - **`ChannelClosed`** / **`Io`**: transport-level breakage.
//! - **`Config`** / **`Capture`**: ambient configuration and capture-file
//!   ingestion failures.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, CommanderError>;

#[derive(Error, Debug)]
pub enum CommanderError {
    #[error("no known byte encoding for angle {0}° (nearest calibration sample is {1}° away)")]
    UnsupportedAngle(f64, f64),

    #[error("movement command requires an angle")]
    MovementAngleRequired,

    #[error("no response start marker (0x98) in {0} scanned bytes")]
    NoStartMarker(usize),

    #[error("response length {0} matches no known template (expected 25 or 18)")]
    MalformedLength(usize),

    #[error("sync byte mismatch at offset {offset}: expected 0x16, found {found:#04x}")]
    SyncMismatch { offset: usize, found: u8 },

    #[error("no valid response within {0:?}")]
    ResponseTimeout(std::time::Duration),

    #[error("session faulted after {0} consecutive failed exchanges; reset required")]
    SessionFault(u32),

    #[error("byte channel closed")]
    ChannelClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("capture file error: {0}")]
    Capture(String),
}

impl CommanderError {
    /// Whether the session should treat this failure like a missed response
    /// (retryable) rather than escalate it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommanderError::NoStartMarker(_)
                | CommanderError::MalformedLength(_)
                | CommanderError::SyncMismatch { .. }
                | CommanderError::ResponseTimeout(_)
        )
    }
}
