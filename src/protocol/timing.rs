//! Transmission timing model.
//!
//! Captured transmissions show the factory controller pacing bytes much
//! slower than the line rate allows: ~1.7 ms before the start byte and ~1 ms
//! before every subsequent byte. The device has been observed to silently
//! drop frames sent back-to-back, so the schedule is reproduced exactly.

use std::time::Duration;

use crate::protocol::frame::CommandFrame;

/// Delay before the first byte of a frame.
pub const PRE_DELAY: Duration = Duration::from_micros(1700);
/// Delay before every byte after the first.
pub const INTER_BYTE_DELAY: Duration = Duration::from_micros(1000);

/// One octet of a scheduled transmission: the delay to wait before sending
/// it and whether it must go out with a deliberate framing violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedByte {
    pub byte: u8,
    pub delay_before: Duration,
    pub framing_error: bool,
}

/// Maps a built frame onto the observed byte-pacing schedule.
#[derive(Debug, Clone)]
pub struct TimingModel {
    pre_delay: Duration,
    inter_byte_delay: Duration,
}

impl Default for TimingModel {
    fn default() -> Self {
        Self {
            pre_delay: PRE_DELAY,
            inter_byte_delay: INTER_BYTE_DELAY,
        }
    }
}

impl TimingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the capture-derived delays, e.g. from configuration.
    pub fn with_delays(pre_delay: Duration, inter_byte_delay: Duration) -> Self {
        Self {
            pre_delay,
            inter_byte_delay,
        }
    }

    /// Produce the transmit schedule for `frame`. Pure transformation,
    /// never fails.
    pub fn schedule(&self, frame: &CommandFrame) -> Vec<TimedByte> {
        frame
            .as_bytes()
            .iter()
            .enumerate()
            .map(|(i, &byte)| TimedByte {
                byte,
                delay_before: if i == 0 {
                    self.pre_delay
                } else {
                    self.inter_byte_delay
                },
                framing_error: frame.framing_error_at(i),
            })
            .collect()
    }

    /// Total wall-clock duration of transmitting a frame of `len` bytes.
    ///
    /// Used by the session to size its post-send idle period before it
    /// starts listening for the response.
    pub fn frame_duration(&self, len: usize) -> Duration {
        if len == 0 {
            return Duration::ZERO;
        }
        self.pre_delay + self.inter_byte_delay * (len as u32 - 1)
    }
}
