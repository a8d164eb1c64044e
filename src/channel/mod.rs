//! Abstract byte channel between the session and the transport.
//!
//! The core never touches a serial port directly. It talks to a
//! `ByteChannel`: something that can push raw octets onto the line honoring
//! a per-byte delay schedule, and report received octets with arrival
//! timestamps and, when the transport can observe them, per-byte
//! framing-error flags (a real UART surfaces these as line status, not
//! data).
//!
//! One channel is exclusively owned by one session at a time; all methods
//! take `&mut self` so no further locking is needed.

#[cfg(feature = "hardware")]
pub mod serial;

pub mod mock;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::TimedByte;

pub use mock::MockChannel;
#[cfg(feature = "hardware")]
pub use serial::SerialChannel;

/// One received octet with its line-status context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawByte {
    /// The data value.
    pub value: u8,
    /// Arrival time relative to the start of the receive window.
    pub offset: Duration,
    /// True when the transport flagged a framing violation for this byte.
    /// Transports that cannot observe line errors always report false.
    pub framing_error: bool,
}

impl RawByte {
    /// A byte with no line-error flag, `offset_us` microseconds into the
    /// receive window.
    pub fn clean(value: u8, offset_us: u64) -> Self {
        Self {
            value,
            offset: Duration::from_micros(offset_us),
            framing_error: false,
        }
    }
}

/// Strip line-status context, keeping the data values in arrival order.
pub fn byte_values(raw: &[RawByte]) -> Vec<u8> {
    raw.iter().map(|b| b.value).collect()
}

/// Transport abstraction: send scheduled bytes, receive timestamped bytes.
#[async_trait]
pub trait ByteChannel: Send {
    /// Transmit `schedule` in order, honoring each byte's `delay_before`.
    ///
    /// A transmission that has started is always completed; cancellation is
    /// the caller's concern and takes effect between frames.
    async fn send(&mut self, schedule: &[TimedByte]) -> Result<()>;

    /// Collect bytes from the line for up to `timeout`.
    ///
    /// Returns whatever arrived (possibly nothing); an empty result is not
    /// an error at this layer. Fails only on transport breakage.
    async fn receive(&mut self, timeout: Duration) -> Result<Vec<RawByte>>;
}

#[async_trait]
impl ByteChannel for Box<dyn ByteChannel> {
    async fn send(&mut self, schedule: &[TimedByte]) -> Result<()> {
        (**self).send(schedule).await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Vec<RawByte>> {
        (**self).receive(timeout).await
    }
}
