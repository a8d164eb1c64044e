//! Serial transport adapter over tokio-serial.
//!
//! Opens the port at 9600 8N1 with no flow control (the device's fixed line
//! settings) and implements `ByteChannel` with byte-at-a-time paced writes.
//!
//! The portable serial API cannot generate a genuine stop-bit violation, so
//! bytes whose schedule requests a framing error are transmitted normally
//! and the request is logged at trace level. It equally cannot observe
//! framing errors on receive, so all inbound bytes report a clean line
//! status. Captures show the device accepts correctly framed commands, so
//! the violation appears to be tolerated rather than required.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::trace;

use crate::channel::{ByteChannel, RawByte};
use crate::error::{CommanderError, Result};
use crate::protocol::TimedByte;

/// `ByteChannel` implementation over a physical serial port.
pub struct SerialChannel {
    port: SerialStream,
}

impl SerialChannel {
    /// Open `port_path` at the given baud rate, 8N1, no flow control.
    ///
    /// # Errors
    /// Returns an I/O error when the port cannot be opened.
    pub fn open(port_path: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(port_path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CommanderError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        Ok(Self { port })
    }
}

#[async_trait]
impl ByteChannel for SerialChannel {
    async fn send(&mut self, schedule: &[TimedByte]) -> Result<()> {
        for timed in schedule {
            tokio::time::sleep(timed.delay_before).await;
            if timed.framing_error {
                trace!(byte = timed.byte, "framing violation requested; sent with normal framing");
            }
            self.port.write_all(&[timed.byte]).await?;
            self.port.flush().await?;
        }
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Vec<RawByte>> {
        let start = Instant::now();
        let mut received = Vec::new();
        let mut buf = [0u8; 64];

        loop {
            let remaining = match timeout.checked_sub(start.elapsed()) {
                Some(r) if !r.is_zero() => r,
                _ => break,
            };

            match tokio::time::timeout(remaining, self.port.read(&mut buf)).await {
                Ok(Ok(0)) => return Err(CommanderError::ChannelClosed),
                Ok(Ok(n)) => {
                    let offset = start.elapsed();
                    received.extend(buf[..n].iter().map(|&value| RawByte {
                        value,
                        offset,
                        framing_error: false,
                    }));
                }
                Ok(Err(e)) => return Err(CommanderError::Io(e)),
                // Window elapsed; return whatever arrived.
                Err(_) => break,
            }
        }

        Ok(received)
    }
}
