//! Scripted mock channel.
//!
//! Stands in for the serial transport in tests and in `--simulate` runs.
//! Responses are scripted per exchange; once the script runs out, an
//! optional default response keeps a simulated device answering forever.
//! Sent schedules are recorded so tests can assert on exact bytes, delays,
//! and framing-error flags.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;

use crate::channel::{ByteChannel, RawByte};
use crate::error::Result;
use crate::protocol::TimedByte;

/// Captured status response replayed by the simulated device.
pub const SIMULATED_STATUS_RESPONSE: [u8; 25] = [
    0x98, 0x16, 0xF2, 0x16, 0xCA, 0x16, 0xE6, 0x16, 0xB2, 0xAE, 0x9E, 0xFE, 0xFE, 0x3E, 0x3A,
    0x3E, 0x3E, 0x3E, 0x3E, 0x16, 0xA2, 0x16, 0xE2, 0x06, 0x00,
];

/// One scripted receive-window outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// These bytes arrive, paced 1 ms apart, clean line status.
    Bytes(Vec<u8>),
    /// The device stays silent for the whole window.
    Silence,
}

/// In-memory channel with scripted responses and full TX recording.
#[derive(Debug, Default)]
pub struct MockChannel {
    script: VecDeque<Scripted>,
    default_response: Option<Vec<u8>>,
    sent: Vec<Vec<TimedByte>>,
    /// When true, sleeps are actually performed (virtual time in tests).
    pace: bool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that answers every exchange with the captured status
    /// response. Used by `--simulate`.
    pub fn simulated_device() -> Self {
        Self {
            default_response: Some(SIMULATED_STATUS_RESPONSE.to_vec()),
            ..Self::default()
        }
    }

    /// Queue a response for the next unscripted exchange.
    pub fn push_response(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.script.push_back(Scripted::Bytes(bytes.into()));
        self
    }

    /// Queue a silent (no response) exchange.
    pub fn push_silence(&mut self) -> &mut Self {
        self.script.push_back(Scripted::Silence);
        self
    }

    /// Honor schedule delays and timeouts with real `tokio::time` sleeps.
    /// Combine with `tokio::time::pause()` for instant virtual time.
    pub fn with_pacing(mut self) -> Self {
        self.pace = true;
        self
    }

    /// All schedules sent so far, in order.
    pub fn sent(&self) -> &[Vec<TimedByte>] {
        &self.sent
    }

    /// Data bytes of the most recently sent frame.
    pub fn last_sent_bytes(&self) -> Option<Vec<u8>> {
        self.sent.last().map(|s| s.iter().map(|t| t.byte).collect())
    }
}

#[async_trait]
impl ByteChannel for MockChannel {
    async fn send(&mut self, schedule: &[TimedByte]) -> Result<()> {
        if self.pace {
            let total: Duration = schedule.iter().map(|t| t.delay_before).sum();
            tokio::time::sleep(total).await;
        }
        self.sent.push(schedule.to_vec());
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Vec<RawByte>> {
        let outcome = self.script.pop_front().unwrap_or_else(|| {
            match &self.default_response {
                Some(bytes) => Scripted::Bytes(bytes.clone()),
                None => Scripted::Silence,
            }
        });

        match outcome {
            Scripted::Bytes(bytes) => {
                if self.pace {
                    // Device answers well inside the window; model the
                    // observed ~37 ms command-to-response delay.
                    tokio::time::sleep(Duration::from_millis(37).min(timeout)).await;
                }
                Ok(bytes
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| RawByte {
                        value,
                        offset: Duration::from_millis(i as u64),
                        // The device sends its markers with the same
                        // intentional violation the controller uses.
                        framing_error: i == 0 || i == bytes.len() - 1,
                    })
                    .collect())
            }
            Scripted::Silence => {
                if self.pace {
                    tokio::time::sleep(timeout).await;
                }
                Ok(Vec::new())
            }
        }
    }
}
