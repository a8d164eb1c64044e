//! Semantic interpretation of validated response payloads.
//!
//! Payload semantics are only partially reverse-engineered. The decoder maps
//! the byte offsets whose meaning is empirically confirmed and reports
//! everything else as unavailable instead of guessing. Decoding never fails
//! on a structurally valid frame.
//!
//! Confirmed observations across captures:
//! - status-response payload starts with a constant `0xF2` header echo;
//! - the payload tail is a constant `0xE2 0x06` pair;
//! - a cluster of `0x3E`-family bytes (`0x3E`/`0x3A`, high nibble `0x3`)
//!   sits mid-payload and varies with position, behaving like position
//!   feedback.

use crate::protocol::parser::{ResponseClass, ResponseFrame};

/// Header echo byte observed as the first payload octet of every capture.
const HEADER_ECHO: u8 = 0xF2;
/// Constant tail pair observed at the end of every captured payload.
const TAIL_ACK: [u8; 2] = [0xE2, 0x06];
/// A byte belongs to the position-feedback family when its high nibble is 3.
const FAMILY_MASK: u8 = 0xF0;
const FAMILY_VALUE: u8 = 0x30;
/// The repeated value counted as the position indicator.
const POSITION_BYTE: u8 = 0x3E;

/// A named status flag: confirmed set, confirmed clear, or not decodable
/// from the current protocol knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Set,
    Clear,
    Unavailable,
}

impl Flag {
    fn from_bool(v: bool) -> Self {
        if v {
            Flag::Set
        } else {
            Flag::Clear
        }
    }
}

/// Status flags extracted from a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    /// First payload byte matches the constant header echo.
    pub header_echo: Flag,
    /// Payload ends with the constant `0xE2 0x06` acknowledge pair.
    pub tail_ack: Flag,
    /// Motion-in-progress. No byte has been tied to this yet.
    pub moving: Flag,
}

/// Best-effort position feedback derived from the `0x3E`-family cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionFeedback {
    /// The cluster was present; `indicator` counts the exact `0x3E` bytes
    /// and `cluster` holds the raw family bytes for later analysis.
    Indicator { indicator: u8, cluster: Vec<u8> },
    /// No family bytes in the payload; not confidently decodable.
    Unavailable,
}

/// Semantic result of decoding one response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReport {
    pub class: ResponseClass,
    pub flags: StatusFlags,
    pub position: PositionFeedback,
}

/// Maps validated payloads to `FeedbackReport`s.
#[derive(Debug, Clone, Default)]
pub struct FeedbackDecoder;

impl FeedbackDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a validated frame. Infallible by design: unknown offsets are
    /// reported as unavailable rather than rejected.
    pub fn decode(&self, frame: &ResponseFrame) -> FeedbackReport {
        let payload = frame.payload();

        let flags = match frame.class() {
            ResponseClass::Status => StatusFlags {
                header_echo: Flag::from_bool(payload.first() == Some(&HEADER_ECHO)),
                tail_ack: Flag::from_bool(payload.ends_with(&TAIL_ACK)),
                moving: Flag::Unavailable,
            },
            // Movement-response payloads are entirely unmapped so far.
            ResponseClass::Movement => StatusFlags {
                header_echo: Flag::from_bool(payload.first() == Some(&HEADER_ECHO)),
                tail_ack: Flag::Unavailable,
                moving: Flag::Unavailable,
            },
        };

        let cluster: Vec<u8> = payload
            .iter()
            .copied()
            .filter(|&b| b & FAMILY_MASK == FAMILY_VALUE)
            .collect();

        let position = if cluster.is_empty() {
            PositionFeedback::Unavailable
        } else {
            let indicator = cluster.iter().filter(|&&b| b == POSITION_BYTE).count() as u8;
            PositionFeedback::Indicator { indicator, cluster }
        };

        FeedbackReport {
            class: frame.class(),
            flags,
            position,
        }
    }
}
