//! OE10 Pan/Tilt Serial Protocol
//!
//! Reference: logic-analyzer captures of the factory controller
//!
//! Protocol Overview:
//! - Format: binary, marker-delimited frames over RS-232
//! - Baud: 9600, 8N1, no flow control
//! - TX frames: `0x58` start, sync `0x8B` repeated at fixed offsets, `0x00` end
//! - RX frames: `0x98` start, sync `0x16` repeated at fixed offsets, `0x00` end
//! - Lengths: 15 B status/init commands, 18 B movement commands;
//!   25 B status/init responses, 18 B movement responses
//! - Start and end bytes of every frame are transmitted with a deliberate
//!   framing violation (stop-bit error), believed to be part of device
//!   synchronization
//!
//! No checksum has been confirmed; several payload bytes remain opaque.

pub mod feedback;
pub mod frame;
pub mod parser;
pub mod timing;

pub use feedback::{FeedbackDecoder, FeedbackReport, Flag, PositionFeedback, StatusFlags};
pub use frame::{CommandFrame, CommandKind, FrameBuilder};
pub use parser::{ResponseClass, ResponseFrame, ResponseParser};
pub use timing::{TimedByte, TimingModel};

/// Start marker of every outbound (controller → device) frame.
pub const TX_START: u8 = 0x58;
/// Sync byte repeated at fixed offsets in outbound frames.
pub const TX_SYNC: u8 = 0x8B;
/// Start marker of every inbound (device → controller) frame.
pub const RX_START: u8 = 0x98;
/// Sync byte repeated at fixed offsets in inbound frames.
pub const RX_SYNC: u8 = 0x16;
/// End marker shared by both directions.
pub const END_MARKER: u8 = 0x00;

/// Length of status-query and init command frames.
pub const TX_LEN_STATUS: usize = 15;
/// Length of movement command frames.
pub const TX_LEN_MOVEMENT: usize = 18;
/// Length of status-query and init response frames.
pub const RX_LEN_STATUS: usize = 25;
/// Length of movement response frames.
pub const RX_LEN_MOVEMENT: usize = 18;

/// Upper bound on a response frame; guards scanning of unterminated streams.
pub const RX_MAX_LEN: usize = 32;
