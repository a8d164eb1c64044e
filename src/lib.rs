//! # OE10 Commander Core Library
//!
//! This crate re-implements the proprietary binary serial protocol of the
//! OE10 pan/tilt motor unit, reverse-engineered from logic-analyzer
//! captures. It encapsulates the protocol codec, the timing-accurate
//! transceiver schedule, and the polling/command session state machine. By
//! organizing the project as a library, the same core drives the CLI binary,
//! hardware runs, and fully simulated test sessions.
//!
//! ## Crate Structure
//!
//! - **`protocol`**: the codec — `FrameBuilder` (outbound frames with
//!   intentional framing-error positions), `TimingModel` (byte pacing),
//!   `ResponseParser` (marker scanning and sync validation), and
//!   `FeedbackDecoder` (best-effort payload semantics).
//! - **`channel`**: the abstract `ByteChannel` the session talks to, with a
//!   tokio-serial implementation for real hardware and a scripted mock for
//!   tests and simulation.
//! - **`session`**: the `SessionController` state machine orchestrating
//!   polls, movement commands, response windows, and the retry/fault policy.
//! - **`capture`**: logic-analyzer CSV ingestion and sequence analysis used
//!   when extending the reverse-engineered command set.
//! - **`config`**: layered TOML + environment configuration (figment).
//! - **`error`**: the central `CommanderError` enum.
//! - **`telemetry`**: tracing subscriber setup for the binary.

pub mod capture;
pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod telemetry;

pub use channel::{ByteChannel, MockChannel, RawByte};
#[cfg(feature = "hardware")]
pub use channel::SerialChannel;
pub use config::Config;
pub use error::{CommanderError, Result};
pub use protocol::{
    CommandFrame, CommandKind, FeedbackDecoder, FeedbackReport, FrameBuilder, ResponseFrame,
    ResponseParser, TimedByte, TimingModel,
};
pub use session::{SessionConfig, SessionController, SessionState, StopHandle};
