//! Outbound command frame construction.
//!
//! Frames are built from a template table holding the exact byte sequences
//! observed in captures. The angle→bytes relationship of movement commands
//! was never established analytically, so movement frames come from a
//! calibration table of captured samples: the builder selects the nearest
//! sample and refuses (rather than invents) anything outside a small
//! tolerance around the known angles.

use crate::error::{CommanderError, Result};
use crate::protocol::{END_MARKER, TX_START};

/// Status-query command, 15 bytes. Byte-for-byte from capture.
const STATUS_QUERY_TEMPLATE: [u8; 15] = [
    0x58, 0x8B, 0xFD, 0x8B, 0xF9, 0x8B, 0x7D, 0x59, 0x8B, 0x8B, 0xD9, 0x8B, 0x71, 0x83, 0x00,
];

/// Second initialization command, 15 bytes. Differs from the status query
/// only in the four payload bytes at offsets 6, 7, 10 (0x59 0x57 / 0xF3).
const INIT_TEMPLATE: [u8; 15] = [
    0x58, 0x8B, 0xFD, 0x8B, 0xF9, 0x8B, 0x59, 0x57, 0x8B, 0x8B, 0xF3, 0x8B, 0x71, 0x83, 0x00,
];

/// Movement calibration table: (angle in degrees, captured 18-byte frame).
/// Angles not near a table entry have no known encoding.
const MOVEMENT_SAMPLES: &[(f64, [u8; 18])] = &[(
    10.0,
    [
        0x58, 0x8B, 0xFD, 0x8B, 0xF3, 0x8B, 0x5F, 0x5F, 0x8B, 0x9D, 0x8F, 0x9F, 0x8B, 0x85, 0x8B,
        0x71, 0x83, 0x00,
    ],
)];

/// Maximum distance (degrees) from a calibration sample for which the
/// sample's frame is still considered a valid encoding of the request.
const ANGLE_TOLERANCE_DEG: f64 = 0.25;

/// The three command classes the device understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Periodic status poll.
    StatusQuery,
    /// Initialization handshake command.
    Init,
    /// Tilt movement command.
    Movement,
}

/// A fully built outbound frame, immutable once constructed.
///
/// Invariants: the first octet is the TX start marker (`0x58`), the last is
/// the end marker (`0x00`), and both positions carry the intentional
/// framing-error flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    kind: CommandKind,
    bytes: Vec<u8>,
}

impl CommandFrame {
    fn from_template(kind: CommandKind, template: &[u8]) -> Self {
        debug_assert_eq!(template.first(), Some(&TX_START));
        debug_assert_eq!(template.last(), Some(&END_MARKER));
        Self {
            kind,
            bytes: template.to_vec(),
        }
    }

    /// Command class this frame encodes.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The complete on-the-wire byte sequence, markers included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the frame holds no bytes. Never the case for built frames;
    /// present to satisfy the `len` convention.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte indices that must be transmitted with an intentional framing
    /// violation: always the start and end markers.
    pub fn framing_error_positions(&self) -> [usize; 2] {
        [0, self.bytes.len() - 1]
    }

    /// Whether the byte at `index` must be sent with a framing violation.
    pub fn framing_error_at(&self, index: usize) -> bool {
        index == 0 || index == self.bytes.len() - 1
    }

    /// Payload octets: everything except the start marker, end marker, and
    /// sync bytes.
    pub fn payload(&self) -> Vec<u8> {
        self.bytes[1..self.bytes.len() - 1]
            .iter()
            .copied()
            .filter(|&b| b != crate::protocol::TX_SYNC)
            .collect()
    }
}

/// Builds outbound frames from the capture-derived template table.
///
/// Pure and deterministic; holds no channel or session state.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder;

impl FrameBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the status-query frame.
    pub fn status_query(&self) -> CommandFrame {
        CommandFrame::from_template(CommandKind::StatusQuery, &STATUS_QUERY_TEMPLATE)
    }

    /// Build the init-handshake frame.
    pub fn init(&self) -> CommandFrame {
        CommandFrame::from_template(CommandKind::Init, &INIT_TEMPLATE)
    }

    /// Build a movement frame for the requested tilt angle.
    ///
    /// # Errors
    /// Returns `UnsupportedAngle` when no calibration sample lies within
    /// tolerance of the requested angle. The builder never fabricates bytes.
    pub fn movement(&self, angle_deg: f64) -> Result<CommandFrame> {
        let (distance, template) = MOVEMENT_SAMPLES
            .iter()
            .map(|(sample_deg, template)| ((angle_deg - sample_deg).abs(), template))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .ok_or(CommanderError::UnsupportedAngle(angle_deg, f64::INFINITY))?;

        if distance > ANGLE_TOLERANCE_DEG {
            return Err(CommanderError::UnsupportedAngle(angle_deg, distance));
        }

        Ok(CommandFrame::from_template(CommandKind::Movement, template))
    }

    /// Build a frame for `kind`, where `angle_deg` is consulted only for
    /// movement commands.
    pub fn build(&self, kind: CommandKind, angle_deg: Option<f64>) -> Result<CommandFrame> {
        match kind {
            CommandKind::StatusQuery => Ok(self.status_query()),
            CommandKind::Init => Ok(self.init()),
            CommandKind::Movement => {
                let angle = angle_deg.ok_or(CommanderError::MovementAngleRequired)?;
                self.movement(angle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{TX_LEN_MOVEMENT, TX_LEN_STATUS};

    #[test]
    fn status_query_matches_capture_exactly() {
        let frame = FrameBuilder::new().status_query();
        assert_eq!(
            frame.as_bytes(),
            &[0x58, 0x8B, 0xFD, 0x8B, 0xF9, 0x8B, 0x7D, 0x59, 0x8B, 0x8B, 0xD9, 0x8B, 0x71, 0x83, 0x00]
        );
    }

    #[test]
    fn all_kinds_carry_markers_and_framing_flags() {
        let builder = FrameBuilder::new();
        let frames = [
            builder.status_query(),
            builder.init(),
            builder.movement(10.0).unwrap(),
        ];
        for frame in frames {
            assert_eq!(frame.as_bytes()[0], 0x58);
            assert_eq!(*frame.as_bytes().last().unwrap(), 0x00);
            assert_eq!(frame.framing_error_positions(), [0, frame.len() - 1]);
            assert!(frame.framing_error_at(0));
            assert!(frame.framing_error_at(frame.len() - 1));
            assert!(!frame.framing_error_at(1));
        }
    }

    #[test]
    fn frame_lengths_match_templates() {
        let builder = FrameBuilder::new();
        assert_eq!(builder.status_query().len(), TX_LEN_STATUS);
        assert_eq!(builder.init().len(), TX_LEN_STATUS);
        assert_eq!(builder.movement(10.0).unwrap().len(), TX_LEN_MOVEMENT);
    }

    #[test]
    fn movement_within_tolerance_uses_nearest_sample() {
        let builder = FrameBuilder::new();
        let exact = builder.movement(10.0).unwrap();
        let near = builder.movement(10.2).unwrap();
        assert_eq!(exact, near);
    }

    #[test]
    fn movement_outside_known_range_is_rejected() {
        let builder = FrameBuilder::new();
        match builder.movement(45.0) {
            Err(CommanderError::UnsupportedAngle(angle, _)) => assert_eq!(angle, 45.0),
            other => panic!("expected UnsupportedAngle, got {:?}", other),
        }
    }

    #[test]
    fn build_dispatches_by_kind() {
        let builder = FrameBuilder::new();
        assert_eq!(
            builder.build(CommandKind::Init, None).unwrap().kind(),
            CommandKind::Init
        );
        assert!(matches!(
            builder.build(CommandKind::Movement, None),
            Err(CommanderError::MovementAngleRequired)
        ));
        assert_eq!(
            builder
                .build(CommandKind::Movement, Some(10.0))
                .unwrap()
                .kind(),
            CommandKind::Movement
        );
    }

    #[test]
    fn payload_excludes_markers_and_sync() {
        let frame = FrameBuilder::new().status_query();
        let payload = frame.payload();
        assert!(!payload.contains(&0x58));
        assert!(!payload.contains(&0x8B));
        assert!(!payload.is_empty());
    }
}
