//! Inbound response frame scanning and validation.
//!
//! Received streams are unreliable: responses may be preceded by noise or
//! the tail of a garbled previous frame, and no checksum has been confirmed.
//! The parser therefore scans for the RX start marker, bounds the frame by
//! the end marker, and validates structure purely positionally: the length
//! must match a known template and the sync byte must sit at the template's
//! offsets. Everything else is opaque payload.

use crate::error::{CommanderError, Result};
use crate::protocol::{END_MARKER, RX_LEN_MOVEMENT, RX_LEN_STATUS, RX_MAX_LEN, RX_START, RX_SYNC};

/// Sync offsets of the 25-byte status/init response, taken from capture.
const STATUS_SYNC_OFFSETS: &[usize] = &[1, 3, 5, 7, 19, 21];

/// Sync offsets of the 18-byte movement response. Only the header pattern
/// (shared with the status template) is confirmed; the tail stays opaque.
const MOVEMENT_SYNC_OFFSETS: &[usize] = &[1, 3, 5, 7];

/// Response class, selected by observed frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 25-byte response to a status query or init command.
    Status,
    /// 18-byte response to a movement command.
    Movement,
}

impl ResponseClass {
    fn for_len(len: usize) -> Option<Self> {
        match len {
            RX_LEN_STATUS => Some(ResponseClass::Status),
            RX_LEN_MOVEMENT => Some(ResponseClass::Movement),
            _ => None,
        }
    }

    /// Offsets at which the sync byte must appear for this class.
    pub fn sync_offsets(self) -> &'static [usize] {
        match self {
            ResponseClass::Status => STATUS_SYNC_OFFSETS,
            ResponseClass::Movement => MOVEMENT_SYNC_OFFSETS,
        }
    }
}

/// A validated, marker-delimited inbound frame. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    class: ResponseClass,
    bytes: Vec<u8>,
}

impl ResponseFrame {
    /// Response class (status/init vs movement).
    pub fn class(&self) -> ResponseClass {
        self.class
    }

    /// The complete frame bytes, markers and sync bytes included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offsets at which the sync byte was validated.
    pub fn sync_positions(&self) -> &'static [usize] {
        self.class.sync_offsets()
    }

    /// Payload octets: everything except the markers and the sync positions.
    pub fn payload(&self) -> Vec<u8> {
        let last = self.bytes.len() - 1;
        self.bytes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 0 && *i != last && !self.sync_positions().contains(i))
            .map(|(_, &b)| b)
            .collect()
    }
}

/// Scans raw received bytes for a structurally valid response frame.
#[derive(Debug, Clone, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract the first valid response frame from `raw`.
    ///
    /// Leading noise is tolerated: every occurrence of the start marker is
    /// tried in order, and scanning restarts after a candidate that fails
    /// validation. When no candidate validates, the first candidate's
    /// failure is reported; when the marker never appears, `NoStartMarker`.
    pub fn parse(&self, raw: &[u8]) -> Result<ResponseFrame> {
        let mut first_failure: Option<CommanderError> = None;

        for start in 0..raw.len() {
            if raw[start] != RX_START {
                continue;
            }
            match Self::validate_at(raw, start) {
                Ok(frame) => return Ok(frame),
                Err(err) => {
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        Err(first_failure.unwrap_or(CommanderError::NoStartMarker(raw.len())))
    }

    /// Validate the candidate frame beginning at `start`.
    fn validate_at(raw: &[u8], start: usize) -> Result<ResponseFrame> {
        let window_end = raw.len().min(start + RX_MAX_LEN);
        let end = raw[start + 1..window_end]
            .iter()
            .position(|&b| b == END_MARKER)
            .map(|off| start + 1 + off)
            .ok_or(CommanderError::MalformedLength(window_end - start))?;

        let len = end - start + 1;
        let class = ResponseClass::for_len(len).ok_or(CommanderError::MalformedLength(len))?;

        let bytes = &raw[start..=end];
        for &offset in class.sync_offsets() {
            if bytes[offset] != RX_SYNC {
                return Err(CommanderError::SyncMismatch {
                    offset,
                    found: bytes[offset],
                });
            }
        }

        Ok(ResponseFrame {
            class,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Captured status response used throughout the tests.
    const CAPTURED_STATUS: [u8; 25] = [
        0x98, 0x16, 0xF2, 0x16, 0xCA, 0x16, 0xE6, 0x16, 0xB2, 0xAE, 0x9E, 0xFE, 0xFE, 0x3E, 0x3A,
        0x3E, 0x3E, 0x3E, 0x3E, 0x16, 0xA2, 0x16, 0xE2, 0x06, 0x00,
    ];

    #[test]
    fn parses_captured_status_response() {
        let frame = ResponseParser::new().parse(&CAPTURED_STATUS).unwrap();
        assert_eq!(frame.class(), ResponseClass::Status);
        assert_eq!(frame.len(), 25);
        assert_eq!(frame.sync_positions(), &[1, 3, 5, 7, 19, 21]);
        for &offset in frame.sync_positions() {
            assert_eq!(frame.as_bytes()[offset], 0x16);
        }
    }

    #[test]
    fn reparse_is_idempotent() {
        let parser = ResponseParser::new();
        let frame = parser.parse(&CAPTURED_STATUS).unwrap();
        let again = parser.parse(frame.as_bytes()).unwrap();
        assert_eq!(frame, again);
    }

    #[test]
    fn leading_noise_is_skipped() {
        let mut raw = vec![0x3E, 0x71, 0x98, 0x42]; // includes a decoy start marker
        raw.extend_from_slice(&CAPTURED_STATUS);
        let frame = ResponseParser::new().parse(&raw).unwrap();
        assert_eq!(frame.as_bytes(), &CAPTURED_STATUS);
    }

    #[test]
    fn missing_start_marker_is_reported() {
        let raw = [0x16u8, 0xF2, 0x3E, 0x00];
        match ResponseParser::new().parse(&raw) {
            Err(CommanderError::NoStartMarker(scanned)) => assert_eq!(scanned, 4),
            other => panic!("expected NoStartMarker, got {:?}", other),
        }
    }

    #[test]
    fn unknown_length_is_malformed() {
        // Start marker present, end marker after 9 bytes: no template match.
        let raw = [0x98, 0x16, 0xF2, 0x16, 0xCA, 0x16, 0xE6, 0x16, 0x00];
        match ResponseParser::new().parse(&raw) {
            Err(CommanderError::MalformedLength(len)) => assert_eq!(len, 9),
            other => panic!("expected MalformedLength, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_stream_is_malformed() {
        let raw = [0x98u8; 40]; // no end marker within the length bound
        assert!(matches!(
            ResponseParser::new().parse(&raw),
            Err(CommanderError::MalformedLength(_))
        ));
    }

    #[test]
    fn sync_violation_is_reported_with_offset() {
        let mut raw = CAPTURED_STATUS;
        raw[19] = 0x17;
        match ResponseParser::new().parse(&raw) {
            Err(CommanderError::SyncMismatch { offset, found }) => {
                assert_eq!(offset, 19);
                assert_eq!(found, 0x17);
            }
            other => panic!("expected SyncMismatch, got {:?}", other),
        }
    }

    #[test]
    fn payload_excludes_markers_and_sync_positions() {
        let frame = ResponseParser::new().parse(&CAPTURED_STATUS).unwrap();
        let payload = frame.payload();
        // 25 bytes minus start, end, and six sync positions.
        assert_eq!(payload.len(), 17);
        assert_eq!(payload[0], 0xF2);
        assert_eq!(*payload.last().unwrap(), 0x06);
    }

    #[test]
    fn movement_length_selects_movement_template() {
        let mut raw = [0u8; 18];
        raw[0] = 0x98;
        for &i in MOVEMENT_SYNC_OFFSETS {
            raw[i] = 0x16;
        }
        // Non-zero filler so the end marker is only at the last byte.
        for b in raw.iter_mut().skip(8).take(9) {
            *b = 0x3E;
        }
        raw[2] = 0xF2;
        raw[4] = 0xCA;
        raw[6] = 0xE6;
        raw[17] = 0x00;
        let frame = ResponseParser::new().parse(&raw).unwrap();
        assert_eq!(frame.class(), ResponseClass::Movement);
        assert_eq!(frame.sync_positions(), &[1, 3, 5, 7]);
    }
}
