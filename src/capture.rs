//! Logic-analyzer capture ingestion and analysis.
//!
//! Captures are CSV exports with the columns
//! `Time [s],Value,Parity Error,Framing Error`; values are hex
//! (`0x98`-style) and the error columns carry text when the analyzer
//! flagged the byte. This module reads such files, splits them into
//! marker-delimited sequences, and produces summaries and diffs used when
//! comparing new captures against the known command set.

use std::path::Path;

use serde::Serialize;

use crate::error::{CommanderError, Result};
use crate::protocol::{END_MARKER, RX_START, RX_SYNC, TX_START, TX_SYNC};

/// One analyzed byte from a capture file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureEntry {
    /// Seconds from the start of the capture.
    pub timestamp: f64,
    /// The data value on the line.
    pub value: u8,
    /// Analyzer flagged a parity error for this byte.
    pub parity_error: bool,
    /// Analyzer flagged a framing error for this byte.
    pub framing_error: bool,
}

/// Summary of one marker-delimited sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSummary {
    /// `0x58` (TX) or `0x98` (RX).
    pub start_marker: u8,
    /// Total length, markers included.
    pub len: usize,
    /// Number of sync bytes (`0x8B` TX / `0x16` RX) seen.
    pub sync_count: usize,
    /// Seconds from start marker to end marker.
    pub duration: f64,
    /// Octets that are neither markers nor sync bytes.
    pub data_bytes: Vec<u8>,
}

/// Differences between two sequences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceDiff {
    /// Length of the second minus length of the first.
    pub length_delta: isize,
    /// `(index, first value, second value)` where the bytes differ.
    pub differing: Vec<(usize, u8, u8)>,
    /// Start-time offset of the second relative to the first, seconds.
    pub timing_offset: f64,
}

/// Read a logic-analyzer CSV export.
///
/// # Errors
/// Fails on unreadable files; individual malformed rows are skipped, as
/// analyzer exports routinely carry trailing junk lines.
pub fn read_capture<P: AsRef<Path>>(path: P) -> Result<Vec<CaptureEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())
        .map_err(|e| CommanderError::Capture(e.to_string()))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CommanderError::Capture(e.to_string()))?;
        if let Some(entry) = parse_record(&record) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn parse_record(record: &csv::StringRecord) -> Option<CaptureEntry> {
    let timestamp: f64 = record.get(0)?.parse().ok()?;
    let value = parse_hex_byte(record.get(1)?)?;
    let parity_error = record.get(2).is_some_and(|f| !f.is_empty());
    let framing_error = record.get(3).is_some_and(|f| !f.is_empty());
    Some(CaptureEntry {
        timestamp,
        value,
        parity_error,
        framing_error,
    })
}

fn parse_hex_byte(field: &str) -> Option<u8> {
    let stripped = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u8::from_str_radix(stripped, 16).ok()
}

/// Split a capture into complete command sequences: each starts at a TX or
/// RX start marker and ends at the next end marker. Incomplete trailing
/// sequences are dropped.
pub fn find_sequences(entries: &[CaptureEntry]) -> Vec<Vec<CaptureEntry>> {
    let mut sequences = Vec::new();
    let mut current: Vec<CaptureEntry> = Vec::new();

    for &entry in entries {
        if entry.value == RX_START || entry.value == TX_START {
            current = vec![entry];
        } else if !current.is_empty() {
            current.push(entry);
            if entry.value == END_MARKER {
                sequences.push(std::mem::take(&mut current));
            }
        }
    }
    sequences
}

/// Summarize one sequence; `None` when it lacks markers.
pub fn summarize(sequence: &[CaptureEntry]) -> Option<SequenceSummary> {
    let first = sequence.first()?;
    let last = sequence.last()?;
    if (first.value != TX_START && first.value != RX_START) || last.value != END_MARKER {
        return None;
    }

    let sync = if first.value == TX_START { TX_SYNC } else { RX_SYNC };
    let sync_count = sequence.iter().filter(|e| e.value == sync).count();
    let data_bytes = sequence[1..sequence.len() - 1]
        .iter()
        .filter(|e| e.value != sync)
        .map(|e| e.value)
        .collect();

    Some(SequenceSummary {
        start_marker: first.value,
        len: sequence.len(),
        sync_count,
        duration: last.timestamp - first.timestamp,
        data_bytes,
    })
}

/// Byte-by-byte comparison of two sequences.
pub fn compare(first: &[CaptureEntry], second: &[CaptureEntry]) -> SequenceDiff {
    let differing = first
        .iter()
        .zip(second.iter())
        .enumerate()
        .filter(|(_, (a, b))| a.value != b.value)
        .map(|(i, (a, b))| (i, a.value, b.value))
        .collect();

    let timing_offset = match (first.first(), second.first()) {
        (Some(a), Some(b)) => b.timestamp - a.timestamp,
        _ => 0.0,
    };

    SequenceDiff {
        length_delta: second.len() as isize - first.len() as isize,
        differing,
        timing_offset,
    }
}
