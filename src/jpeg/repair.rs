//! In-container repair of JPEG streams.
//!
//! The repair never touches the input slice. It produces a fresh buffer in
//! which:
//! - EOI terminates the stream,
//! - the standard Huffman tables are present ahead of the frame,
//! - tables the input defines itself follow the standard ones, so they stay
//!   the definitions in force at the scan,
//! - non-essential segments (APPn beyond the first APP0, comments, Huffman
//!   tables identical to the one already in force, segments with broken
//!   lengths) are gone,
//! - the entropy-coded data contains at least one `FF 00` pair.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::markers::{
    find_pair, has_jpeg_signature, is_sof, write_segment, MarkerSegments, Segment, APP0, DAC,
    DHT, DQT, DRI, EOI, JPEG_SIGNATURE, SOS, STUFFED_FF,
};
use super::tables::{parse_dht_tables, standard_dht_block};
use super::JpegError;

/// Knobs for the repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    /// Insert the standard Huffman tables even when a valid DHT is present
    pub always_reinsert_huffman_tables: bool,
    /// Where a synthetic `FF 00` pair goes, counted from the start of entropy data
    pub synthetic_stuffing_offset: usize,
    /// Rebuilt streams shorter than this are discarded in favour of the
    /// table-augmented input
    pub min_rebuild_len: usize,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            always_reinsert_huffman_tables: true,
            synthetic_stuffing_offset: 10,
            min_rebuild_len: 150,
        }
    }
}

/// What the repair pass found and changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub eoi_appended: bool,
    pub valid_dht_found: bool,
    pub stuffing_found: bool,
    pub dht_inserted_at: Option<usize>,
    pub segments_dropped: usize,
    pub stuffing_spliced: bool,
    pub rebuild_discarded: bool,
}

/// Repaired stream plus the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct Repaired {
    pub bytes: Vec<u8>,
    pub report: RepairReport,
}

/// Repair a stream that starts with the JPEG signature.
pub fn repair(input: &[u8], policy: &RepairPolicy) -> Result<Repaired, JpegError> {
    if !has_jpeg_signature(input) {
        return Err(JpegError::MissingSoi);
    }

    let mut report = RepairReport::default();

    let mut working = Vec::with_capacity(input.len() + 2);
    working.extend_from_slice(input);
    if !input.ends_with(&[0xFF, EOI]) {
        working.extend_from_slice(&[0xFF, EOI]);
        report.eoi_appended = true;
    }

    report.valid_dht_found = has_valid_dht(&working);
    report.stuffing_found = find_pair(&working, 0xFF, 0x00, 0).is_some();

    let augmented = if policy.always_reinsert_huffman_tables || !report.valid_dht_found {
        let at = dht_insertion_point(&working);
        report.dht_inserted_at = Some(at);
        let tables = standard_dht_block()?;
        let mut spliced = Vec::with_capacity(working.len() + tables.len());
        spliced.extend_from_slice(&working[..at]);
        spliced.extend_from_slice(&tables);
        spliced.extend_from_slice(&working[at..]);
        spliced
    } else {
        working
    };

    let rebuilt = rebuild(&augmented, policy, &mut report)?;
    let bytes = if rebuilt.len() < policy.min_rebuild_len {
        report.rebuild_discarded = true;
        augmented
    } else {
        rebuilt
    };

    debug!(
        input_len = input.len(),
        output_len = bytes.len(),
        eoi_appended = report.eoi_appended,
        valid_dht_found = report.valid_dht_found,
        stuffing_found = report.stuffing_found,
        dht_inserted_at = ?report.dht_inserted_at,
        segments_dropped = report.segments_dropped,
        stuffing_spliced = report.stuffing_spliced,
        rebuild_discarded = report.rebuild_discarded,
        "Repaired JPEG container"
    );

    Ok(Repaired { bytes, report })
}

/// Whether the buffer holds at least one DHT whose length fits the buffer.
pub fn has_valid_dht(bytes: &[u8]) -> bool {
    MarkerSegments::new(bytes).any(|s| s.marker == DHT && s.intact)
}

/// Offset at which the standard DHT block should be spliced in.
///
/// End of the first APP0 if there is one, else the first DHT/DQT/SOF/SOS,
/// else right after SOI. The block never lands after a DHT of the input.
pub fn dht_insertion_point(bytes: &[u8]) -> usize {
    let mut first_dht = None;
    let mut first_table_or_frame = None;
    for segment in MarkerSegments::from_offset(bytes, 2) {
        match segment.marker {
            APP0 if segment.intact => return first_dht.unwrap_or(segment.end()),
            DHT => {
                first_dht.get_or_insert(segment.offset);
                first_table_or_frame.get_or_insert(segment.offset);
            }
            DQT | SOS => {
                first_table_or_frame.get_or_insert(segment.offset);
            }
            m if is_sof(m) => {
                first_table_or_frame.get_or_insert(segment.offset);
            }
            EOI => break,
            _ => {}
        }
        if segment.marker == SOS {
            break;
        }
    }
    first_table_or_frame.unwrap_or(2)
}

/// Insert a synthetic `FF 00` pair into `buf[entropy_start..entropy_end]`
/// unless that range already contains one.
///
/// Returns whether a pair was inserted.
pub fn ensure_stuffing(
    buf: &mut Vec<u8>,
    entropy_start: usize,
    entropy_end: usize,
    offset: usize,
) -> bool {
    let end = entropy_end.min(buf.len());
    if entropy_start > end {
        return false;
    }
    if find_pair(&buf[..end], 0xFF, 0x00, entropy_start).is_some() {
        return false;
    }
    let mut at = entropy_start.saturating_add(offset).min(end);
    // Do not split a marker prefix from its type byte.
    while at < end && at > entropy_start && buf[at - 1] == 0xFF {
        at += 1;
    }
    buf.splice(at..at, STUFFED_FF);
    true
}

/// Copy essential segments of `bytes` into a new stream.
fn rebuild(
    bytes: &[u8],
    policy: &RepairPolicy,
    report: &mut RepairReport,
) -> Result<Vec<u8>, JpegError> {
    let scan_end = bytes.len().saturating_sub(2);
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.extend_from_slice(&JPEG_SIGNATURE);

    let mut seen_app0 = false;
    // Selector -> table bytes a decoder would use at this point.
    let mut in_force = HashMap::new();

    for segment in MarkerSegments::from_offset(bytes, 2) {
        if !segment.intact {
            report.segments_dropped += 1;
            continue;
        }
        match segment.marker {
            EOI => break,
            SOS if segment.body.end <= scan_end => {
                copy_scan(bytes, &segment, scan_end, policy, report, &mut out);
                break;
            }
            APP0 if !seen_app0 => {
                seen_app0 = true;
                out.extend_from_slice(&bytes[segment.span()]);
            }
            DHT => {
                let body = &bytes[segment.body.clone()];
                let kept = keep_redefined_tables(body, &mut in_force, &mut out)?;
                if !kept {
                    report.segments_dropped += 1;
                }
            }
            DQT | DRI | DAC => out.extend_from_slice(&bytes[segment.span()]),
            m if is_sof(m) => out.extend_from_slice(&bytes[segment.span()]),
            _ => report.segments_dropped += 1,
        }
    }

    out.extend_from_slice(&[0xFF, EOI]);
    Ok(out)
}

/// Copy SOS through the end of scan data, splicing in stuffing when absent.
fn copy_scan(
    bytes: &[u8],
    sos: &Segment,
    scan_end: usize,
    policy: &RepairPolicy,
    report: &mut RepairReport,
    out: &mut Vec<u8>,
) {
    let entropy_start = out.len() + (sos.body.end - sos.offset);
    out.extend_from_slice(&bytes[sos.offset..scan_end]);
    let entropy_end = out.len();
    report.stuffing_spliced = ensure_stuffing(
        out,
        entropy_start,
        entropy_end,
        policy.synthetic_stuffing_offset,
    );
}

/// Emit the tables of a DHT body that change what is in force for their
/// selector. A later definition of a selector replaces an earlier one.
///
/// Returns false when nothing was emitted (all identical or malformed).
fn keep_redefined_tables<'a>(
    body: &'a [u8],
    in_force: &mut HashMap<u8, &'a [u8]>,
    out: &mut Vec<u8>,
) -> Result<bool, JpegError> {
    let Some(tables) = parse_dht_tables(body) else {
        return Ok(false);
    };
    let mut fresh = Vec::with_capacity(body.len());
    for table in tables {
        if in_force.get(&table.selector) != Some(&table.bytes) {
            in_force.insert(table.selector, table.bytes);
            fresh.extend_from_slice(table.bytes);
        }
    }
    if fresh.is_empty() {
        return Ok(false);
    }
    write_segment(out, DHT, &fresh)?;
    Ok(true)
}
