//! Structural checks applied to every stream the engine hands back.

use thiserror::Error;

use super::markers::{find_pair, has_jpeg_signature, MarkerSegments, DHT, EOI, SOS};

/// A structural property the output stream is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("missing SOI signature")]
    MissingSoi,

    #[error("missing trailing EOI marker")]
    MissingEoi,

    #[error("no Huffman table segment with a valid length")]
    MissingHuffmanTable,

    #[error("no start-of-scan segment")]
    MissingScan,

    #[error("no FF 00 stuffing pair in scan data")]
    MissingStuffing,
}

/// Check that `bytes` starts with SOI, ends with EOI, holds an intact DHT and
/// carries an `FF 00` pair after the first SOS header.
pub fn verify_structure(bytes: &[u8]) -> Result<(), StructureError> {
    if !has_jpeg_signature(bytes) {
        return Err(StructureError::MissingSoi);
    }
    if bytes.len() < 4 || !bytes.ends_with(&[0xFF, EOI]) {
        return Err(StructureError::MissingEoi);
    }

    let mut has_dht = false;
    let mut scan_start = None;
    for segment in MarkerSegments::new(bytes).filter(|s| s.intact) {
        match segment.marker {
            DHT => has_dht = true,
            SOS => {
                scan_start.get_or_insert(segment.body.end);
            }
            _ => {}
        }
    }

    if !has_dht {
        return Err(StructureError::MissingHuffmanTable);
    }
    let scan_start = scan_start.ok_or(StructureError::MissingScan)?;
    find_pair(bytes, 0xFF, 0x00, scan_start).ok_or(StructureError::MissingStuffing)?;
    Ok(())
}
