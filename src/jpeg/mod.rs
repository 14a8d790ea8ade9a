//! Byte-level JPEG container handling.
//!
//! Nothing in here decodes pixels. The modules walk, rewrite and synthesize
//! the marker-segment structure of a JPEG stream:
//!
//! - [`markers`]: marker constants and the shared segment iterator
//! - [`tables`]: standard Huffman and quantisation tables
//! - [`dimensions`]: frame size extraction and bounds checks
//! - [`repair`]: EOI, Huffman table and stuffing repair plus segment cleanup
//! - [`synth`]: minimal container synthesis for non-JPEG payloads
//! - [`verify`]: structural checks on the final stream

pub mod dimensions;
pub mod markers;
pub mod repair;
pub mod synth;
pub mod tables;
pub mod verify;

pub use dimensions::{extract_dimensions, DimensionBounds, DimensionError, DimensionOutcome};
pub use markers::{MarkerSegments, Segment};
pub use repair::{repair, RepairPolicy, RepairReport, Repaired};
pub use synth::{probe_dimensions, synthesize};
pub use verify::{verify_structure, StructureError};

use thiserror::Error;

/// Failures while writing a JPEG stream.
#[derive(Debug, Error)]
pub enum JpegError {
    #[error("input does not start with the JPEG SOI signature")]
    MissingSoi,

    #[error("segment 0xFF{marker:02X} body of {len} bytes does not fit a 16-bit length field")]
    SegmentTooLarge { marker: u8, len: usize },
}
