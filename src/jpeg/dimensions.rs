//! Frame dimension extraction and bounds checking.
//!
//! Walks marker segments until the first start-of-frame and reads the frame
//! size. The parser is permissive about input that is not a JPEG at all: it
//! reports [`DimensionOutcome::NotJpeg`] and leaves it to the caller to decide
//! whether that is acceptable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::markers::{has_jpeg_signature, is_sof, MarkerSegments, EOI};

/// Short/long side limits applied to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionBounds {
    pub min_short_side: u32,
    pub max_long_side: u32,
}

impl Default for DimensionBounds {
    fn default() -> Self {
        Self {
            min_short_side: 512,
            max_long_side: 4096,
        }
    }
}

/// Why a set of dimensions was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    #[error("Image is too small: short side is {short_side}px ({width}x{height}), minimum is {min}px")]
    ShortSideTooSmall {
        width: u32,
        height: u32,
        short_side: u32,
        min: u32,
    },

    #[error("Image is too large: long side is {long_side}px ({width}x{height}), maximum is {max}px")]
    LongSideTooLarge {
        width: u32,
        height: u32,
        long_side: u32,
        max: u32,
    },

    #[error("Could not determine dimensions: no start-of-frame marker found")]
    Undetermined,
}

/// Result of a dimension walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionOutcome {
    /// Input does not start with SOI; nothing was checked.
    NotJpeg,
    /// Frame found and within bounds.
    Accepted { width: u32, height: u32 },
    /// Frame found but outside bounds.
    Rejected {
        width: u32,
        height: u32,
        error: DimensionError,
    },
    /// JPEG signature present but no readable frame header.
    Undetermined,
}

impl DimensionOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::NotJpeg | Self::Accepted { .. })
    }

    /// Width and height, when a frame header was read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Accepted { width, height } | Self::Rejected { width, height, .. } => {
                Some((*width, *height))
            }
            Self::NotJpeg | Self::Undetermined => None,
        }
    }

    pub fn error(&self) -> Option<DimensionError> {
        match self {
            Self::Rejected { error, .. } => Some(error.clone()),
            Self::Undetermined => Some(DimensionError::Undetermined),
            Self::NotJpeg | Self::Accepted { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }
}

/// Check `width`x`height` against `bounds`.
pub fn check_bounds(width: u32, height: u32, bounds: DimensionBounds) -> Result<(), DimensionError> {
    let short_side = width.min(height);
    let long_side = width.max(height);

    if short_side < bounds.min_short_side {
        return Err(DimensionError::ShortSideTooSmall {
            width,
            height,
            short_side,
            min: bounds.min_short_side,
        });
    }
    if long_side > bounds.max_long_side {
        return Err(DimensionError::LongSideTooLarge {
            width,
            height,
            long_side,
            max: bounds.max_long_side,
        });
    }
    Ok(())
}

/// Read the frame size of the first SOF segment and check it against `bounds`.
pub fn extract_dimensions(bytes: &[u8], bounds: DimensionBounds) -> DimensionOutcome {
    if !has_jpeg_signature(bytes) {
        return DimensionOutcome::NotJpeg;
    }

    for segment in MarkerSegments::from_offset(bytes, 2) {
        if segment.marker == EOI {
            break;
        }
        if !segment.intact || !is_sof(segment.marker) {
            continue;
        }
        // precision(1) height(2) width(2)
        let Some(frame) = bytes.get(segment.body.start..segment.body.start + 5) else {
            continue;
        };
        if segment.body.len() < 5 {
            continue;
        }
        let height = u16::from_be_bytes([frame[1], frame[2]]) as u32;
        let width = u16::from_be_bytes([frame[3], frame[4]]) as u32;

        return match check_bounds(width, height, bounds) {
            Ok(()) => DimensionOutcome::Accepted { width, height },
            Err(error) => DimensionOutcome::Rejected {
                width,
                height,
                error,
            },
        };
    }

    DimensionOutcome::Undetermined
}
