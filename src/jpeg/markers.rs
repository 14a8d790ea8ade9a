//! JPEG marker constants and segment iteration.
//!
//! Every component that walks a JPEG container goes through [`MarkerSegments`]
//! instead of doing its own offset arithmetic. The iterator never trusts a
//! length field it cannot verify against the buffer: such segments are
//! reported with `intact == false` and the walk resumes two bytes later.

use std::ops::Range;

pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const DQT: u8 = 0xDB;
pub const DRI: u8 = 0xDD;
pub const DHT: u8 = 0xC4;
pub const DAC: u8 = 0xCC;
pub const SOF0: u8 = 0xC0;
pub const APP0: u8 = 0xE0;
pub const COM: u8 = 0xFE;
pub const TEM: u8 = 0x01;

/// Two-byte signature every JPEG starts with.
pub const JPEG_SIGNATURE: [u8; 2] = [0xFF, SOI];

/// Byte-stuffing pair used inside entropy-coded data.
pub const STUFFED_FF: [u8; 2] = [0xFF, 0x00];

/// Start-of-frame family: C0..=CF minus DHT, JPG extension and DAC.
pub fn is_sof(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, DHT | 0xC8 | DAC)
}

/// Restart markers RST0..RST7.
pub fn is_rst(marker: u8) -> bool {
    (0xD0..=0xD7).contains(&marker)
}

/// Markers that carry no length field.
pub fn is_standalone(marker: u8) -> bool {
    matches!(marker, SOI | EOI | TEM) || is_rst(marker)
}

/// Whether `bytes` starts with the JPEG SOI signature.
pub fn has_jpeg_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&JPEG_SIGNATURE)
}

/// Position of the first `a b` byte pair at or after `from`.
pub fn find_pair(bytes: &[u8], a: u8, b: u8, from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(2)
        .position(|w| w[0] == a && w[1] == b)
        .map(|p| p + from)
}

/// A marker segment located inside a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker type byte (without the `0xFF` prefix)
    pub marker: u8,
    /// Offset of the `0xFF` prefix
    pub offset: usize,
    /// Content bytes after the length field (empty for standalone markers)
    pub body: Range<usize>,
    /// False when the declared length was below 2 or ran past the buffer
    pub intact: bool,
}

impl Segment {
    /// Offset one past the last byte of this segment.
    pub fn end(&self) -> usize {
        if self.intact && !is_standalone(self.marker) {
            self.body.end
        } else {
            self.offset + 2
        }
    }

    /// The full segment (marker, length and body) as a byte range.
    pub fn span(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Lazy forward walk over the marker segments of a JPEG buffer.
///
/// Cloning the iterator restarts from the clone's position, so callers can
/// look ahead without losing their place.
#[derive(Debug, Clone)]
pub struct MarkerSegments<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> MarkerSegments<'a> {
    /// Walk from the beginning of the buffer.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::from_offset(bytes, 0)
    }

    /// Walk starting at an arbitrary offset.
    pub fn from_offset(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos,
            done: false,
        }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Find the next marker prefix at or after `self.pos`, skipping fill bytes.
    ///
    /// Returns the offset of the `0xFF` that directly precedes the marker type.
    fn next_marker_offset(&self) -> Option<usize> {
        let mut pos = self.pos;
        loop {
            while *self.bytes.get(pos)? != 0xFF {
                pos += 1;
            }
            let mut kind_at = pos + 1;
            while *self.bytes.get(kind_at)? == 0xFF {
                kind_at += 1;
            }
            let offset = kind_at - 1;
            // A stuffed zero outside scan data is noise.
            if self.bytes[kind_at] == 0x00 {
                pos = kind_at + 1;
                continue;
            }
            return Some(offset);
        }
    }

    /// Skip entropy-coded data that follows an SOS header.
    fn skip_entropy(&self, from: usize) -> usize {
        let mut pos = from;
        while pos + 1 < self.bytes.len() {
            if self.bytes[pos] == 0xFF {
                let next = self.bytes[pos + 1];
                if next != 0x00 && next != 0xFF && !is_rst(next) {
                    return pos;
                }
            }
            pos += 1;
        }
        self.bytes.len()
    }
}

impl Iterator for MarkerSegments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.done {
            return None;
        }
        let Some(offset) = self.next_marker_offset() else {
            self.done = true;
            return None;
        };
        let marker = self.bytes[offset + 1];
        let after_marker = offset + 2;

        if is_standalone(marker) {
            self.pos = after_marker;
            self.done = marker == EOI;
            return Some(Segment {
                marker,
                offset,
                body: after_marker..after_marker,
                intact: true,
            });
        }

        let length = self
            .bytes
            .get(after_marker..after_marker + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize);

        match length {
            Some(length) if length >= 2 && after_marker + length <= self.bytes.len() => {
                let body = after_marker + 2..after_marker + length;
                self.pos = if marker == SOS {
                    self.skip_entropy(body.end)
                } else {
                    body.end
                };
                Some(Segment {
                    marker,
                    offset,
                    body,
                    intact: true,
                })
            }
            _ => {
                self.pos = after_marker;
                Some(Segment {
                    marker,
                    offset,
                    body: after_marker..after_marker,
                    intact: false,
                })
            }
        }
    }
}

impl std::iter::FusedIterator for MarkerSegments<'_> {}

/// Append a length-prefixed segment to `out`.
///
/// Fails when the body cannot be described by a 16-bit length field.
pub fn write_segment(out: &mut Vec<u8>, marker: u8, body: &[u8]) -> Result<(), super::JpegError> {
    let length = u16::try_from(body.len() + 2)
        .map_err(|_| super::JpegError::SegmentTooLarge { marker, len: body.len() })?;
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(body);
    Ok(())
}
