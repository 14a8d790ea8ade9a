//! Minimal JPEG container synthesis for non-JPEG uploads.
//!
//! The synthesized container is structurally valid (every length field is
//! correct, the scan references only tables that are defined) but its scan
//! data is the original file, byte-stuffed. It will not render as the source
//! image.

use image::ImageReader;
use std::io::Cursor;

use super::markers::{write_segment, APP0, EOI, JPEG_SIGNATURE, SOF0, SOS};
use super::repair::ensure_stuffing;
use super::tables::{standard_dht_block, standard_dqt_segment};
use super::JpegError;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// JFIF 1.01, no units, 1:1 density, no thumbnail.
const JFIF_BODY: [u8; 14] = [
    b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
];

/// Three components, luma on table 0, both chroma on table 1, full spectral range.
const SOS_BODY: [u8; 10] = [0x03, 0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00];

/// Best-effort width/height of a non-JPEG payload.
///
/// PNG is read straight from the IHDR chunk. Other formats go through the
/// `image` crate's header probe; nothing is decoded.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        return png_dimensions(bytes);
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// IHDR width and height at fixed offsets 16 and 20.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let width = u32::from_be_bytes(bytes.get(16..20)?.try_into().ok()?);
    let height = u32::from_be_bytes(bytes.get(20..24)?.try_into().ok()?);
    Some((width, height))
}

/// Frame size as SOF0 can encode it.
fn frame_size(dimensions: Option<(u32, u32)>) -> Option<(u16, u16)> {
    let (width, height) = dimensions?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((u16::try_from(width).ok()?, u16::try_from(height).ok()?))
}

fn sof0_body(width: u16, height: u16) -> [u8; 15] {
    let [h0, h1] = height.to_be_bytes();
    let [w0, w1] = width.to_be_bytes();
    [
        0x08, h0, h1, w0, w1, 0x03, // precision, size, component count
        0x01, 0x22, 0x00, // Y: 2x2 sampling, table 0
        0x02, 0x11, 0x01, // Cb
        0x03, 0x11, 0x01, // Cr
    ]
}

/// Wrap `original` in a minimal JPEG container.
///
/// A SOF0 segment is written only when both dimensions are known, positive
/// and fit in 16 bits.
pub fn synthesize(
    original: &[u8],
    dimensions: Option<(u32, u32)>,
    stuffing_offset: usize,
) -> Result<Vec<u8>, JpegError> {
    let mut out = Vec::with_capacity(original.len() + original.len() / 128 + 640);
    out.extend_from_slice(&JPEG_SIGNATURE);
    write_segment(&mut out, APP0, &JFIF_BODY)?;
    out.extend_from_slice(&standard_dqt_segment()?);
    if let Some((width, height)) = frame_size(dimensions) {
        write_segment(&mut out, SOF0, &sof0_body(width, height))?;
    }
    out.extend_from_slice(&standard_dht_block()?);
    write_segment(&mut out, SOS, &SOS_BODY)?;

    let entropy_start = out.len();
    for &byte in original {
        out.push(byte);
        if byte == 0xFF {
            out.push(0x00);
        }
    }
    let entropy_end = out.len();
    ensure_stuffing(&mut out, entropy_start, entropy_end, stuffing_offset);

    out.extend_from_slice(&[0xFF, EOI]);
    Ok(out)
}
