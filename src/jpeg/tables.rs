//! Standard Huffman and quantisation tables (ITU-T T.81, Annex K).
//!
//! These are immutable data shared by the repair and synthesis paths.

use super::markers::{write_segment, DHT, DQT};
use super::JpegError;

/// One Huffman table as it appears inside a DHT segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanTable {
    /// Table class: 0 = DC, 1 = AC
    pub class: u8,
    /// Destination identifier (0..=3)
    pub id: u8,
    /// Number of codes of each length 1..=16
    pub counts: [u8; 16],
    /// Symbol values in code order
    pub values: &'static [u8],
}

impl HuffmanTable {
    /// Class/id byte (`Tc << 4 | Th`).
    pub fn selector(&self) -> u8 {
        (self.class << 4) | self.id
    }

    /// Serialized table content: selector, counts, values.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(17 + self.values.len());
        out.push(self.selector());
        out.extend_from_slice(&self.counts);
        out.extend_from_slice(self.values);
        out
    }
}

const LUMA_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
const CHROMA_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

#[rustfmt::skip]
const LUMA_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
    0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16,
    0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4,
    0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA,
    0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

#[rustfmt::skip]
const CHROMA_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0,
    0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34,
    0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7A, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5,
    0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
    0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2,
    0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9,
    0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

/// Luma DC, luma AC, chroma DC, chroma AC.
pub const STANDARD_HUFFMAN_TABLES: [HuffmanTable; 4] = [
    HuffmanTable {
        class: 0,
        id: 0,
        counts: [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
        values: &LUMA_DC_VALUES,
    },
    HuffmanTable {
        class: 1,
        id: 0,
        counts: [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D],
        values: &LUMA_AC_VALUES,
    },
    HuffmanTable {
        class: 0,
        id: 1,
        counts: [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0],
        values: &CHROMA_DC_VALUES,
    },
    HuffmanTable {
        class: 1,
        id: 1,
        counts: [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77],
        values: &CHROMA_AC_VALUES,
    },
];

/// Quantisation table, values in zig-zag order.
#[derive(Debug, Clone, Copy)]
pub struct QuantTable {
    pub id: u8,
    pub values: [u8; 64],
}

#[rustfmt::skip]
pub const STANDARD_QUANT_TABLES: [QuantTable; 2] = [
    QuantTable {
        id: 0,
        values: [
            16, 11, 12, 14, 12, 10, 16, 14, 13, 14, 18, 17, 16, 19, 24, 40,
            26, 24, 22, 22, 24, 49, 35, 37, 29, 40, 58, 51, 61, 60, 57, 51,
            56, 55, 64, 72, 92, 78, 64, 68, 87, 69, 55, 56, 80, 109, 81, 87,
            95, 98, 103, 104, 103, 62, 77, 113, 121, 112, 100, 120, 92, 101, 103, 99,
        ],
    },
    QuantTable {
        id: 1,
        values: [
            17, 18, 18, 24, 21, 24, 47, 26, 26, 47, 99, 66, 56, 66, 99, 99,
            99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
            99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
            99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
        ],
    },
];

/// The four standard Huffman tables, one DHT segment each.
pub fn standard_dht_block() -> Result<Vec<u8>, JpegError> {
    let mut out = Vec::with_capacity(432);
    for table in &STANDARD_HUFFMAN_TABLES {
        write_segment(&mut out, DHT, &table.to_bytes())?;
    }
    Ok(out)
}

/// Both standard quantisation tables in a single DQT segment.
pub fn standard_dqt_segment() -> Result<Vec<u8>, JpegError> {
    let mut body = Vec::with_capacity(130);
    for table in &STANDARD_QUANT_TABLES {
        body.push(table.id);
        body.extend_from_slice(&table.values);
    }
    let mut out = Vec::with_capacity(134);
    write_segment(&mut out, DQT, &body)?;
    Ok(out)
}

/// A Huffman table located inside a DHT segment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhtEntry<'a> {
    pub selector: u8,
    pub bytes: &'a [u8],
}

/// Split a DHT body into its tables.
///
/// Returns `None` when the counts do not match the available bytes.
pub fn parse_dht_tables(body: &[u8]) -> Option<Vec<DhtEntry<'_>>> {
    let mut tables = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        let counts = body.get(pos + 1..pos + 17)?;
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let end = pos + 17 + total;
        let bytes = body.get(pos..end)?;
        tables.push(DhtEntry {
            selector: body[pos],
            bytes,
        });
        pos = end;
    }
    Some(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_match_values() {
        for table in &STANDARD_HUFFMAN_TABLES {
            let total: usize = table.counts.iter().map(|&c| c as usize).sum();
            assert_eq!(total, table.values.len(), "table {:02X}", table.selector());
        }
    }

    #[test]
    fn test_dht_block_layout() {
        let block = standard_dht_block().unwrap();
        // 4 markers + lengths, 4 selectors + counts, 12 + 162 + 12 + 162 values
        assert_eq!(block.len(), 4 * 4 + 4 * 17 + 348);
        assert_eq!(&block[..2], &[0xFF, 0xC4]);
        assert_eq!(u16::from_be_bytes([block[2], block[3]]), 2 + 17 + 12);
        assert_eq!(block[4], 0x00);
    }

    #[test]
    fn test_dqt_segment_layout() {
        let dqt = standard_dqt_segment().unwrap();
        assert_eq!(dqt.len(), 4 + 130);
        assert_eq!(u16::from_be_bytes([dqt[2], dqt[3]]), 132);
        assert_eq!(dqt[4], 0);
        assert_eq!(dqt[4 + 65], 1);
    }

    #[test]
    fn test_parse_dht_tables_splits_combined_segment() {
        let mut body = STANDARD_HUFFMAN_TABLES[0].to_bytes();
        body.extend(STANDARD_HUFFMAN_TABLES[3].to_bytes());
        let tables = parse_dht_tables(&body).unwrap();
        let selectors: Vec<u8> = tables.iter().map(|t| t.selector).collect();
        assert_eq!(selectors, vec![0x00, 0x11]);
    }

    #[test]
    fn test_parse_dht_tables_rejects_short_body() {
        let body = STANDARD_HUFFMAN_TABLES[1].to_bytes();
        assert!(parse_dht_tables(&body[..40]).is_none());
        assert!(parse_dht_tables(&[0x00, 0x01]).is_none());
        assert_eq!(parse_dht_tables(&[]), Some(vec![]));
    }
}
