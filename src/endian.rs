//! Byte-order helpers shared by the frame extractor (configurable order) and the
//! decoder (always big-endian).

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

impl Endianness {
    /// Read an unsigned integer of `buf.len()` bytes (1, 2, 4 or 8).
    /// Other lengths are read as a zero-extended integer of that many bytes, up to 8.
    pub fn read_uint(self, buf: &[u8]) -> u64 {
        match (self, buf.len()) {
            (_, 0) => 0,
            (_, 1) => buf[0] as u64,
            (Endianness::Big, 2) => BigEndian::read_u16(buf) as u64,
            (Endianness::Big, 4) => BigEndian::read_u32(buf) as u64,
            (Endianness::Big, 8) => BigEndian::read_u64(buf),
            (Endianness::Little, 2) => LittleEndian::read_u16(buf) as u64,
            (Endianness::Little, 4) => LittleEndian::read_u32(buf) as u64,
            (Endianness::Little, 8) => LittleEndian::read_u64(buf),
            (Endianness::Big, n) => BigEndian::read_uint(buf, n.min(8)),
            (Endianness::Little, n) => LittleEndian::read_uint(buf, n.min(8)),
        }
    }
}

impl FromStr for Endianness {
    type Err = String;

    /// Accepts `b`, `big`, `bigendian`, `l`, `little`, `littleendian` (any case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "big" | "bigendian" => Ok(Endianness::Big),
            "l" | "little" | "littleendian" => Ok(Endianness::Little),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Big => f.write_str("big"),
            Endianness::Little => f.write_str("little"),
        }
    }
}

/// All-ones mask for an unsigned integer of `width` bytes.
pub fn width_mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// `value + 1`, wrapped to an unsigned integer of `width` bytes.
pub fn wrapping_successor(value: u64, width: usize) -> u64 {
    value.wrapping_add(1) & width_mask(width)
}
