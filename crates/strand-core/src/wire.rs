//! Wire types, tags, varints and ZigZag mapping.
//!
//! Varints are little-endian base-128: each byte carries 7 payload bits,
//! and the high bit marks continuation. A 64-bit value needs at most 10
//! bytes, and the 10th byte may only carry the single remaining bit.

use std::fmt;

use crate::id::FieldNumber;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// The 3-bit wire type carried in every tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// 8 bytes, little-endian.
    Fixed64 = 1,
    /// Varint length followed by that many bytes.
    LengthDelimited = 2,
    /// Legacy group start; fields follow until the matching END_GROUP.
    StartGroup = 3,
    /// Legacy group end.
    EndGroup = 4,
    /// 4 bytes, little-endian.
    Fixed32 = 5,
}

impl WireType {
    /// Decode a raw 3-bit wire type. Values 6 and 7 are invalid.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Varint => "VARINT",
            Self::Fixed64 => "FIXED64",
            Self::LengthDelimited => "LENGTH_DELIMITED",
            Self::StartGroup => "START_GROUP",
            Self::EndGroup => "END_GROUP",
            Self::Fixed32 => "FIXED32",
        };
        f.write_str(name)
    }
}

/// A decoded tag: field number plus wire type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    /// The field this value belongs to.
    pub number: FieldNumber,
    /// How the value is framed on the wire.
    pub wire_type: WireType,
}

impl Tag {
    /// Create a tag.
    pub fn new(number: FieldNumber, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    /// The raw 32-bit tag value: `(number << 3) | wire_type`.
    pub fn value(self) -> u32 {
        (self.number.get() << 3) | self.wire_type as u32
    }

    /// Encoded length of this tag in bytes.
    pub fn encoded_len(self) -> usize {
        varint_len(u64::from(self.value()))
    }

    /// Append the encoded tag to `buf`.
    pub fn encode(self, buf: &mut Vec<u8>) {
        encode_varint(u64::from(self.value()), buf);
    }

    /// The first two encoded bytes of this tag, little-endian, zero padded.
    ///
    /// This is the key the fast dispatch table matches against: a
    /// reader peeks the same two bytes from the input and compares.
    /// Only meaningful for tags whose encoding fits in two bytes
    /// (field numbers below 2048); returns `None` otherwise.
    pub fn fast_key(self) -> Option<u16> {
        let value = self.value();
        if value < 0x80 {
            Some(value as u16)
        } else if value < 0x4000 {
            let lo = (value & 0x7f) as u16 | 0x80;
            let hi = (value >> 7) as u16;
            Some(lo | (hi << 8))
        } else {
            None
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number, self.wire_type)
    }
}

/// Number of bytes needed to encode `value` as a varint.
pub fn varint_len(value: u64) -> usize {
    // Bits needed, rounded up to 7-bit groups; zero still takes one byte.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Append `value` to `buf` as a base-128 varint.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed, or `None` if
/// the varint is truncated or overlong.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Some((value, i + 1));
        }
    }
    None
}

/// ZigZag-encode a signed 32-bit value (`sint32`).
pub fn encode_zigzag32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// ZigZag-decode a 32-bit value.
pub fn decode_zigzag32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// ZigZag-encode a signed 64-bit value (`sint64`).
pub fn encode_zigzag64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// ZigZag-decode a 64-bit value.
pub fn decode_zigzag64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}
