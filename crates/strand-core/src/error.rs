//! Primitive wire-format errors.

use std::error::Error;
use std::fmt;

/// Errors raised while reading raw wire-format primitives.
///
/// Every variant carries the byte offset (relative to the start of the
/// input) at which the problem was detected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// The input ended (or a length-delimited region ended) before the
    /// value was complete.
    Truncated {
        /// Offset of the read that could not be satisfied.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
    },
    /// A varint ran past 10 bytes, or its 10th byte carried more than
    /// the one remaining significant bit.
    VarintOverflow {
        /// Offset of the first byte of the varint.
        offset: usize,
    },
    /// Wire type 6 or 7.
    InvalidWireType {
        /// Offset of the tag.
        offset: usize,
        /// The raw 3-bit wire type.
        value: u8,
    },
    /// Field number 0, or a tag wider than 32 bits.
    InvalidFieldNumber {
        /// Offset of the tag.
        offset: usize,
        /// The raw tag value.
        value: u64,
    },
    /// An END_GROUP tag with no open group, or with a field number that
    /// does not match the open group.
    GroupMismatch {
        /// Offset of the offending END_GROUP tag.
        offset: usize,
        /// Field number of the open group (0 if none was open).
        expected: u32,
        /// Field number carried by the END_GROUP tag.
        found: u32,
    },
    /// A group was still open when its enclosing region ended.
    UnterminatedGroup {
        /// Offset where the enclosing region ended.
        offset: usize,
        /// Field number of the open group.
        number: u32,
    },
    /// A length-delimited region claims more bytes than its enclosing
    /// region holds.
    LengthOverrun {
        /// Offset of the length prefix.
        offset: usize,
        /// Declared length.
        declared: u64,
        /// Bytes actually available.
        available: usize,
    },
    /// Nested groups exceeded the skip depth budget.
    NestingTooDeep {
        /// The depth budget that was exceeded.
        limit: u32,
    },
}

impl WireError {
    /// Byte offset at which the error was detected, if it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Truncated { offset, .. }
            | Self::VarintOverflow { offset }
            | Self::InvalidWireType { offset, .. }
            | Self::InvalidFieldNumber { offset, .. }
            | Self::GroupMismatch { offset, .. }
            | Self::UnterminatedGroup { offset, .. }
            | Self::LengthOverrun { offset, .. } => Some(*offset),
            Self::NestingTooDeep { .. } => None,
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { offset, needed } => {
                write!(f, "truncated input at offset {offset}: needed {needed} more bytes")
            }
            Self::VarintOverflow { offset } => {
                write!(f, "varint at offset {offset} exceeds 64 bits")
            }
            Self::InvalidWireType { offset, value } => {
                write!(f, "invalid wire type {value} at offset {offset}")
            }
            Self::InvalidFieldNumber { offset, value } => {
                write!(f, "invalid tag {value:#x} at offset {offset}")
            }
            Self::GroupMismatch {
                offset,
                expected,
                found,
            } => {
                write!(
                    f,
                    "END_GROUP for field {found} at offset {offset}, expected field {expected}"
                )
            }
            Self::UnterminatedGroup { offset, number } => {
                write!(f, "group for field {number} still open at offset {offset}")
            }
            Self::LengthOverrun {
                offset,
                declared,
                available,
            } => {
                write!(
                    f,
                    "length prefix at offset {offset} declares {declared} bytes, \
                     only {available} available"
                )
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "group nesting exceeds depth limit {limit}")
            }
        }
    }
}

impl Error for WireError {}
