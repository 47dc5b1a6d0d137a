//! Decode and encode errors.

use std::error::Error;
use std::fmt;

use strand_arena::ArenaError;
use strand_core::{FieldNumber, WireError};

use crate::config::OptionsError;

/// Why input was rejected as malformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MalformedReason {
    /// Input ended inside a value.
    Truncated,
    /// A varint ran past 10 bytes or overflowed 64 bits.
    BadVarint,
    /// Wire type 6 or 7.
    BadWireType,
    /// Field number 0, above 2^29-1, or a tag above 32 bits.
    BadFieldNumber,
    /// END_GROUP without a matching START_GROUP, or with another number.
    BadGroupNesting,
    /// A length prefix exceeds the enclosing region.
    LengthOverrun,
    /// A string field is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Truncated => "truncated input",
            Self::BadVarint => "bad varint",
            Self::BadWireType => "bad wire type",
            Self::BadFieldNumber => "bad field number",
            Self::BadGroupNesting => "bad group nesting",
            Self::LengthOverrun => "length prefix overruns input",
            Self::InvalidUtf8 => "invalid UTF-8 in string field",
        };
        f.write_str(s)
    }
}

/// Errors from decoding.
///
/// A failed decode may leave the target message partly populated; it
/// must not be treated as valid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The input is not valid wire format.
    Malformed {
        /// Byte offset at which the problem was detected.
        offset: usize,
        /// What was wrong.
        reason: MalformedReason,
    },
    /// Sub-messages or groups nested deeper than the configured limit.
    DepthExceeded {
        /// The configured limit.
        limit: u32,
    },
    /// The arena could not satisfy an allocation.
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
    },
    /// A closed enum field received an undeclared value under
    /// [`UnknownEnumPolicy::Reject`](crate::UnknownEnumPolicy::Reject).
    UnknownEnumValue {
        /// The enum field.
        field: FieldNumber,
        /// The rejected value.
        value: i32,
    },
    /// A required field is absent.
    MissingRequired {
        /// Message type name.
        message: String,
        /// The missing field.
        field: FieldNumber,
    },
    /// The target message or arena was unusable.
    Arena(ArenaError),
    /// The decode options are invalid.
    Options(OptionsError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { offset, reason } => {
                write!(f, "malformed input at offset {offset}: {reason}")
            }
            Self::DepthExceeded { limit } => write!(f, "nesting depth exceeds limit {limit}"),
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory allocating {requested} bytes")
            }
            Self::UnknownEnumValue { field, value } => {
                write!(f, "field {field}: value {value} not in closed enum")
            }
            Self::MissingRequired { message, field } => {
                write!(f, "{message}: required field {field} missing")
            }
            Self::Arena(e) => write!(f, "arena error: {e}"),
            Self::Options(e) => write!(f, "{e}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::Options(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WireError> for DecodeError {
    fn from(e: WireError) -> Self {
        let reason = match e {
            WireError::Truncated { .. } => MalformedReason::Truncated,
            WireError::VarintOverflow { .. } => MalformedReason::BadVarint,
            WireError::InvalidWireType { .. } => MalformedReason::BadWireType,
            WireError::InvalidFieldNumber { .. } => MalformedReason::BadFieldNumber,
            WireError::GroupMismatch { .. } | WireError::UnterminatedGroup { .. } => {
                MalformedReason::BadGroupNesting
            }
            WireError::LengthOverrun { .. } => MalformedReason::LengthOverrun,
            WireError::NestingTooDeep { limit } => return Self::DepthExceeded { limit },
        };
        Self::Malformed {
            offset: e.offset().unwrap_or(0),
            reason,
        }
    }
}

impl From<ArenaError> for DecodeError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::OutOfMemory { requested, .. } => Self::OutOfMemory { requested },
            other => Self::Arena(other),
        }
    }
}

impl From<OptionsError> for DecodeError {
    fn from(e: OptionsError) -> Self {
        Self::Options(e)
    }
}

/// Errors from encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// The output buffer could not be allocated.
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
    },
    /// A required field is absent (only with `check_required`).
    MissingRequired {
        /// Message type name.
        message: String,
        /// The missing field.
        field: FieldNumber,
    },
    /// The message tree is nested deeper than the configured limit.
    DepthExceeded {
        /// The configured limit.
        limit: u32,
    },
    /// The encode options are invalid.
    Options(OptionsError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory allocating {requested} bytes")
            }
            Self::MissingRequired { message, field } => {
                write!(f, "{message}: required field {field} missing")
            }
            Self::DepthExceeded { limit } => write!(f, "nesting depth exceeds limit {limit}"),
            Self::Options(e) => write!(f, "{e}"),
        }
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Options(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OptionsError> for EncodeError {
    fn from(e: OptionsError) -> Self {
        Self::Options(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_arena::RegionId;

    #[test]
    fn wire_errors_map_to_malformed() {
        let e: DecodeError = WireError::LengthOverrun {
            offset: 3,
            declared: 10,
            available: 3,
        }
        .into();
        assert_eq!(
            e,
            DecodeError::Malformed {
                offset: 3,
                reason: MalformedReason::LengthOverrun
            }
        );
    }

    #[test]
    fn nesting_maps_to_depth() {
        let e: DecodeError = WireError::NestingTooDeep { limit: 7 }.into();
        assert_eq!(e, DecodeError::DepthExceeded { limit: 7 });
    }

    #[test]
    fn arena_oom_maps_to_oom() {
        let e: DecodeError = ArenaError::OutOfMemory {
            requested: 64,
            limit: 128,
        }
        .into();
        assert_eq!(e, DecodeError::OutOfMemory { requested: 64 });
        let e: DecodeError = ArenaError::StaleHandle {
            region: RegionId::NULL,
        }
        .into();
        assert!(e.source().is_some());
    }
}
