//! Strongly-typed identifiers: field numbers and schema table indices.

use std::fmt;
use std::ops::RangeInclusive;

/// A validated field number in `1..=536_870_911`.
///
/// Field numbers are the on-the-wire identity of a field. They are
/// packed into the upper 29 bits of a 32-bit tag, so the maximum is
/// `2^29 - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldNumber(u32);

impl FieldNumber {
    /// Smallest valid field number.
    pub const MIN: u32 = 1;

    /// Largest valid field number (`2^29 - 1`).
    pub const MAX: u32 = (1 << 29) - 1;

    /// Field numbers reserved by the format for internal use.
    pub const RESERVED: RangeInclusive<u32> = 19_000..=19_999;

    /// Validate a raw field number.
    ///
    /// Returns `None` for 0 and for values above [`FieldNumber::MAX`].
    /// Reserved numbers are accepted here; schema construction rejects
    /// them separately (see [`FieldNumber::is_reserved`]) because they
    /// can still legitimately appear on the wire as unknown fields.
    pub const fn new(value: u32) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The raw number.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this number lies in the reserved `19000..=19999` block.
    pub fn is_reserved(self) -> bool {
        Self::RESERVED.contains(&self.0)
    }
}

impl fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for FieldNumber {
    type Error = u32;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::new(v).ok_or(v)
    }
}

impl From<FieldNumber> for u32 {
    fn from(n: FieldNumber) -> Self {
        n.0
    }
}

/// Index of a message table within a schema set.
///
/// `TableId(n)` is the n-th message declared in the set. Sub-message
/// references are stored as `TableId`s rather than pointers, which is
/// what allows recursive and mutually recursive message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Index of an enum validity table within a schema set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub u32);

impl fmt::Display for EnumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EnumId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_overflow_rejected() {
        assert!(FieldNumber::new(0).is_none());
        assert!(FieldNumber::new(FieldNumber::MAX + 1).is_none());
        assert_eq!(FieldNumber::new(FieldNumber::MAX).map(FieldNumber::get), Some(536_870_911));
    }

    #[test]
    fn reserved_block() {
        assert!(FieldNumber::new(19_000).unwrap().is_reserved());
        assert!(FieldNumber::new(19_999).unwrap().is_reserved());
        assert!(!FieldNumber::new(20_000).unwrap().is_reserved());
        assert!(!FieldNumber::new(18_999).unwrap().is_reserved());
    }

    #[test]
    fn try_from_reports_raw_value() {
        assert_eq!(FieldNumber::try_from(0), Err(0));
        assert_eq!(FieldNumber::try_from(5).map(u32::from), Ok(5));
    }
}
