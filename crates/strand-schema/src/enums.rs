//! Enum validity tables.

/// The set of values a closed enum accepts.
///
/// Open enums accept every value. Closed enums accept only declared
/// values; the decoder diverts anything else to the unknown-field
/// area (or rejects it, depending on policy).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumTable {
    name: String,
    values: Vec<i32>,
    /// Bit `v` set when `v` in `0..64` is declared.
    low_mask: u64,
    open: bool,
}

impl EnumTable {
    /// A closed enum accepting exactly `values`.
    pub fn closed(name: impl Into<String>, values: impl IntoIterator<Item = i32>) -> Self {
        let mut values: Vec<i32> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        let low_mask = values
            .iter()
            .filter(|v| (0..64).contains(*v))
            .fold(0u64, |m, &v| m | (1 << v));
        Self {
            name: name.into(),
            values,
            low_mask,
            open: false,
        }
    }

    /// An open enum: declared `values` are recorded, all values accepted.
    pub fn open(name: impl Into<String>, values: impl IntoIterator<Item = i32>) -> Self {
        let mut table = Self::closed(name, values);
        table.open = true;
        table
    }

    /// Enum name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether every value is accepted.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Declared values in ascending order.
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Whether `value` was declared.
    pub fn contains(&self, value: i32) -> bool {
        if (0..64).contains(&value) {
            return self.low_mask & (1 << value) != 0;
        }
        self.values.binary_search(&value).is_ok()
    }

    /// Whether the decoder may store `value` in the field.
    pub fn accepts(&self, value: i32) -> bool {
        self.open || self.contains(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_enum_checks_membership() {
        let e = EnumTable::closed("Color", [2, 0, 1, 100, -5]);
        assert_eq!(e.values(), &[-5, 0, 1, 2, 100]);
        assert!(e.accepts(0));
        assert!(e.accepts(100));
        assert!(e.accepts(-5));
        assert!(!e.accepts(3));
        assert!(!e.accepts(64));
        assert!(!e.accepts(i32::MIN));
    }

    #[test]
    fn open_enum_accepts_everything() {
        let e = EnumTable::open("Open", [0, 1]);
        assert!(e.accepts(99));
        assert!(!e.contains(99));
        assert!(e.contains(1));
    }

    #[test]
    fn low_mask_boundary() {
        let e = EnumTable::closed("Edge", [63, 64]);
        assert!(e.contains(63));
        assert!(e.contains(64));
        assert!(!e.contains(62));
    }
}
