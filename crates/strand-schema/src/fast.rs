//! Fast dispatch table keyed by the leading bytes of a tag.
//!
//! Most messages are dominated by fields with small numbers, whose tags
//! encode in one or two bytes. The decoder peeks those bytes, masks a
//! few bits of the first byte into a slot index, and compares the
//! slot's expected key. A hit resolves the field without any search;
//! a miss (empty slot, collision, or a tag longer than two bytes) falls
//! back to the generic lookup.

use crate::field::FieldDescriptor;

/// One populated dispatch slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FastEntry {
    /// Expected tag bytes, little-endian (see `Tag::fast_key`).
    pub key: u16,
    /// Index into the table's sorted field list.
    pub field_index: u16,
}

/// Power-of-two array of dispatch slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastTable {
    slots: Vec<Option<FastEntry>>,
    mask: u16,
}

impl FastTable {
    /// Upper bound on the slot count.
    pub const MAX_SLOTS: usize = 32;

    /// Build the table for `fields` (sorted by number).
    ///
    /// Each field is keyed on its primary tag. Fields whose key would
    /// land in an occupied slot, or whose tag is longer than two bytes,
    /// are left to the generic path.
    pub fn build(fields: &[FieldDescriptor]) -> Self {
        let len = fields.len().next_power_of_two().clamp(1, Self::MAX_SLOTS);
        let mask = ((len - 1) as u16) << 3;
        let mut slots = vec![None; len];
        for (index, field) in fields.iter().enumerate() {
            let Ok(field_index) = u16::try_from(index) else {
                break;
            };
            let Some(key) = field.tag().fast_key() else {
                continue;
            };
            let slot = usize::from((key & mask) >> 3);
            if slots[slot].is_none() {
                slots[slot] = Some(FastEntry { key, field_index });
            }
        }
        Self { slots, mask }
    }

    /// Resolve a peeked key to a field index, if it hits.
    #[inline]
    pub fn lookup(&self, key: u16) -> Option<usize> {
        let slot = usize::from((key & self.mask) >> 3);
        match self.slots[slot] {
            Some(entry) if entry.key == key => Some(usize::from(entry.field_index)),
            _ => None,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: a table has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of populated slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Slot entries in index order.
    pub fn entries(&self) -> impl Iterator<Item = Option<FastEntry>> + '_ {
        self.slots.iter().copied()
    }
}
