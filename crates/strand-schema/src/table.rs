//! Per-message-type tables.
//!
//! A [`MiniTable`] is the runtime description of one message type:
//! its field list sorted by number, the byte layout of its field
//! storage, presence tracking, oneofs and the fast dispatch table.
//! Tables are immutable once built and shared freely across threads.

use smallvec::SmallVec;
use strand_core::FieldNumber;

use crate::error::SchemaError;
use crate::fast::FastTable;
use crate::field::{FieldDescriptor, FieldMode, FieldType, Presence, SubRef};

/// Whether a message type accepts extensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExtMode {
    /// Unregistered numbers always go to unknown fields.
    #[default]
    NonExtendable,
    /// Numbers registered in an extension registry are decoded as
    /// extensions.
    Extendable,
}

/// A oneof group: member fields sharing one case slot and one storage range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneofDescriptor {
    /// Offset of the `u32` case slot holding the active field number.
    pub case_offset: u32,
    /// Member field numbers in ascending order.
    pub members: SmallVec<[FieldNumber; 4]>,
}

/// Immutable description of one message type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiniTable {
    name: String,
    size: u32,
    align: u32,
    hasbit_bytes: u32,
    fields: Vec<FieldDescriptor>,
    dense_below: u32,
    fast: FastTable,
    oneofs: Vec<OneofDescriptor>,
    required: SmallVec<[u16; 4]>,
    ext_mode: ExtMode,
}

impl MiniTable {
    /// Build a table from explicitly placed fields.
    ///
    /// `size` is the byte size of the field storage; the has-bit area
    /// occupies its first `ceil(max_hasbit / 8)` bytes. Fields may be
    /// given in any order. Sub-table references are only checked for
    /// kind here; [`SchemaBuilder::build`](crate::SchemaBuilder::build)
    /// checks that they resolve.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for invalid or duplicate numbers,
    /// storage that is out of bounds, misaligned or overlapping, has-bit
    /// collisions, inconsistent presence, packing of non-packable
    /// types, or a sub-reference of the wrong kind.
    pub fn new(
        name: impl Into<String>,
        size: u32,
        mut fields: Vec<FieldDescriptor>,
        ext_mode: ExtMode,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        fields.sort_by_key(|f| f.number);

        for pair in fields.windows(2) {
            if pair[0].number == pair[1].number {
                return Err(SchemaError::DuplicateFieldNumber {
                    table: name,
                    number: pair[0].number.get(),
                });
            }
        }

        let mut hasbits: Vec<u16> = Vec::new();
        for f in &fields {
            check_field(&name, f)?;
            if let Presence::HasBit(index) = f.presence {
                hasbits.push(index);
            }
        }
        hasbits.sort_unstable();
        for pair in hasbits.windows(2) {
            if pair[0] == pair[1] {
                return Err(SchemaError::HasBitCollision {
                    table: name,
                    index: pair[0],
                });
            }
        }
        let hasbit_bytes = hasbits.last().map_or(0, |&max| u32::from(max) / 8 + 1);

        check_layout(&name, size, hasbit_bytes, &fields)?;

        let dense_below = fields
            .iter()
            .enumerate()
            .take_while(|(i, f)| f.number.get() as usize == i + 1)
            .count() as u32;

        let mut oneofs: Vec<OneofDescriptor> = Vec::new();
        for f in &fields {
            if let Some(case_offset) = f.oneof_case() {
                match oneofs.iter_mut().find(|o| o.case_offset == case_offset) {
                    Some(o) => o.members.push(f.number),
                    None => oneofs.push(OneofDescriptor {
                        case_offset,
                        members: SmallVec::from_elem(f.number, 1),
                    }),
                }
            }
        }

        let required = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.required)
            .map(|(i, _)| i as u16)
            .collect();

        let align = fields
            .iter()
            .map(FieldDescriptor::storage_align)
            .chain(oneofs.iter().map(|_| 4))
            .max()
            .unwrap_or(1);

        let fast = FastTable::build(&fields);
        tracing::trace!(
            table = %name,
            fields = fields.len(),
            fast_slots = fast.len(),
            fast_hits = fast.occupied(),
            "mini table built"
        );

        Ok(Self {
            name,
            size,
            align,
            hasbit_bytes,
            fields,
            dense_below,
            fast,
            oneofs,
            required,
            ext_mode,
        })
    }

    /// Message type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte size of the field storage.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Strictest alignment of any stored field.
    pub fn align(&self) -> u32 {
        self.align
    }

    /// Bytes at the start of field storage holding has-bits.
    pub fn hasbit_bytes(&self) -> u32 {
        self.hasbit_bytes
    }

    /// Fields in ascending number order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field at `index` in [`fields`](Self::fields).
    pub fn field_at(&self, index: usize) -> &FieldDescriptor {
        &self.fields[index]
    }

    /// Fields numbered `1..=dense_below` are at index `number - 1`.
    pub fn dense_below(&self) -> u32 {
        self.dense_below
    }

    /// Index of the field numbered `number`, if any.
    pub fn field_index(&self, number: FieldNumber) -> Option<usize> {
        let n = number.get();
        if n <= self.dense_below {
            return Some(n as usize - 1);
        }
        self.fields.binary_search_by_key(&number, |f| f.number).ok()
    }

    /// The field numbered `number`, if any.
    pub fn field(&self, number: FieldNumber) -> Option<&FieldDescriptor> {
        self.field_index(number).map(|i| &self.fields[i])
    }

    /// The fast dispatch table.
    pub fn fast_table(&self) -> &FastTable {
        &self.fast
    }

    /// Oneof groups, in order of their first member.
    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// The oneof containing `number`, if any.
    pub fn oneof_of(&self, number: FieldNumber) -> Option<&OneofDescriptor> {
        let case = self.field(number)?.oneof_case()?;
        self.oneofs.iter().find(|o| o.case_offset == case)
    }

    /// Required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.required.iter().map(|&i| &self.fields[usize::from(i)])
    }

    /// Whether any field is required.
    pub fn has_required(&self) -> bool {
        !self.required.is_empty()
    }

    /// Extension mode.
    pub fn ext_mode(&self) -> ExtMode {
        self.ext_mode
    }

    /// Whether extensions may be registered against this table.
    pub fn is_extendable(&self) -> bool {
        self.ext_mode == ExtMode::Extendable
    }
}

fn check_field(table: &str, f: &FieldDescriptor) -> Result<(), SchemaError> {
    let number = f.number.get();
    if f.number.is_reserved() {
        return Err(SchemaError::ReservedFieldNumber {
            table: table.to_owned(),
            number,
        });
    }
    let presence_err = |reason| SchemaError::InvalidPresence {
        table: table.to_owned(),
        number,
        reason,
    };
    match (f.mode, f.presence) {
        (FieldMode::Repeated { .. }, Presence::HasBit(_)) => {
            return Err(presence_err("repeated fields have no has-bit"))
        }
        (FieldMode::Repeated { .. }, Presence::Oneof { .. }) => {
            return Err(presence_err("repeated fields cannot be oneof members"))
        }
        (FieldMode::Repeated { packed: true }, _) if !f.field_type.is_packable() => {
            return Err(SchemaError::NotPackable {
                table: table.to_owned(),
                number,
            })
        }
        _ => {}
    }
    if f.required && !matches!(f.presence, Presence::HasBit(_)) {
        return Err(presence_err("required fields need a has-bit"));
    }
    let sub_ok = match (f.field_type, f.sub) {
        (FieldType::Message | FieldType::Group, SubRef::Message(_)) => true,
        (FieldType::Enum, SubRef::Enum(_)) => true,
        (FieldType::Message | FieldType::Group | FieldType::Enum, _) => false,
        (_, SubRef::None) => true,
        _ => false,
    };
    if !sub_ok {
        return Err(SchemaError::SubReference {
            table: table.to_owned(),
            number,
            reason: format!("{:?} field has sub-reference {:?}", f.field_type, f.sub),
        });
    }
    Ok(())
}

/// A claimed byte range. `group` is the oneof case offset for members,
/// which may share storage with each other.
struct Span {
    start: u32,
    end: u32,
    owner: u32,
    group: Option<u32>,
}

fn check_layout(
    table: &str,
    size: u32,
    hasbit_bytes: u32,
    fields: &[FieldDescriptor],
) -> Result<(), SchemaError> {
    let mut spans = Vec::with_capacity(fields.len() + 2);
    if hasbit_bytes > 0 {
        spans.push(Span {
            start: 0,
            end: hasbit_bytes,
            owner: 0,
            group: None,
        });
    }
    for f in fields {
        let number = f.number.get();
        let len = f.storage_size();
        let align = f.storage_align();
        let end = f.offset.checked_add(len).filter(|&e| e <= size);
        let Some(end) = end else {
            return Err(SchemaError::FieldOutOfBounds {
                table: table.to_owned(),
                number,
                offset: f.offset,
                size,
            });
        };
        if f.offset % align != 0 {
            return Err(SchemaError::MisalignedField {
                table: table.to_owned(),
                number,
                offset: f.offset,
                align,
            });
        }
        let group = f.oneof_case();
        spans.push(Span {
            start: f.offset,
            end,
            owner: number,
            group,
        });
        if let Some(case) = group {
            if spans.iter().any(|s| s.owner == 0 && s.start == case && s.group == Some(case)) {
                continue;
            }
            if case % 4 != 0 || case.checked_add(4).is_none_or(|e| e > size) {
                return Err(SchemaError::FieldOutOfBounds {
                    table: table.to_owned(),
                    number,
                    offset: case,
                    size,
                });
            }
            // Case slot: owned by nobody, but tagged with its group so
            // repeat members do not re-add it.
            spans.push(Span {
                start: case,
                end: case + 4,
                owner: 0,
                group: Some(case),
            });
        }
    }
    for (i, a) in spans.iter().enumerate() {
        for b in &spans[i + 1..] {
            if a.start >= b.end || b.start >= a.end {
                continue;
            }
            let shared = a.owner != 0 && b.owner != 0 && a.group.is_some() && a.group == b.group;
            if !shared {
                return Err(SchemaError::OverlappingFields {
                    table: table.to_owned(),
                    first: a.owner,
                    second: b.owner,
                });
            }
        }
    }
    Ok(())
}
