//! Automatic field placement.
//!
//! [`MessageLayout`] collects field declarations and assigns offsets:
//! has-bits first, then oneof case slots, then oneof storage, then the
//! remaining fields ordered by alignment so padding stays small.

use strand_core::{EnumId, FieldNumber, TableId};

use crate::error::SchemaError;
use crate::field::{FieldDescriptor, FieldMode, FieldType, Presence, SubRef};
use crate::table::{ExtMode, MiniTable};

/// Cardinality and presence of a declared field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// Singular, zero means unset.
    Implicit,
    /// Singular with a has-bit.
    Optional,
    /// Singular with a has-bit, must be present after decoding when
    /// required-field checking is enabled.
    Required,
    /// Repeated, emitted unpacked.
    Repeated,
    /// Repeated, emitted packed.
    Packed,
}

#[derive(Clone, Debug)]
struct Decl {
    number: u32,
    field_type: FieldType,
    label: Label,
    sub: SubRef,
    oneof: Option<usize>,
}

/// Builder that lays out a message's fields and produces a [`MiniTable`].
///
/// ```
/// use strand_schema::{FieldType, MessageLayout};
///
/// let table = MessageLayout::new("Point")
///     .field(1, FieldType::SInt32)
///     .field(2, FieldType::SInt32)
///     .build()
///     .unwrap();
/// assert_eq!(table.fields().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct MessageLayout {
    name: String,
    decls: Vec<Decl>,
    oneofs: usize,
    ext_mode: ExtMode,
}

impl MessageLayout {
    /// Start a layout for the message type `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decls: Vec::new(),
            oneofs: 0,
            ext_mode: ExtMode::NonExtendable,
        }
    }

    /// Declare a field with full control over label and sub-reference.
    pub fn add(mut self, number: u32, field_type: FieldType, label: Label, sub: SubRef) -> Self {
        self.decls.push(Decl {
            number,
            field_type,
            label,
            sub,
            oneof: None,
        });
        self
    }

    /// Singular field with implicit presence.
    pub fn field(self, number: u32, field_type: FieldType) -> Self {
        self.add(number, field_type, Label::Implicit, SubRef::None)
    }

    /// Singular field with a has-bit.
    pub fn optional(self, number: u32, field_type: FieldType) -> Self {
        self.add(number, field_type, Label::Optional, SubRef::None)
    }

    /// Required field.
    pub fn required(self, number: u32, field_type: FieldType) -> Self {
        self.add(number, field_type, Label::Required, SubRef::None)
    }

    /// Unpacked repeated field.
    pub fn repeated(self, number: u32, field_type: FieldType) -> Self {
        self.add(number, field_type, Label::Repeated, SubRef::None)
    }

    /// Packed repeated field.
    pub fn packed(self, number: u32, field_type: FieldType) -> Self {
        self.add(number, field_type, Label::Packed, SubRef::None)
    }

    /// Singular sub-message field.
    pub fn message(self, number: u32, table: TableId) -> Self {
        self.add(number, FieldType::Message, Label::Implicit, SubRef::Message(table))
    }

    /// Repeated sub-message field.
    pub fn repeated_message(self, number: u32, table: TableId) -> Self {
        self.add(number, FieldType::Message, Label::Repeated, SubRef::Message(table))
    }

    /// Singular group field.
    pub fn group(self, number: u32, table: TableId) -> Self {
        self.add(number, FieldType::Group, Label::Implicit, SubRef::Message(table))
    }

    /// Enum field validated against `enum_id`.
    pub fn enumeration(self, number: u32, enum_id: EnumId, label: Label) -> Self {
        self.add(number, FieldType::Enum, label, SubRef::Enum(enum_id))
    }

    /// Declare a oneof. Members are `(number, type, sub)`; they share
    /// one storage slot sized for the largest member.
    pub fn oneof(mut self, members: impl IntoIterator<Item = (u32, FieldType, SubRef)>) -> Self {
        let group = self.oneofs;
        self.oneofs += 1;
        for (number, field_type, sub) in members {
            self.decls.push(Decl {
                number,
                field_type,
                label: Label::Implicit,
                sub,
                oneof: Some(group),
            });
        }
        self
    }

    /// Accept extensions.
    pub fn extendable(mut self) -> Self {
        self.ext_mode = ExtMode::Extendable;
        self
    }

    /// Assign offsets and build the table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidFieldNumber`] for numbers outside
    /// `1..=2^29-1`, and any error [`MiniTable::new`] reports.
    pub fn build(self) -> Result<MiniTable, SchemaError> {
        let mut descs = Vec::with_capacity(self.decls.len());
        for d in &self.decls {
            let Some(number) = FieldNumber::new(d.number) else {
                return Err(SchemaError::InvalidFieldNumber {
                    table: self.name,
                    number: d.number,
                });
            };
            let mode = match d.label {
                Label::Repeated => FieldMode::Repeated { packed: false },
                Label::Packed => FieldMode::Repeated { packed: true },
                _ => FieldMode::Scalar,
            };
            descs.push(FieldDescriptor {
                number,
                offset: 0,
                presence: Presence::Implicit,
                field_type: d.field_type,
                mode,
                sub: d.sub,
                required: d.label == Label::Required,
            });
        }

        let mut next_hasbit: u16 = 0;
        for (d, desc) in self.decls.iter().zip(descs.iter_mut()) {
            if matches!(d.label, Label::Optional | Label::Required) && d.oneof.is_none() {
                desc.presence = Presence::HasBit(next_hasbit);
                next_hasbit += 1;
            }
        }
        let mut cursor = u32::from(next_hasbit).div_ceil(8);

        let mut case_offsets = Vec::with_capacity(self.oneofs);
        for _ in 0..self.oneofs {
            cursor = align_up(cursor, 4);
            case_offsets.push(cursor);
            cursor += 4;
        }
        for (group, &case_offset) in case_offsets.iter().enumerate() {
            let members = || {
                self.decls
                    .iter()
                    .zip(descs.iter())
                    .filter(move |(d, _)| d.oneof == Some(group))
            };
            let size = members().map(|(_, f)| f.storage_size()).max().unwrap_or(0);
            let align = members().map(|(_, f)| f.storage_align()).max().unwrap_or(1);
            cursor = align_up(cursor, align);
            let data_offset = cursor;
            cursor += size;
            for (d, desc) in self.decls.iter().zip(descs.iter_mut()) {
                if d.oneof == Some(group) {
                    desc.offset = data_offset;
                    desc.presence = Presence::Oneof { case_offset };
                }
            }
        }

        let mut rest: Vec<usize> = (0..descs.len())
            .filter(|&i| self.decls[i].oneof.is_none())
            .collect();
        rest.sort_by_key(|&i| std::cmp::Reverse(descs[i].storage_align()));
        for i in rest {
            cursor = align_up(cursor, descs[i].storage_align());
            descs[i].offset = cursor;
            cursor += descs[i].storage_size();
        }

        let size = align_up(cursor, 8);
        MiniTable::new(self.name, size, descs, self.ext_mode)
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const TYPES: [FieldType; 6] = [
        FieldType::Bool,
        FieldType::Int32,
        FieldType::Int64,
        FieldType::Double,
        FieldType::String,
        FieldType::Bytes,
    ];

    proptest! {
        #[test]
        fn layouts_always_validate(
            specs in prop::collection::btree_map(1u32..3000, (0usize..6, 0u8..4), 0..40),
        ) {
            let mut layout = MessageLayout::new("P");
            for (&number, &(ty, label)) in &specs {
                let label = match label {
                    0 => Label::Implicit,
                    1 => Label::Optional,
                    2 => Label::Repeated,
                    _ => Label::Required,
                };
                layout = layout.add(number, TYPES[ty], label, SubRef::None);
            }
            let table = layout.build().unwrap();
            prop_assert_eq!(table.fields().len(), specs.len());
            prop_assert_eq!(table.size() % 8, 0);
        }
    }
}
