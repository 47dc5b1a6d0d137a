//! Table-driven wire decoder.
//!
//! Each tag is first tried against the table's fast dispatch slots
//! (one or two peeked bytes, one compare). Misses go through the
//! generic path: field lookup by number, then the extension registry,
//! then the unknown-field buffer.
//!
//! Wire rules applied here:
//! - last occurrence wins for singular scalars, strings and bytes;
//! - sub-messages seen twice are merged;
//! - repeated numeric fields accept packed and unpacked forms;
//! - a known field arriving with the wrong wire type is kept as unknown.

use bytes::Bytes;
use strand_arena::{Arena, Ptr};
use strand_core::{encode_varint, FieldNumber, Tag, WireError, WireReader, WireType};
use strand_schema::{
    ExtensionRegistry, FieldDescriptor, FieldType, MiniTable, Schema, SubRef,
};

use crate::config::{DecodeOptions, UnknownEnumPolicy};
use crate::error::{DecodeError, MalformedReason};
use crate::extension;
use crate::message::{self, sub_table, MessageRef};
use crate::repeated;
use crate::required;
use crate::scalar;

/// Reusable decoder bound to a schema, an optional extension registry
/// and a set of options.
///
/// A `Decoder` only borrows shared, read-only state, so one decoder
/// (or many) can run on different threads at once, each with its own
/// arena.
#[derive(Clone, Debug)]
pub struct Decoder<'s> {
    schema: &'s Schema,
    extensions: Option<&'s ExtensionRegistry>,
    options: DecodeOptions,
}

impl<'s> Decoder<'s> {
    /// A decoder with default options and no extensions.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            extensions: None,
            options: DecodeOptions::default(),
        }
    }

    /// Resolve extensions through `registry`.
    ///
    /// # Panics
    ///
    /// Panics if `registry` was built for another schema.
    pub fn with_extensions(mut self, registry: &'s ExtensionRegistry) -> Self {
        assert_eq!(
            registry.schema_id(),
            self.schema.id(),
            "extension registry belongs to another schema"
        );
        self.extensions = Some(registry);
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// The active options.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode `input` as a new message of type `table`.
    ///
    /// String and bytes fields are copied into `arena`.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]. On error the arena may hold a partly
    /// populated message, which must be discarded.
    pub fn decode(
        &self,
        input: &[u8],
        table: strand_core::TableId,
        arena: &mut Arena,
    ) -> Result<MessageRef, DecodeError> {
        let msg = MessageRef::new(self.schema, table, arena)?;
        self.run(input, msg, arena, None)?;
        Ok(msg)
    }

    /// Decode a shared buffer as a new message of type `table`.
    ///
    /// With `alias` set in the options, string and bytes fields point
    /// into `input` instead of being copied; the arena keeps a
    /// reference to the buffer, so it stays valid for as long as the
    /// arena does.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`].
    pub fn decode_shared(
        &self,
        input: &Bytes,
        table: strand_core::TableId,
        arena: &mut Arena,
    ) -> Result<MessageRef, DecodeError> {
        let msg = MessageRef::new(self.schema, table, arena)?;
        let alias = if self.options.alias {
            Some(arena.adopt(input.clone())?)
        } else {
            None
        };
        self.run(input, msg, arena, alias)?;
        Ok(msg)
    }

    /// Decode `input` into an existing message, merging with what is
    /// already there.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; [`DecodeError::Arena`] if `msg` does not
    /// resolve in `arena`.
    ///
    /// # Panics
    ///
    /// Panics if `msg` was created for another schema.
    pub fn decode_into(
        &self,
        input: &[u8],
        msg: MessageRef,
        arena: &mut Arena,
    ) -> Result<(), DecodeError> {
        if !msg.check(self.schema, arena)? {
            panic!("message at {} does not belong to {}", msg.ptr(), self.schema.id());
        }
        self.run(input, msg, arena, None)
    }

    fn run(
        &self,
        input: &[u8],
        msg: MessageRef,
        arena: &mut Arena,
        alias: Option<Ptr>,
    ) -> Result<(), DecodeError> {
        self.options.validate()?;
        let mut state = State {
            schema: self.schema,
            extensions: self.extensions,
            options: &self.options,
            arena,
            alias,
        };
        let mut reader = WireReader::new(input);
        let mut result = state.message(&mut reader, msg, 0, None);
        if result.is_ok() && self.options.check_required {
            result = required::check(self.schema, state.arena, msg, self.options.max_depth)
                .map_err(|missing| DecodeError::MissingRequired {
                    message: missing.message,
                    field: missing.field,
                });
        }
        if let Err(e) = &result {
            tracing::debug!(
                table = self.schema.table(msg.table()).name(),
                input_len = input.len(),
                error = %e,
                "decode failed"
            );
        }
        result
    }
}

/// Decode `input` as a new message of type `table` with `options`.
///
/// # Errors
///
/// Any [`DecodeError`].
pub fn decode(
    schema: &Schema,
    input: &[u8],
    table: strand_core::TableId,
    arena: &mut Arena,
    options: &DecodeOptions,
) -> Result<MessageRef, DecodeError> {
    Decoder::new(schema)
        .with_options(options.clone())
        .decode(input, table, arena)
}

/// Where a decoded field value is stored.
#[derive(Clone, Copy)]
enum Target {
    /// A regular field of the message.
    Field,
    /// The value slot of an extension entry, and whether this entry
    /// was created for the current value.
    Extension { slot: Ptr, fresh: bool },
}

struct State<'d> {
    schema: &'d Schema,
    extensions: Option<&'d ExtensionRegistry>,
    options: &'d DecodeOptions,
    arena: &'d mut Arena,
    /// Base of the adopted input region when aliasing.
    alias: Option<Ptr>,
}

impl State<'_> {
    fn message(
        &mut self,
        r: &mut WireReader<'_>,
        msg: MessageRef,
        depth: u32,
        group: Option<FieldNumber>,
    ) -> Result<(), DecodeError> {
        let schema = self.schema;
        let table = schema.table(msg.table());
        loop {
            if r.is_at_limit() {
                return match group {
                    None => Ok(()),
                    Some(number) => Err(WireError::UnterminatedGroup {
                        offset: r.position(),
                        number: number.get(),
                    }
                    .into()),
                };
            }
            let start = r.position();
            let fast = r
                .peek_fast_key()
                .and_then(|key| table.fast_table().lookup(key).map(|index| (key, index)));
            let (tag, index) = match fast {
                Some((key, index)) => {
                    r.advance(if key > 0xff { 2 } else { 1 });
                    (table.field_at(index).tag(), Some(index))
                }
                None => {
                    let tag = r.read_tag()?;
                    (tag, table.field_index(tag.number))
                }
            };

            if tag.wire_type == WireType::EndGroup {
                return match group {
                    Some(number) if number == tag.number => Ok(()),
                    _ => Err(WireError::GroupMismatch {
                        offset: start,
                        expected: group.map_or(0, FieldNumber::get),
                        found: tag.number.get(),
                    }
                    .into()),
                };
            }

            if let Some(index) = index {
                let field = table.field_at(index);
                if accepts_wire_type(field, tag.wire_type) {
                    self.field(r, msg, table, field, Target::Field, tag, start, depth)?;
                    continue;
                }
            } else if table.is_extendable() {
                let ext = self
                    .extensions
                    .and_then(|registry| registry.lookup(msg.table(), tag.number));
                if let Some(ext) = ext {
                    if accepts_wire_type(&ext.descriptor, tag.wire_type) {
                        let fresh = extension::find(self.arena, msg, tag.number).is_none();
                        let entry = extension::find_or_insert(self.arena, msg, &ext.descriptor)?;
                        let target = Target::Extension {
                            slot: extension::slot(entry),
                            fresh,
                        };
                        self.field(r, msg, table, &ext.descriptor, target, tag, start, depth)?;
                        continue;
                    }
                }
            }
            self.unknown(r, msg, tag, start, depth)?;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn field(
        &mut self,
        r: &mut WireReader<'_>,
        msg: MessageRef,
        table: &MiniTable,
        field: &FieldDescriptor,
        target: Target,
        tag: Tag,
        start: usize,
        depth: u32,
    ) -> Result<(), DecodeError> {
        let slot = match target {
            Target::Field => msg.field_ptr(field),
            Target::Extension { slot, .. } => slot,
        };
        let ft = field.field_type;

        if field.is_repeated() {
            if tag.wire_type == WireType::LengthDelimited && ft.is_packable() {
                return self.packed(r, msg, field, slot);
            }
            return match ft {
                FieldType::Message | FieldType::Group => {
                    let child = MessageRef::new(self.schema, sub_table(field), self.arena)?;
                    let elem = repeated::push(self.arena, slot, field.element_size())?;
                    self.arena.write_ptr(elem, child.ptr());
                    self.sub_message(r, child, tag, depth)
                }
                FieldType::String | FieldType::Bytes => {
                    let (data, len) = self.string(r, ft)?;
                    let elem = repeated::push(self.arena, slot, field.element_size())?;
                    message::write_view(self.arena, elem, data, len);
                    Ok(())
                }
                _ => {
                    let raw = scalar::read_raw(r, ft)?;
                    if self.enum_rejected(field, raw)? {
                        let bytes = &r.input()[start..r.position()];
                        return self.keep_unknown(msg, bytes);
                    }
                    let elem = repeated::push(self.arena, slot, field.element_size())?;
                    message::write_raw(self.arena, elem, ft.rep(), raw);
                    Ok(())
                }
            };
        }

        match ft {
            FieldType::Message | FieldType::Group => {
                if let Target::Field = target {
                    message::mark_present(self.arena, msg, table, field);
                }
                let child =
                    message::get_or_create_child(self.schema, self.arena, slot, sub_table(field))?;
                self.sub_message(r, child, tag, depth)
            }
            FieldType::String | FieldType::Bytes => {
                let (data, len) = self.string(r, ft)?;
                if let Target::Field = target {
                    message::mark_present(self.arena, msg, table, field);
                }
                message::write_view(self.arena, slot, data, len);
                Ok(())
            }
            _ => {
                let raw = scalar::read_raw(r, ft)?;
                if self.enum_rejected(field, raw)? {
                    if let Target::Extension { fresh: true, .. } = target {
                        extension::remove(self.arena, msg, field.number);
                    }
                    let bytes = &r.input()[start..r.position()];
                    return self.keep_unknown(msg, bytes);
                }
                if let Target::Field = target {
                    message::mark_present(self.arena, msg, table, field);
                }
                message::write_raw(self.arena, slot, ft.rep(), raw);
                Ok(())
            }
        }
    }

    fn packed(
        &mut self,
        r: &mut WireReader<'_>,
        msg: MessageRef,
        field: &FieldDescriptor,
        slot: Ptr,
    ) -> Result<(), DecodeError> {
        let ft = field.field_type;
        let offset = r.position();
        let len = r.read_varint()?;
        r.push_limit(len, offset)?;
        if let Some(width) = scalar::fixed_width(ft) {
            repeated::reserve(self.arena, slot, field.element_size(), len as usize / width)?;
        }
        while !r.is_at_limit() {
            let raw = scalar::read_raw(r, ft)?;
            if self.enum_rejected(field, raw)? {
                let mut record = Vec::with_capacity(16);
                Tag::new(field.number, WireType::Varint).encode(&mut record);
                encode_varint(scalar::raw_to_varint(ft, raw), &mut record);
                self.keep_unknown(msg, &record)?;
                continue;
            }
            let elem = repeated::push(self.arena, slot, field.element_size())?;
            message::write_raw(self.arena, elem, ft.rep(), raw);
        }
        r.pop_limit();
        Ok(())
    }

    fn sub_message(
        &mut self,
        r: &mut WireReader<'_>,
        child: MessageRef,
        tag: Tag,
        depth: u32,
    ) -> Result<(), DecodeError> {
        let depth = depth + 1;
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        if tag.wire_type == WireType::StartGroup {
            return self.message(r, child, depth, Some(tag.number));
        }
        let offset = r.position();
        let len = r.read_varint()?;
        r.push_limit(len, offset)?;
        self.message(r, child, depth, None)?;
        r.pop_limit();
        Ok(())
    }

    /// Read a length-delimited payload and store it (or alias it).
    fn string(&mut self, r: &mut WireReader<'_>, ft: FieldType) -> Result<(Ptr, u32), DecodeError> {
        let (start, data) = r.read_length_delimited()?;
        let check_utf8 = ft == FieldType::String && self.options.validate_utf8;
        if check_utf8 && std::str::from_utf8(data).is_err() {
            return Err(DecodeError::Malformed {
                offset: start,
                reason: MalformedReason::InvalidUtf8,
            });
        }
        if data.is_empty() {
            return Ok((Ptr::NULL, 0));
        }
        let ptr = match self.alias {
            Some(base) => base.offset(start as u32),
            None => self.arena.alloc_copy(data, 1)?,
        };
        Ok((ptr, data.len() as u32))
    }

    /// Whether a closed enum refuses `raw`, after applying the policy.
    fn enum_rejected(&self, field: &FieldDescriptor, raw: u64) -> Result<bool, DecodeError> {
        let SubRef::Enum(id) = field.sub else {
            return Ok(false);
        };
        let Some(table) = self.schema.enum_table(id) else {
            return Ok(false);
        };
        let value = raw as u32 as i32;
        if table.accepts(value) {
            return Ok(false);
        }
        match self.options.unknown_enum {
            UnknownEnumPolicy::PreserveAsUnknown => Ok(true),
            UnknownEnumPolicy::Reject => Err(DecodeError::UnknownEnumValue {
                field: field.number,
                value,
            }),
        }
    }

    fn unknown(
        &mut self,
        r: &mut WireReader<'_>,
        msg: MessageRef,
        tag: Tag,
        start: usize,
        depth: u32,
    ) -> Result<(), DecodeError> {
        let limit = self.options.max_depth;
        r.skip_value(tag, limit.saturating_sub(depth))
            .map_err(|e| match e {
                WireError::NestingTooDeep { .. } => DecodeError::DepthExceeded { limit },
                other => other.into(),
            })?;
        let bytes = &r.input()[start..r.position()];
        self.keep_unknown(msg, bytes)
    }

    fn keep_unknown(&mut self, msg: MessageRef, bytes: &[u8]) -> Result<(), DecodeError> {
        if self.options.discard_unknown {
            return Ok(());
        }
        repeated::append_bytes(self.arena, msg.unknown_slot(), bytes)?;
        Ok(())
    }
}

fn accepts_wire_type(field: &FieldDescriptor, wire_type: WireType) -> bool {
    let ft = field.field_type;
    wire_type == ft.wire_type()
        || (field.is_repeated() && ft.is_packable() && wire_type == WireType::LengthDelimited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use strand_core::TableId;
    use strand_schema::{EnumTable, Label, MessageLayout, SchemaBuilder};

    struct Fixture {
        schema: Schema,
        root: TableId,
    }

    fn fixture() -> Fixture {
        let mut b = SchemaBuilder::new();
        let color = b.add_enum(EnumTable::closed("Color", [0, 1, 2]));
        let root = b.declare("Root");
        b.define(
            root,
            MessageLayout::new("Root")
                .field(1, FieldType::Int32)
                .field(2, FieldType::String)
                .message(3, root)
                .packed(4, FieldType::Int32)
                .enumeration(5, color, Label::Implicit)
                .enumeration(6, color, Label::Packed)
                .group(7, root)
                .field(8, FieldType::Bytes),
        )
        .unwrap();
        Fixture {
            schema: b.build().unwrap(),
            root,
        }
    }

    #[test]
    fn decodes_scalar_150() {
        let f = fixture();
        let mut arena = Arena::new();
        let m = Decoder::new(&f.schema)
            .decode(&[0x08, 0x96, 0x01], f.root, &mut arena)
            .unwrap();
        assert_eq!(m.view(&f.schema, &arena).get(1), Some(Value::I32(150)));
    }

    #[test]
    fn last_scalar_wins() {
        let f = fixture();
        let mut arena = Arena::new();
        let m = Decoder::new(&f.schema)
            .decode(&[0x08, 0x01, 0x08, 0x02], f.root, &mut arena)
            .unwrap();
        assert_eq!(m.view(&f.schema, &arena).get(1), Some(Value::I32(2)));
    }

    #[test]
    fn truncated_length_is_malformed() {
        let f = fixture();
        let mut arena = Arena::new();
        let err = Decoder::new(&f.schema)
            .decode(&[0x12, 0x0a, b'a', b'b', b'c'], f.root, &mut arena)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed {
                reason: MalformedReason::LengthOverrun,
                ..
            }
        ));
    }

    #[test]
    fn invalid_utf8_rejected_unless_disabled() {
        let f = fixture();
        let input = [0x12, 0x02, 0xff, 0xfe];
        let mut arena = Arena::new();
        let err = Decoder::new(&f.schema)
            .decode(&input, f.root, &mut arena)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { reason: MalformedReason::InvalidUtf8, .. }));

        let m = Decoder::new(&f.schema)
            .with_options(DecodeOptions::default().with_validate_utf8(false))
            .decode(&input, f.root, &mut arena)
            .unwrap();
        assert_eq!(m.view(&f.schema, &arena).get(2), Some(Value::Bytes(&[0xff, 0xfe])));
    }

    #[test]
    fn sub_messages_merge() {
        let f = fixture();
        let mut arena = Arena::new();
        // {3: {1: 5}} then {3: {2: "x"}}
        let input = [0x1a, 0x02, 0x08, 0x05, 0x1a, 0x03, 0x12, 0x01, b'x'];
        let m = Decoder::new(&f.schema).decode(&input, f.root, &mut arena).unwrap();
        let child = m.view(&f.schema, &arena).message(3).unwrap();
        assert_eq!(child.get(1), Some(Value::I32(5)));
        assert_eq!(child.get(2), Some(Value::Str("x")));
    }

    #[test]
    fn packed_and_unpacked_both_accepted() {
        let f = fixture();
        let mut arena = Arena::new();
        // packed [1, 2] then unpacked 3
        let input = [0x22, 0x02, 0x01, 0x02, 0x20, 0x03];
        let m = Decoder::new(&f.schema).decode(&input, f.root, &mut arena).unwrap();
        let values: Vec<_> = m.view(&f.schema, &arena).repeated(4).collect();
        assert_eq!(values, vec![Value::I32(1), Value::I32(2), Value::I32(3)]);
    }

    #[test]
    fn unknown_fields_preserved_in_order() {
        let f = fixture();
        let mut arena = Arena::new();
        let input = [0x08, 0x01, 0xa0, 0x06, 0x07, 0x08, 0x02, 0xad, 0x06, 1, 2, 3, 4];
        let m = Decoder::new(&f.schema).decode(&input, f.root, &mut arena).unwrap();
        let v = m.view(&f.schema, &arena);
        assert_eq!(v.unknown_fields(), &[0xa0, 0x06, 0x07, 0xad, 0x06, 1, 2, 3, 4]);
        assert_eq!(v.get(1), Some(Value::I32(2)));
    }

    #[test]
    fn discard_unknown_drops_them() {
        let f = fixture();
        let mut arena = Arena::new();
        let m = Decoder::new(&f.schema)
            .with_options(DecodeOptions::default().with_discard_unknown(true))
            .decode(&[0xa0, 0x06, 0x07], f.root, &mut arena)
            .unwrap();
        assert!(m.view(&f.schema, &arena).unknown_fields().is_empty());
    }

    #[test]
    fn wrong_wire_type_becomes_unknown() {
        let f = fixture();
        let mut arena = Arena::new();
        // field 1 as fixed32
        let input = [0x0d, 1, 0, 0, 0];
        let m = Decoder::new(&f.schema).decode(&input, f.root, &mut arena).unwrap();
        let v = m.view(&f.schema, &arena);
        assert_eq!(v.get(1), Some(Value::I32(0)));
        assert_eq!(v.unknown_fields(), &input);
    }

    #[test]
    fn closed_enum_values_diverted() {
        let f = fixture();
        let mut arena = Arena::new();
        // 5: 9 (undeclared), 6: packed [1, 7, 2]
        let input = [0x28, 0x09, 0x32, 0x03, 0x01, 0x07, 0x02];
        let m = Decoder::new(&f.schema).decode(&input, f.root, &mut arena).unwrap();
        let v = m.view(&f.schema, &arena);
        assert_eq!(v.get(5), Some(Value::Enum(0)));
        let kept: Vec<_> = v.repeated(6).collect();
        assert_eq!(kept, vec![Value::Enum(1), Value::Enum(2)]);
        assert_eq!(v.unknown_fields(), &[0x28, 0x09, 0x30, 0x07]);

        let err = Decoder::new(&f.schema)
            .with_options(DecodeOptions::default().with_unknown_enum(UnknownEnumPolicy::Reject))
            .decode(&input, f.root, &mut arena)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownEnumValue {
                field: FieldNumber::new(5).unwrap(),
                value: 9
            }
        );
    }

    #[test]
    fn groups_decode_and_mismatch_fails() {
        let f = fixture();
        let mut arena = Arena::new();
        // 7: group { 1: 4 }
        let m = Decoder::new(&f.schema)
            .decode(&[0x3b, 0x08, 0x04, 0x3c], f.root, &mut arena)
            .unwrap();
        let g = m.view(&f.schema, &arena).message(7).unwrap();
        assert_eq!(g.get(1), Some(Value::I32(4)));

        let err = Decoder::new(&f.schema)
            .decode(&[0x3b, 0x08, 0x04, 0x44], f.root, &mut arena)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed {
                reason: MalformedReason::BadGroupNesting,
                ..
            }
        ));

        let err = Decoder::new(&f.schema)
            .decode(&[0x3b, 0x08, 0x04], f.root, &mut arena)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed {
                reason: MalformedReason::BadGroupNesting,
                ..
            }
        ));
    }

    #[test]
    fn stray_end_group_is_malformed() {
        let f = fixture();
        let mut arena = Arena::new();
        let err = Decoder::new(&f.schema)
            .decode(&[0x0c], f.root, &mut arena)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed {
                reason: MalformedReason::BadGroupNesting,
                ..
            }
        ));
    }

    #[test]
    fn depth_limit_enforced() {
        let f = fixture();
        let mut input = Vec::new();
        for _ in 0..5 {
            let mut outer = vec![0x1a];
            encode_varint(input.len() as u64, &mut outer);
            outer.extend_from_slice(&input);
            input = outer;
        }
        let mut arena = Arena::new();
        let decoder = Decoder::new(&f.schema);
        assert!(decoder
            .clone()
            .with_options(DecodeOptions::default().with_max_depth(5))
            .decode(&input, f.root, &mut arena)
            .is_ok());
        let err = decoder
            .with_options(DecodeOptions::default().with_max_depth(4))
            .decode(&input, f.root, &mut arena)
            .unwrap_err();
        assert_eq!(err, DecodeError::DepthExceeded { limit: 4 });
    }

    #[test]
    fn aliasing_points_into_input() {
        let f = fixture();
        let input = Bytes::from_static(&[0x42, 0x03, b'a', b'b', b'c']);
        let mut arena = Arena::new();
        let m = Decoder::new(&f.schema)
            .with_options(DecodeOptions::default().with_alias(true))
            .decode_shared(&input, f.root, &mut arena)
            .unwrap();
        assert_eq!(arena.region_count(), 2);
        assert_eq!(m.view(&f.schema, &arena).get(8), Some(Value::Bytes(b"abc")));
        let used = arena.allocated_bytes();
        drop(input);
        assert_eq!(m.view(&f.schema, &arena).get(8), Some(Value::Bytes(b"abc")));
        assert_eq!(arena.allocated_bytes(), used);
    }

    #[test]
    fn decode_into_merges_repeated() {
        let f = fixture();
        let mut arena = Arena::new();
        let input = [0x20, 0x01, 0x08, 0x07];
        let decoder = Decoder::new(&f.schema);
        let m = decoder.decode(&input, f.root, &mut arena).unwrap();
        decoder.decode_into(&input, m, &mut arena).unwrap();
        let v = m.view(&f.schema, &arena);
        assert_eq!(v.repeated_len(4), 2);
        assert_eq!(v.get(1), Some(Value::I32(7)));
    }

    #[test]
    fn out_of_memory_reported() {
        let f = fixture();
        let config = strand_arena::ArenaConfig::with_max_bytes(4096);
        let mut arena = Arena::with_config(config).unwrap();
        let mut input = vec![0x42];
        encode_varint(10_000, &mut input);
        input.resize(input.len() + 10_000, b'z');
        let err = Decoder::new(&f.schema)
            .decode(&input, f.root, &mut arena)
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfMemory { .. }));
    }
}
