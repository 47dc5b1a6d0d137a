//! Message memory: header layout, presence tracking and slot access.
//!
//! ```text
//! offset  0  unknown-field bytes   (array header: data, len, cap)
//! offset 16  extension entries     (array header: data, len, cap)
//! offset 32  table id              (u32)
//! offset 36  schema tag            (u32, low bits of the SchemaId)
//! offset 40  field storage         (table.size() bytes; has-bits first)
//! ```
//!
//! Field values are addressed by descriptor offset from the start of
//! field storage. Nothing here knows about the wire.

use strand_arena::{Arena, ArenaError, Ptr};
use strand_core::TableId;
use strand_schema::{FieldDescriptor, FieldRep, MiniTable, Presence, Schema, SubRef};

use crate::view::{MessageMut, MessageView};

/// Bytes of per-message header before field storage.
pub const HEADER_SIZE: u32 = 40;
const UNKNOWN_OFFSET: u32 = 0;
const EXTENSIONS_OFFSET: u32 = 16;
const TABLE_OFFSET: u32 = 32;
const SCHEMA_OFFSET: u32 = 36;
pub(crate) const MESSAGE_ALIGN: u32 = 8;

/// Handle to a message in an arena.
///
/// A `MessageRef` is a plain index (arena pointer plus table id) and is
/// `Copy`. It is only meaningful together with the [`Schema`] it was
/// created under and an [`Arena`] that owns (or has fused) its memory;
/// [`view`](Self::view) and [`edit`](Self::edit) pair it with both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    ptr: Ptr,
    table: TableId,
}

impl MessageRef {
    /// Allocate an empty message of type `table`.
    ///
    /// # Panics
    ///
    /// Panics if `table` is not a table of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::OutOfMemory`] if the arena is exhausted.
    pub fn new(schema: &Schema, table: TableId, arena: &mut Arena) -> Result<Self, ArenaError> {
        let size = HEADER_SIZE + schema.table(table).size();
        let ptr = arena.alloc(size as usize, MESSAGE_ALIGN)?;
        arena.write_u32(ptr.offset(TABLE_OFFSET), table.0);
        arena.write_u32(ptr.offset(SCHEMA_OFFSET), schema_tag(schema));
        Ok(Self { ptr, table })
    }

    /// Recover a handle from a stored message pointer using the table
    /// marker in its header.
    ///
    /// # Errors
    ///
    /// Fails if `ptr` does not resolve in `arena`.
    pub fn from_ptr(arena: &Arena, ptr: Ptr) -> Result<Self, ArenaError> {
        let raw = arena.try_bytes(ptr.offset(TABLE_OFFSET), 4)?;
        let table = TableId(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
        Ok(Self { ptr, table })
    }

    pub(crate) fn from_parts(ptr: Ptr, table: TableId) -> Self {
        Self { ptr, table }
    }

    /// Arena address of the message.
    pub fn ptr(self) -> Ptr {
        self.ptr
    }

    /// Message type.
    pub fn table(self) -> TableId {
        self.table
    }

    /// Read access to fields.
    ///
    /// # Panics
    ///
    /// Panics if the message does not belong to `schema` or `arena`
    /// (see [`check`](Self::check)).
    pub fn view<'a>(self, schema: &'a Schema, arena: &'a Arena) -> MessageView<'a> {
        self.assert_valid(schema, arena);
        MessageView::new(schema, arena, self)
    }

    /// Write access to fields.
    ///
    /// # Panics
    ///
    /// Panics if the message does not belong to `schema` or `arena`.
    pub fn edit<'a>(self, schema: &'a Schema, arena: &'a mut Arena) -> MessageMut<'a> {
        self.assert_valid(schema, arena);
        MessageMut::new(schema, arena, self)
    }

    /// Check that the message resolves in `arena` and was created for
    /// this table of `schema`.
    ///
    /// # Errors
    ///
    /// Returns the arena error for a stale or foreign handle.
    pub fn check(self, schema: &Schema, arena: &Arena) -> Result<bool, ArenaError> {
        let header = arena.try_bytes(self.ptr, HEADER_SIZE as usize)?;
        let word = |at: u32| {
            let at = at as usize;
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };
        Ok(word(TABLE_OFFSET) == self.table.0 && word(SCHEMA_OFFSET) == schema_tag(schema))
    }

    pub(crate) fn assert_valid(self, schema: &Schema, arena: &Arena) {
        match self.check(schema, arena) {
            Ok(true) => {}
            Ok(false) => panic!(
                "message at {} was not created as table {} of {}",
                self.ptr,
                self.table,
                schema.id()
            ),
            Err(e) => panic!("message at {} is not usable: {e}", self.ptr),
        }
    }

    pub(crate) fn field_ptr(self, field: &FieldDescriptor) -> Ptr {
        self.ptr.offset(HEADER_SIZE + field.offset)
    }

    pub(crate) fn data_ptr(self) -> Ptr {
        self.ptr.offset(HEADER_SIZE)
    }

    pub(crate) fn unknown_slot(self) -> Ptr {
        self.ptr.offset(UNKNOWN_OFFSET)
    }

    pub(crate) fn extensions_slot(self) -> Ptr {
        self.ptr.offset(EXTENSIONS_OFFSET)
    }
}

/// Allocate an empty message of type `table`; see [`MessageRef::new`].
///
/// # Errors
///
/// Returns [`ArenaError::OutOfMemory`] if the arena is exhausted.
pub fn allocate(
    schema: &Schema,
    table: TableId,
    arena: &mut Arena,
) -> Result<MessageRef, ArenaError> {
    MessageRef::new(schema, table, arena)
}

fn schema_tag(schema: &Schema) -> u32 {
    schema.id().get() as u32
}

/// Sub-message table of a message or group field.
///
/// Tables and registries only accept message fields with a message
/// sub-reference, so the fallback arm is unreachable for valid input.
pub(crate) fn sub_table(field: &FieldDescriptor) -> TableId {
    match field.sub {
        SubRef::Message(t) => t,
        other => panic!(
            "field {} of type {:?} has sub-reference {other:?}",
            field.number, field.field_type
        ),
    }
}

pub(crate) fn has_bit(arena: &Arena, msg: MessageRef, index: u16) -> bool {
    let byte = arena.read_u8(msg.data_ptr().offset(u32::from(index / 8)));
    byte & (1 << (index % 8)) != 0
}

pub(crate) fn set_has_bit(arena: &mut Arena, msg: MessageRef, index: u16, on: bool) {
    let at = msg.data_ptr().offset(u32::from(index / 8));
    let byte = arena.read_u8(at);
    let mask = 1 << (index % 8);
    arena.write_u8(at, if on { byte | mask } else { byte & !mask });
}

pub(crate) fn oneof_case(arena: &Arena, msg: MessageRef, case_offset: u32) -> u32 {
    arena.read_u32(msg.data_ptr().offset(case_offset))
}

/// Whether a singular regular field is set.
pub(crate) fn is_present(arena: &Arena, msg: MessageRef, field: &FieldDescriptor) -> bool {
    let slot = msg.field_ptr(field);
    if field.is_repeated() {
        return crate::repeated::len(arena, slot) > 0;
    }
    match field.presence {
        Presence::HasBit(index) => has_bit(arena, msg, index),
        Presence::Oneof { case_offset } => {
            oneof_case(arena, msg, case_offset) == field.number.get()
        }
        Presence::Implicit => slot_nonzero(arena, slot, field),
    }
}

/// Whether an implicit-presence slot holds a non-default value.
pub(crate) fn slot_nonzero(arena: &Arena, slot: Ptr, field: &FieldDescriptor) -> bool {
    match field.field_type.rep() {
        FieldRep::StringView => arena.read_u32(slot.offset(8)) != 0,
        rep => read_raw(arena, slot, rep) != 0,
    }
}

/// Record that `field` is now set, switching its oneof if needed.
///
/// Switching a oneof zeroes the previous member's storage so the new
/// member starts from its default.
pub(crate) fn mark_present(
    arena: &mut Arena,
    msg: MessageRef,
    table: &MiniTable,
    field: &FieldDescriptor,
) {
    match field.presence {
        Presence::HasBit(index) => set_has_bit(arena, msg, index, true),
        Presence::Oneof { case_offset } => {
            let current = oneof_case(arena, msg, case_offset);
            let number = field.number.get();
            if current != number {
                clear_oneof_member(arena, msg, table, current);
                arena.write_u32(msg.data_ptr().offset(case_offset), number);
            }
        }
        Presence::Implicit => {}
    }
}

/// Zero the storage of oneof member `number` (0 means none).
pub(crate) fn clear_oneof_member(
    arena: &mut Arena,
    msg: MessageRef,
    table: &MiniTable,
    number: u32,
) {
    let Some(previous) = strand_core::FieldNumber::new(number).and_then(|n| table.field(n)) else {
        return;
    };
    arena.zero(msg.field_ptr(previous), previous.storage_size() as usize);
}

/// Reset `field` to unset and default.
pub(crate) fn clear_field(arena: &mut Arena, msg: MessageRef, field: &FieldDescriptor) {
    let slot = msg.field_ptr(field);
    match field.presence {
        Presence::HasBit(index) => set_has_bit(arena, msg, index, false),
        Presence::Oneof { case_offset } => {
            if oneof_case(arena, msg, case_offset) != field.number.get() {
                return;
            }
            arena.write_u32(msg.data_ptr().offset(case_offset), 0);
        }
        Presence::Implicit => {}
    }
    arena.zero(slot, field.storage_size() as usize);
}

/// Load a 1/4/8-byte value (or a stored pointer) as raw bits.
pub(crate) fn read_raw(arena: &Arena, slot: Ptr, rep: FieldRep) -> u64 {
    match rep {
        FieldRep::OneByte => u64::from(arena.read_u8(slot)),
        FieldRep::FourByte => u64::from(arena.read_u32(slot)),
        FieldRep::EightByte | FieldRep::Pointer | FieldRep::StringView => arena.read_u64(slot),
    }
}

/// Store raw bits in a 1/4/8-byte slot.
pub(crate) fn write_raw(arena: &mut Arena, slot: Ptr, rep: FieldRep, raw: u64) {
    match rep {
        FieldRep::OneByte => arena.write_u8(slot, raw as u8),
        FieldRep::FourByte => arena.write_u32(slot, raw as u32),
        FieldRep::EightByte | FieldRep::Pointer | FieldRep::StringView => {
            arena.write_u64(slot, raw)
        }
    }
}

/// Bytes referenced by a string view slot.
pub(crate) fn read_view(arena: &Arena, slot: Ptr) -> &[u8] {
    let data = arena.read_ptr(slot);
    let len = arena.read_u32(slot.offset(8));
    arena.bytes(data, len as usize)
}

pub(crate) fn write_view(arena: &mut Arena, slot: Ptr, data: Ptr, len: u32) {
    arena.write_ptr(slot, data);
    arena.write_u32(slot.offset(8), len);
}

/// Allocate a sub-message if the pointer slot is empty and return it.
pub(crate) fn get_or_create_child(
    schema: &Schema,
    arena: &mut Arena,
    slot: Ptr,
    table: TableId,
) -> Result<MessageRef, ArenaError> {
    let existing = arena.read_ptr(slot);
    if !existing.is_null() {
        return Ok(MessageRef::from_parts(existing, table));
    }
    let child = MessageRef::new(schema, table, arena)?;
    arena.write_ptr(slot, child.ptr());
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::FieldNumber;
    use strand_schema::{FieldType, MessageLayout, SchemaBuilder};

    fn fixture() -> (Schema, TableId) {
        let mut b = SchemaBuilder::new();
        let t = b
            .add(
                MessageLayout::new("M")
                    .optional(1, FieldType::Int32)
                    .field(2, FieldType::String)
                    .oneof([
                        (3, FieldType::Int64, SubRef::None),
                        (4, FieldType::Bytes, SubRef::None),
                    ]),
            )
            .unwrap();
        (b.build().unwrap(), t)
    }

    fn field(schema: &Schema, t: TableId, n: u32) -> FieldDescriptor {
        schema
            .table(t)
            .field(FieldNumber::new(n).unwrap())
            .unwrap()
            .clone()
    }

    #[test]
    fn new_message_is_zeroed_and_marked() {
        let (schema, t) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, t, &mut arena).unwrap();
        assert_eq!(m.check(&schema, &arena), Ok(true));
        assert_eq!(MessageRef::from_ptr(&arena, m.ptr()).unwrap(), m);
        for n in 1..=4 {
            assert!(!is_present(&arena, m, &field(&schema, t, n)));
        }
    }

    #[test]
    fn has_bits_toggle() {
        let (schema, t) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, t, &mut arena).unwrap();
        let f = field(&schema, t, 1);
        mark_present(&mut arena, m, schema.table(t), &f);
        assert!(is_present(&arena, m, &f));
        clear_field(&mut arena, m, &f);
        assert!(!is_present(&arena, m, &f));
    }

    #[test]
    fn oneof_switch_clears_previous() {
        let (schema, t) = fixture();
        let table = schema.table(t);
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, t, &mut arena).unwrap();
        let a = field(&schema, t, 3);
        let b = field(&schema, t, 4);
        mark_present(&mut arena, m, table, &a);
        write_raw(&mut arena, m.field_ptr(&a), FieldRep::EightByte, 99);
        mark_present(&mut arena, m, table, &b);
        assert!(is_present(&arena, m, &b));
        assert!(!is_present(&arena, m, &a));
        assert_eq!(read_raw(&arena, m.field_ptr(&a), FieldRep::EightByte), 0);
    }

    #[test]
    fn foreign_schema_detected() {
        let (schema, t) = fixture();
        let (other, _) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, t, &mut arena).unwrap();
        assert_eq!(m.check(&other, &arena), Ok(false));
    }

    #[test]
    fn stale_after_reset() {
        let (schema, t) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, t, &mut arena).unwrap();
        arena.reset();
        assert!(matches!(
            m.check(&schema, &arena),
            Err(ArenaError::StaleHandle { .. })
        ));
    }
}
