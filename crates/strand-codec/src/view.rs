//! Field accessors: [`MessageView`] for reads, [`MessageMut`] for writes.
//!
//! Both pair a [`MessageRef`] with its schema and arena. Fields are
//! named by number. Asking for a number the table does not have, or
//! passing a [`Value`] variant that does not match the field's type,
//! is a programming error and panics.

use strand_arena::{Arena, ArenaError, Ptr};
use strand_core::FieldNumber;
use strand_schema::{Extension, FieldDescriptor, FieldType, MiniTable, Schema};

use crate::extension;
use crate::message::{self, sub_table, MessageRef};
use crate::repeated;
use crate::value::Value;

/// Read access to one message.
#[derive(Clone, Copy)]
pub struct MessageView<'a> {
    schema: &'a Schema,
    arena: &'a Arena,
    msg: MessageRef,
    table: &'a MiniTable,
}

impl<'a> MessageView<'a> {
    pub(crate) fn new(schema: &'a Schema, arena: &'a Arena, msg: MessageRef) -> Self {
        Self {
            schema,
            arena,
            msg,
            table: schema.table(msg.table()),
        }
    }

    /// The underlying handle.
    pub fn message_ref(&self) -> MessageRef {
        self.msg
    }

    /// The message's table.
    pub fn table(&self) -> &'a MiniTable {
        self.table
    }

    /// The schema the message belongs to.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The arena the message lives in.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    fn field(&self, number: u32) -> &'a FieldDescriptor {
        lookup(self.table, number)
    }

    /// Whether field `number` is set.
    ///
    /// Repeated fields are set when non-empty; implicit-presence
    /// scalars when non-zero.
    ///
    /// # Panics
    ///
    /// Panics if the table has no field `number`.
    pub fn has(&self, number: u32) -> bool {
        message::is_present(self.arena, self.msg, self.field(number))
    }

    /// Value of singular field `number`.
    ///
    /// Returns `None` for an unset field with explicit presence
    /// (has-bit, oneof member or sub-message). Implicit-presence
    /// scalars always return a value, the default when unset.
    ///
    /// # Panics
    ///
    /// Panics if the table has no field `number` or it is repeated.
    pub fn get(&self, number: u32) -> Option<Value<'a>> {
        let field = self.field(number);
        assert!(
            !field.is_repeated(),
            "field {number} of {} is repeated; use get_at",
            self.table.name()
        );
        if field.has_explicit_presence() && !message::is_present(self.arena, self.msg, field) {
            return None;
        }
        read_singular(self.arena, self.msg.field_ptr(field), field)
    }

    /// The active member of oneof `index` (see [`MiniTable::oneofs`]).
    ///
    /// # Panics
    ///
    /// Panics if the table has fewer than `index + 1` oneofs.
    pub fn which_oneof(&self, index: usize) -> Option<(FieldNumber, Value<'a>)> {
        let oneof = &self.table.oneofs()[index];
        let case = message::oneof_case(self.arena, self.msg, oneof.case_offset);
        let number = FieldNumber::new(case)?;
        let field = self.table.field(number)?;
        let value = read_singular(self.arena, self.msg.field_ptr(field), field)?;
        Some((number, value))
    }

    /// Number of elements in repeated field `number`.
    ///
    /// # Panics
    ///
    /// Panics if the table has no repeated field `number`.
    pub fn repeated_len(&self, number: u32) -> usize {
        let field = self.repeated_field(number);
        repeated::len(self.arena, self.msg.field_ptr(field))
    }

    /// Element `index` of repeated field `number`.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not repeated, or `index` is out
    /// of bounds.
    pub fn get_at(&self, number: u32, index: usize) -> Value<'a> {
        let field = self.repeated_field(number);
        read_element(self.arena, self.msg.field_ptr(field), field, index)
    }

    /// All elements of repeated field `number`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the table has no repeated field `number`.
    pub fn repeated(&self, number: u32) -> impl Iterator<Item = Value<'a>> + 'a {
        let field = self.repeated_field(number);
        let arena = self.arena;
        let slot = self.msg.field_ptr(field);
        (0..repeated::len(arena, slot)).map(move |i| read_element(arena, slot, field, i))
    }

    fn repeated_field(&self, number: u32) -> &'a FieldDescriptor {
        let field = self.field(number);
        assert!(
            field.is_repeated(),
            "field {number} of {} is not repeated",
            self.table.name()
        );
        field
    }

    /// View of sub-message field `number`, if set.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not a singular message.
    pub fn message(&self, number: u32) -> Option<MessageView<'a>> {
        match self.get(number)? {
            Value::Message(m) => Some(MessageView::new(self.schema, self.arena, m)),
            other => panic!(
                "field {number} of {} holds {}, not a message",
                self.table.name(),
                other.kind()
            ),
        }
    }

    /// Retained unknown fields, as raw wire bytes in arrival order.
    pub fn unknown_fields(&self) -> &'a [u8] {
        repeated::bytes(self.arena, self.msg.unknown_slot())
    }

    /// Whether extension `number` is set.
    pub fn has_extension(&self, number: FieldNumber) -> bool {
        extension::find(self.arena, self.msg, number).is_some()
    }

    /// Numbers of the set extensions, in storage order.
    pub fn extension_numbers(&self) -> Vec<FieldNumber> {
        extension::entries(self.arena, self.msg)
            .filter_map(|e| FieldNumber::new(extension::number(self.arena, e)))
            .collect()
    }

    /// Value of singular extension `ext`, if set.
    ///
    /// # Panics
    ///
    /// Panics if `ext` extends a different table or is repeated.
    pub fn extension(&self, ext: &Extension) -> Option<Value<'a>> {
        self.check_extendee(ext);
        assert!(!ext.descriptor.is_repeated(), "extension {} is repeated", ext.descriptor.number);
        let entry = extension::find(self.arena, self.msg, ext.descriptor.number)?;
        read_singular(self.arena, extension::slot(entry), &ext.descriptor)
    }

    /// Number of elements in repeated extension `ext`.
    pub fn extension_len(&self, ext: &Extension) -> usize {
        self.check_extendee(ext);
        extension::find(self.arena, self.msg, ext.descriptor.number)
            .map_or(0, |entry| repeated::len(self.arena, extension::slot(entry)))
    }

    /// Element `index` of repeated extension `ext`.
    ///
    /// # Panics
    ///
    /// Panics if the extension is unset or `index` is out of bounds.
    pub fn extension_at(&self, ext: &Extension, index: usize) -> Value<'a> {
        self.check_extendee(ext);
        let Some(entry) = extension::find(self.arena, self.msg, ext.descriptor.number) else {
            panic!("extension {} is not set", ext.descriptor.number);
        };
        read_element(self.arena, extension::slot(entry), &ext.descriptor, index)
    }

    fn check_extendee(&self, ext: &Extension) {
        assert_eq!(
            ext.extendee,
            self.msg.table(),
            "extension {} does not extend {}",
            ext.descriptor.number,
            self.table.name()
        );
    }
}

/// Write access to one message.
pub struct MessageMut<'a> {
    schema: &'a Schema,
    arena: &'a mut Arena,
    msg: MessageRef,
    table: &'a MiniTable,
}

impl<'a> MessageMut<'a> {
    pub(crate) fn new(schema: &'a Schema, arena: &'a mut Arena, msg: MessageRef) -> Self {
        Self {
            schema,
            arena,
            msg,
            table: schema.table(msg.table()),
        }
    }

    /// The underlying handle.
    pub fn message_ref(&self) -> MessageRef {
        self.msg
    }

    /// Read access to the same message.
    pub fn view(&self) -> MessageView<'_> {
        MessageView::new(self.schema, self.arena, self.msg)
    }

    fn field(&self, number: u32) -> &'a FieldDescriptor {
        lookup(self.table, number)
    }

    /// Set singular field `number`.
    ///
    /// Strings and bytes are copied into the arena. A message value
    /// must live in this arena or one fused into it. Setting a oneof
    /// member clears the previously active member.
    ///
    /// # Errors
    ///
    /// [`ArenaError::OutOfMemory`] when copying fails, or
    /// [`ArenaError::ForeignHandle`] for a message from an unfused arena.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or repeated, or the value variant
    /// (or sub-message type) does not match the field.
    pub fn set(&mut self, number: u32, value: Value<'_>) -> Result<(), ArenaError> {
        let field = self.field(number);
        assert!(
            !field.is_repeated(),
            "field {number} of {} is repeated; use push",
            self.table.name()
        );
        let stored = prepare(self.arena, self.table, field, value)?;
        message::mark_present(self.arena, self.msg, self.table, field);
        commit(self.arena, self.msg.field_ptr(field), field, stored);
        Ok(())
    }

    /// Reset field `number` to unset. Repeated fields are emptied.
    ///
    /// # Panics
    ///
    /// Panics if the table has no field `number`.
    pub fn clear(&mut self, number: u32) {
        let field = self.field(number);
        if field.is_repeated() {
            repeated::clear(self.arena, self.msg.field_ptr(field));
        } else {
            message::clear_field(self.arena, self.msg, field);
        }
    }

    /// Append to repeated field `number`.
    ///
    /// # Errors
    ///
    /// As for [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not repeated, or the value
    /// variant does not match.
    pub fn push(&mut self, number: u32, value: Value<'_>) -> Result<(), ArenaError> {
        let field = self.field(number);
        assert!(
            field.is_repeated(),
            "field {number} of {} is not repeated",
            self.table.name()
        );
        let stored = prepare(self.arena, self.table, field, value)?;
        let elem = repeated::push(self.arena, self.msg.field_ptr(field), field.element_size())?;
        commit(self.arena, elem, field, stored);
        Ok(())
    }

    /// The sub-message in field `number`, created empty if unset.
    ///
    /// # Errors
    ///
    /// [`ArenaError::OutOfMemory`] if the sub-message cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not a singular message.
    pub fn mutable_message(&mut self, number: u32) -> Result<MessageMut<'_>, ArenaError> {
        let field = self.field(number);
        assert!(
            field.field_type.is_message() && !field.is_repeated(),
            "field {number} of {} is not a singular message",
            self.table.name()
        );
        message::mark_present(self.arena, self.msg, self.table, field);
        let child = message::get_or_create_child(
            self.schema,
            self.arena,
            self.msg.field_ptr(field),
            sub_table(field),
        )?;
        Ok(MessageMut::new(self.schema, self.arena, child))
    }

    /// Append a new empty sub-message to repeated field `number`.
    ///
    /// # Errors
    ///
    /// [`ArenaError::OutOfMemory`] if the sub-message cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if the field is missing or not a repeated message.
    pub fn add_message(&mut self, number: u32) -> Result<MessageMut<'_>, ArenaError> {
        let field = self.field(number);
        assert!(
            field.field_type.is_message() && field.is_repeated(),
            "field {number} of {} is not a repeated message",
            self.table.name()
        );
        let child = MessageRef::new(self.schema, sub_table(field), self.arena)?;
        let elem = repeated::push(self.arena, self.msg.field_ptr(field), field.element_size())?;
        self.arena.write_ptr(elem, child.ptr());
        Ok(MessageMut::new(self.schema, self.arena, child))
    }

    /// Set singular extension `ext`.
    ///
    /// # Errors
    ///
    /// As for [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics if `ext` extends another table or is repeated, or the
    /// value variant does not match.
    pub fn set_extension(&mut self, ext: &Extension, value: Value<'_>) -> Result<(), ArenaError> {
        self.check_extendee(ext);
        let desc = &ext.descriptor;
        assert!(!desc.is_repeated(), "extension {} is repeated", desc.number);
        let stored = prepare(self.arena, self.table, desc, value)?;
        let entry = extension::find_or_insert(self.arena, self.msg, desc)?;
        commit(self.arena, extension::slot(entry), desc, stored);
        Ok(())
    }

    /// Append to repeated extension `ext`.
    ///
    /// # Errors
    ///
    /// As for [`set`](Self::set).
    ///
    /// # Panics
    ///
    /// Panics if `ext` extends another table or is not repeated.
    pub fn push_extension(&mut self, ext: &Extension, value: Value<'_>) -> Result<(), ArenaError> {
        self.check_extendee(ext);
        let desc = &ext.descriptor;
        assert!(desc.is_repeated(), "extension {} is not repeated", desc.number);
        let stored = prepare(self.arena, self.table, desc, value)?;
        let entry = extension::find_or_insert(self.arena, self.msg, desc)?;
        let elem = repeated::push(self.arena, extension::slot(entry), desc.element_size())?;
        commit(self.arena, elem, desc, stored);
        Ok(())
    }

    /// The sub-message in singular extension `ext`, created if unset.
    ///
    /// # Errors
    ///
    /// [`ArenaError::OutOfMemory`] if allocation fails.
    ///
    /// # Panics
    ///
    /// Panics if `ext` extends another table or is not a singular message.
    pub fn mutable_extension_message(
        &mut self,
        ext: &Extension,
    ) -> Result<MessageMut<'_>, ArenaError> {
        self.check_extendee(ext);
        let desc = &ext.descriptor;
        assert!(
            desc.field_type.is_message() && !desc.is_repeated(),
            "extension {} is not a singular message",
            desc.number
        );
        let entry = extension::find_or_insert(self.arena, self.msg, desc)?;
        let child = message::get_or_create_child(
            self.schema,
            self.arena,
            extension::slot(entry),
            sub_table(desc),
        )?;
        Ok(MessageMut::new(self.schema, self.arena, child))
    }

    /// Remove extension `number`. Returns whether it was set.
    pub fn clear_extension(&mut self, number: FieldNumber) -> bool {
        extension::remove(self.arena, self.msg, number)
    }

    /// Drop retained unknown fields.
    pub fn clear_unknown(&mut self) {
        repeated::clear(self.arena, self.msg.unknown_slot());
    }

    /// Reset every field, extension and unknown field.
    pub fn clear_all(&mut self) {
        self.arena
            .zero(self.msg.data_ptr(), self.table.size() as usize);
        repeated::clear(self.arena, self.msg.unknown_slot());
        repeated::clear(self.arena, self.msg.extensions_slot());
    }

    fn check_extendee(&self, ext: &Extension) {
        assert_eq!(
            ext.extendee,
            self.msg.table(),
            "extension {} does not extend {}",
            ext.descriptor.number,
            self.table.name()
        );
    }
}

fn lookup<'t>(table: &'t MiniTable, number: u32) -> &'t FieldDescriptor {
    match FieldNumber::new(number).and_then(|n| table.field(n)) {
        Some(f) => f,
        None => panic!("{} has no field {number}", table.name()),
    }
}

/// Read a singular value from `slot`. `None` only for a null message
/// pointer.
pub(crate) fn read_singular<'a>(
    arena: &'a Arena,
    slot: Ptr,
    field: &FieldDescriptor,
) -> Option<Value<'a>> {
    Some(match field.field_type {
        FieldType::String => {
            let bytes = message::read_view(arena, slot);
            match std::str::from_utf8(bytes) {
                Ok(s) => Value::Str(s),
                Err(_) => Value::Bytes(bytes),
            }
        }
        FieldType::Bytes => Value::Bytes(message::read_view(arena, slot)),
        FieldType::Message | FieldType::Group => {
            let ptr = arena.read_ptr(slot);
            if ptr.is_null() {
                return None;
            }
            Value::Message(MessageRef::from_parts(ptr, sub_table(field)))
        }
        ft => Value::from_raw(ft, message::read_raw(arena, slot, ft.rep())),
    })
}

/// Read element `index` of the repeated field at `slot`.
pub(crate) fn read_element<'a>(
    arena: &'a Arena,
    slot: Ptr,
    field: &FieldDescriptor,
    index: usize,
) -> Value<'a> {
    let elem = repeated::element(arena, slot, field.element_size(), index);
    match read_singular(arena, elem, field) {
        Some(v) => v,
        None => panic!("null element {index} in repeated field {}", field.number),
    }
}

/// A value converted to its stored form, with any copy already made.
enum Stored {
    Raw(u64),
    View(Ptr, u32),
    Pointer(Ptr),
}

fn prepare(
    arena: &mut Arena,
    table: &MiniTable,
    field: &FieldDescriptor,
    value: Value<'_>,
) -> Result<Stored, ArenaError> {
    match field.field_type {
        FieldType::Message | FieldType::Group => {
            let Value::Message(m) = value else {
                mismatch(table, field, value)
            };
            assert_eq!(
                m.table(),
                sub_table(field),
                "field {} of {} expects a different message type",
                field.number,
                table.name()
            );
            arena.check(m.ptr())?;
            Ok(Stored::Pointer(m.ptr()))
        }
        FieldType::String | FieldType::Bytes => {
            let Some(bytes) = value.as_raw_bytes() else {
                mismatch(table, field, value)
            };
            if bytes.is_empty() {
                return Ok(Stored::View(Ptr::NULL, 0));
            }
            let ptr = arena.alloc_copy(bytes, 1)?;
            Ok(Stored::View(ptr, bytes.len() as u32))
        }
        ft => match value.to_raw(ft) {
            Some(raw) => Ok(Stored::Raw(raw)),
            None => mismatch(table, field, value),
        },
    }
}

fn mismatch(table: &MiniTable, field: &FieldDescriptor, value: Value<'_>) -> ! {
    panic!(
        "field {} of {} is {:?}, got a {} value",
        field.number,
        table.name(),
        field.field_type,
        value.kind()
    )
}

fn commit(arena: &mut Arena, slot: Ptr, field: &FieldDescriptor, stored: Stored) {
    match stored {
        Stored::Raw(raw) => message::write_raw(arena, slot, field.field_type.rep(), raw),
        Stored::View(ptr, len) => message::write_view(arena, slot, ptr, len),
        Stored::Pointer(ptr) => arena.write_ptr(slot, ptr),
    }
}
