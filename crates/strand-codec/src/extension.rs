//! Extension storage inside a message.
//!
//! Each set extension occupies one 32-byte entry in the message's
//! extension array. Entries describe themselves, so encoding and
//! comparison do not need the registry:
//!
//! ```text
//!  0  number     u32
//!  4  field type u8
//!  5  mode       u8   0 scalar, 1 repeated, 2 packed
//!  6  sub kind   u8   0 none, 1 message, 2 enum
//!  8  sub id     u32
//! 16  value slot 16 bytes (scalar, string view, pointer or array header)
//! ```

use strand_arena::{Arena, ArenaError, Ptr};
use strand_core::{EnumId, FieldNumber, TableId};
use strand_schema::{FieldDescriptor, FieldMode, FieldType, SubRef};

use crate::message::MessageRef;
use crate::repeated;

pub(crate) const ENTRY_SIZE: u32 = 32;
const SLOT_OFFSET: u32 = 16;

/// Value slot of an entry.
pub(crate) fn slot(entry: Ptr) -> Ptr {
    entry.offset(SLOT_OFFSET)
}

pub(crate) fn count(arena: &Arena, msg: MessageRef) -> usize {
    repeated::len(arena, msg.extensions_slot())
}

pub(crate) fn entry_at(arena: &Arena, msg: MessageRef, index: usize) -> Ptr {
    repeated::element(arena, msg.extensions_slot(), ENTRY_SIZE, index)
}

pub(crate) fn entries(arena: &Arena, msg: MessageRef) -> impl Iterator<Item = Ptr> + '_ {
    (0..count(arena, msg)).map(move |i| entry_at(arena, msg, i))
}

pub(crate) fn number(arena: &Arena, entry: Ptr) -> u32 {
    arena.read_u32(entry)
}

/// Index of the entry for `number`, if set.
pub(crate) fn position(arena: &Arena, msg: MessageRef, number: FieldNumber) -> Option<usize> {
    (0..count(arena, msg)).find(|&i| self::number(arena, entry_at(arena, msg, i)) == number.get())
}

pub(crate) fn find(arena: &Arena, msg: MessageRef, number: FieldNumber) -> Option<Ptr> {
    position(arena, msg, number).map(|i| entry_at(arena, msg, i))
}

/// The entry for `desc`, created empty if absent.
pub(crate) fn find_or_insert(
    arena: &mut Arena,
    msg: MessageRef,
    desc: &FieldDescriptor,
) -> Result<Ptr, ArenaError> {
    if let Some(entry) = find(arena, msg, desc.number) {
        return Ok(entry);
    }
    let entry = repeated::push(arena, msg.extensions_slot(), ENTRY_SIZE)?;
    arena.write_u32(entry, desc.number.get());
    arena.write_u8(entry.offset(4), desc.field_type as u8);
    let mode = match desc.mode {
        FieldMode::Scalar => 0,
        FieldMode::Repeated { packed: false } => 1,
        FieldMode::Repeated { packed: true } => 2,
    };
    arena.write_u8(entry.offset(5), mode);
    let (kind, id) = match desc.sub {
        SubRef::None => (0, 0),
        SubRef::Message(t) => (1, t.0),
        SubRef::Enum(e) => (2, e.0),
    };
    arena.write_u8(entry.offset(6), kind);
    arena.write_u32(entry.offset(8), id);
    Ok(entry)
}

/// Rebuild the descriptor recorded in an entry.
///
/// # Panics
///
/// Panics if the entry's type code is corrupt; entries are only ever
/// written by [`find_or_insert`].
pub(crate) fn descriptor(arena: &Arena, entry: Ptr) -> FieldDescriptor {
    let raw_number = arena.read_u32(entry);
    let number = match FieldNumber::new(raw_number) {
        Some(n) => n,
        None => panic!("corrupt extension entry number {raw_number}"),
    };
    let code = arena.read_u8(entry.offset(4));
    let field_type = match FieldType::try_from(code) {
        Ok(t) => t,
        Err(code) => panic!("corrupt extension entry type {code}"),
    };
    let mode = match arena.read_u8(entry.offset(5)) {
        0 => FieldMode::Scalar,
        1 => FieldMode::Repeated { packed: false },
        _ => FieldMode::Repeated { packed: true },
    };
    let id = arena.read_u32(entry.offset(8));
    let sub = match arena.read_u8(entry.offset(6)) {
        1 => SubRef::Message(TableId(id)),
        2 => SubRef::Enum(EnumId(id)),
        _ => SubRef::None,
    };
    FieldDescriptor::extension(number, field_type, mode, sub)
}

/// Remove the entry for `number`. Returns whether one existed.
pub(crate) fn remove(arena: &mut Arena, msg: MessageRef, number: FieldNumber) -> bool {
    match position(arena, msg, number) {
        Some(index) => {
            repeated::swap_remove(arena, msg.extensions_slot(), ENTRY_SIZE, index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_schema::{MessageLayout, SchemaBuilder};

    #[test]
    fn entries_describe_themselves() {
        let mut b = SchemaBuilder::new();
        let t = b.add(MessageLayout::new("M").extendable()).unwrap();
        let schema = b.build().unwrap();
        let mut arena = Arena::new();
        let msg = MessageRef::new(&schema, t, &mut arena).unwrap();

        let desc = FieldDescriptor::extension(
            FieldNumber::new(500).unwrap(),
            FieldType::Message,
            FieldMode::Repeated { packed: false },
            SubRef::Message(t),
        );
        let e1 = find_or_insert(&mut arena, msg, &desc).unwrap();
        let e2 = find_or_insert(&mut arena, msg, &desc).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(count(&arena, msg), 1);
        assert_eq!(descriptor(&arena, e1), desc);
    }

    #[test]
    fn remove_keeps_others() {
        let mut b = SchemaBuilder::new();
        let t = b.add(MessageLayout::new("M").extendable()).unwrap();
        let schema = b.build().unwrap();
        let mut arena = Arena::new();
        let msg = MessageRef::new(&schema, t, &mut arena).unwrap();
        for n in [100, 200, 300] {
            let d = FieldDescriptor::extension(
                FieldNumber::new(n).unwrap(),
                FieldType::Int32,
                FieldMode::Scalar,
                SubRef::None,
            );
            find_or_insert(&mut arena, msg, &d).unwrap();
        }
        assert!(remove(&mut arena, msg, FieldNumber::new(100).unwrap()));
        assert!(!remove(&mut arena, msg, FieldNumber::new(100).unwrap()));
        assert!(find(&arena, msg, FieldNumber::new(300).unwrap()).is_some());
        assert_eq!(count(&arena, msg), 2);
    }
}
