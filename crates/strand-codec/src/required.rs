//! Required-field verification over a message tree.

use strand_arena::Arena;
use strand_core::FieldNumber;
use strand_schema::{FieldDescriptor, Schema};

use crate::extension;
use crate::message::{self, sub_table, MessageRef};
use crate::repeated;

/// The first required field found absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Missing {
    pub message: String,
    pub field: FieldNumber,
}

/// Walk `msg` and everything reachable from it, depth-first in field
/// order, stopping at the first absent required field.
///
/// Descent stops below `max_depth` levels; callers bound depth
/// separately.
pub(crate) fn check(
    schema: &Schema,
    arena: &Arena,
    msg: MessageRef,
    max_depth: u32,
) -> Result<(), Missing> {
    walk(schema, arena, msg, max_depth)
}

fn walk(schema: &Schema, arena: &Arena, msg: MessageRef, budget: u32) -> Result<(), Missing> {
    let table = schema.table(msg.table());
    for field in table.required_fields() {
        if !message::is_present(arena, msg, field) {
            return Err(Missing {
                message: table.name().to_owned(),
                field: field.number,
            });
        }
    }
    if budget == 0 {
        return Ok(());
    }
    for field in table.fields() {
        if !field.field_type.is_message() {
            continue;
        }
        if !field.is_repeated() && !message::is_present(arena, msg, field) {
            continue;
        }
        children(schema, arena, msg.field_ptr(field), field, budget)?;
    }
    for entry in extension::entries(arena, msg) {
        let desc = extension::descriptor(arena, entry);
        if desc.field_type.is_message() {
            children(schema, arena, extension::slot(entry), &desc, budget)?;
        }
    }
    Ok(())
}

fn children(
    schema: &Schema,
    arena: &Arena,
    slot: strand_arena::Ptr,
    field: &FieldDescriptor,
    budget: u32,
) -> Result<(), Missing> {
    let table = sub_table(field);
    if field.is_repeated() {
        for i in 0..repeated::len(arena, slot) {
            let elem = repeated::element(arena, slot, field.element_size(), i);
            let ptr = arena.read_ptr(elem);
            walk(schema, arena, MessageRef::from_parts(ptr, table), budget - 1)?;
        }
        return Ok(());
    }
    let ptr = arena.read_ptr(slot);
    if ptr.is_null() {
        return Ok(());
    }
    walk(schema, arena, MessageRef::from_parts(ptr, table), budget - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::TableId;
    use strand_schema::{FieldType, MessageLayout, SchemaBuilder};

    fn fixture() -> (Schema, TableId, TableId) {
        let mut b = SchemaBuilder::new();
        let leaf = b
            .add(MessageLayout::new("Leaf").required(1, FieldType::Int32))
            .unwrap();
        let root = b
            .add(
                MessageLayout::new("Root")
                    .message(1, leaf)
                    .repeated_message(2, leaf),
            )
            .unwrap();
        (b.build().unwrap(), root, leaf)
    }

    #[test]
    fn absent_children_are_fine() {
        let (schema, root, _) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, root, &mut arena).unwrap();
        assert_eq!(check(&schema, &arena, m, 100), Ok(()));
    }

    #[test]
    fn reports_missing_in_repeated_child() {
        let (schema, root, _) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, root, &mut arena).unwrap();
        {
            let mut edit = m.edit(&schema, &mut arena);
            edit.add_message(2).unwrap();
        }
        let missing = check(&schema, &arena, m, 100).unwrap_err();
        assert_eq!(missing.message, "Leaf");
        assert_eq!(missing.field.get(), 1);

        m.edit(&schema, &mut arena).clear(2);
        assert_eq!(check(&schema, &arena, m, 100), Ok(()));
    }

    #[test]
    fn set_required_passes() {
        let (schema, root, _) = fixture();
        let mut arena = Arena::new();
        let m = MessageRef::new(&schema, root, &mut arena).unwrap();
        {
            let mut edit = m.edit(&schema, &mut arena);
            let mut leaf = edit.mutable_message(1).unwrap();
            leaf.set(1, crate::Value::I32(0)).unwrap();
        }
        assert_eq!(check(&schema, &arena, m, 100), Ok(()));
    }
}
