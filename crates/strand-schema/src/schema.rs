//! Schema sets: every message and enum table reachable from a root.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use strand_core::{EnumId, TableId};

use crate::enums::EnumTable;
use crate::error::SchemaError;
use crate::field::SubRef;
use crate::layout::MessageLayout;
use crate::table::MiniTable;

/// Process-unique identity of a built [`Schema`].
///
/// Registries and messages remember which schema they were made for,
/// so mixing tables from two schemas is detected instead of silently
/// misreading memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SchemaId(u64);

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

impl SchemaId {
    fn next() -> Self {
        Self(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

/// An immutable set of message and enum tables.
///
/// Sub-message references are [`TableId`]s into this set, which makes
/// recursive types plain data. A `Schema` is `Send + Sync` and is
/// typically built once and shared by reference or `Arc`.
#[derive(Debug)]
pub struct Schema {
    id: SchemaId,
    tables: Vec<MiniTable>,
    enums: Vec<EnumTable>,
    by_name: IndexMap<String, TableId>,
}

impl Schema {
    /// This schema's identity.
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// The table for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a table of this schema.
    pub fn table(&self, id: TableId) -> &MiniTable {
        match self.get(id) {
            Some(t) => t,
            None => panic!("table {id} not in {}", self.id),
        }
    }

    /// The table for `id`, if it exists.
    pub fn get(&self, id: TableId) -> Option<&MiniTable> {
        self.tables.get(id.0 as usize)
    }

    /// The enum table for `id`, if it exists.
    pub fn enum_table(&self, id: EnumId) -> Option<&EnumTable> {
        self.enums.get(id.0 as usize)
    }

    /// Look a message table up by name.
    pub fn find(&self, name: &str) -> Option<TableId> {
        self.by_name.get(name).copied()
    }

    /// Number of message tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of enum tables.
    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    /// All message tables with their ids.
    pub fn tables(&self) -> impl Iterator<Item = (TableId, &MiniTable)> + '_ {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| (TableId(i as u32), t))
    }
}

/// Incremental builder for a [`Schema`].
///
/// Tables are declared first (reserving a [`TableId`]) and defined
/// later, so a message can refer to itself or to a table defined after
/// it.
///
/// ```
/// use strand_schema::{FieldType, MessageLayout, SchemaBuilder};
///
/// let mut b = SchemaBuilder::new();
/// let node = b.declare("Node");
/// b.define(node, MessageLayout::new("Node")
///     .field(1, FieldType::Int32)
///     .message(2, node))
///     .unwrap();
/// let schema = b.build().unwrap();
/// assert_eq!(schema.find("Node"), Some(node));
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<(String, Option<MiniTable>)>,
    enums: Vec<EnumTable>,
}

impl SchemaBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for a table defined later.
    pub fn declare(&mut self, name: impl Into<String>) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push((name.into(), None));
        id
    }

    /// Lay out and define a declared table.
    ///
    /// # Errors
    ///
    /// Returns any layout error, or [`SchemaError::BadDefinition`] if
    /// `id` was not declared or is already defined.
    pub fn define(&mut self, id: TableId, layout: MessageLayout) -> Result<(), SchemaError> {
        let table = layout.build()?;
        self.define_table(id, table)
    }

    /// Define a declared table with a pre-built [`MiniTable`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::BadDefinition`] if `id` was not declared
    /// or is already defined.
    pub fn define_table(&mut self, id: TableId, table: MiniTable) -> Result<(), SchemaError> {
        let Some(slot) = self.tables.get_mut(id.0 as usize) else {
            return Err(SchemaError::BadDefinition {
                id,
                reason: "not declared",
            });
        };
        if slot.1.is_some() {
            return Err(SchemaError::BadDefinition {
                id,
                reason: "already defined",
            });
        }
        slot.1 = Some(table);
        Ok(())
    }

    /// Declare and define in one step.
    ///
    /// # Errors
    ///
    /// Returns any layout error.
    pub fn add(&mut self, layout: MessageLayout) -> Result<TableId, SchemaError> {
        let table = layout.build()?;
        let id = self.declare(table.name().to_owned());
        self.define_table(id, table)?;
        Ok(id)
    }

    /// Add an enum table.
    pub fn add_enum(&mut self, table: EnumTable) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(table);
        id
    }

    /// Check cross-table references and freeze the set.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UndefinedTable`] for a declared but
    /// undefined table, [`SchemaError::DuplicateName`] for two tables
    /// with one name, and [`SchemaError::SubReference`] for a field
    /// whose sub-table id does not resolve.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let table_count = self.tables.len();
        let enum_count = self.enums.len();
        let mut tables = Vec::with_capacity(table_count);
        let mut by_name = IndexMap::with_capacity(table_count);
        for (i, (name, table)) in self.tables.into_iter().enumerate() {
            let id = TableId(i as u32);
            let Some(table) = table else {
                return Err(SchemaError::UndefinedTable { id, name });
            };
            if by_name.insert(table.name().to_owned(), id).is_some() {
                return Err(SchemaError::DuplicateName {
                    name: table.name().to_owned(),
                });
            }
            for f in table.fields() {
                let dangling = match f.sub {
                    SubRef::Message(t) => (t.0 as usize >= table_count)
                        .then(|| format!("message table {t} not in schema")),
                    SubRef::Enum(e) => (e.0 as usize >= enum_count)
                        .then(|| format!("enum table {e} not in schema")),
                    SubRef::None => None,
                };
                if let Some(reason) = dangling {
                    return Err(SchemaError::SubReference {
                        table: table.name().to_owned(),
                        number: f.number.get(),
                        reason,
                    });
                }
            }
            tables.push(table);
        }
        let schema = Schema {
            id: SchemaId::next(),
            tables,
            enums: self.enums,
            by_name,
        };
        tracing::debug!(
            schema = %schema.id,
            tables = schema.tables.len(),
            enums = schema.enums.len(),
            "schema built"
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::layout::Label;

    #[test]
    fn recursive_and_mutual_references() {
        let mut b = SchemaBuilder::new();
        let a = b.declare("A");
        let bb = b.declare("B");
        b.define(a, MessageLayout::new("A").message(1, bb)).unwrap();
        b.define(bb, MessageLayout::new("B").message(1, a).message(2, bb))
            .unwrap();
        let s = b.build().unwrap();
        assert_eq!(s.table_count(), 2);
        assert_eq!(s.table(a).name(), "A");
    }

    #[test]
    fn undefined_table_rejected() {
        let mut b = SchemaBuilder::new();
        b.declare("Ghost");
        assert!(matches!(b.build(), Err(SchemaError::UndefinedTable { .. })));
    }

    #[test]
    fn dangling_reference_rejected() {
        let mut b = SchemaBuilder::new();
        b.add(MessageLayout::new("A").message(1, TableId(7))).unwrap();
        assert!(matches!(b.build(), Err(SchemaError::SubReference { .. })));

        let mut b = SchemaBuilder::new();
        b.add(MessageLayout::new("A").enumeration(1, EnumId(0), Label::Implicit))
            .unwrap();
        assert!(matches!(b.build(), Err(SchemaError::SubReference { .. })));
    }

    #[test]
    fn double_definition_rejected() {
        let mut b = SchemaBuilder::new();
        let a = b.declare("A");
        b.define(a, MessageLayout::new("A")).unwrap();
        let err = b.define(a, MessageLayout::new("A"));
        assert!(matches!(err, Err(SchemaError::BadDefinition { .. })));
        let err = b.define(TableId(9), MessageLayout::new("Z"));
        assert!(matches!(err, Err(SchemaError::BadDefinition { .. })));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = SchemaBuilder::new();
        b.add(MessageLayout::new("A")).unwrap();
        b.add(MessageLayout::new("A").field(1, FieldType::Int32))
            .unwrap();
        assert!(matches!(b.build(), Err(SchemaError::DuplicateName { .. })));
    }

    #[test]
    fn schema_ids_are_unique() {
        let a = SchemaBuilder::new().build().unwrap();
        let b = SchemaBuilder::new().build().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn schema_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
