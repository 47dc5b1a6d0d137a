//! Extension registry: out-of-table fields keyed by (extendee, number).

use indexmap::IndexMap;
use strand_core::{FieldNumber, TableId};

use crate::error::RegistryError;
use crate::field::{FieldDescriptor, FieldMode, FieldType, Presence, SubRef};
use crate::schema::{Schema, SchemaId};

/// A registered extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    /// The message type being extended.
    pub extendee: TableId,
    /// The extension field. `offset` is unused.
    pub descriptor: FieldDescriptor,
}

/// Map from (extendee, field number) to extension descriptors.
///
/// Populated before decoding and read-only afterwards; decoders and
/// encoders only ever take `&ExtensionRegistry`, so one registry can
/// serve any number of threads.
#[derive(Clone, Debug)]
pub struct ExtensionRegistry {
    schema: SchemaId,
    entries: IndexMap<(TableId, FieldNumber), Extension>,
}

impl ExtensionRegistry {
    /// An empty registry for `schema`.
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.id(),
            entries: IndexMap::new(),
        }
    }

    /// The schema this registry belongs to.
    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    /// Register an extension of `extendee`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::SchemaMismatch`] if `schema` is not the one
    ///   this registry was created for.
    /// - [`RegistryError::UnknownExtendee`] / [`RegistryError::NotExtendable`]
    ///   if the extendee is missing or closed to extensions.
    /// - [`RegistryError::NumberInUse`] if a regular field has the number.
    /// - [`RegistryError::DuplicateExtension`] if already registered.
    /// - [`RegistryError::InvalidDescriptor`] for oneof/has-bit
    ///   presence, a reserved number, packing a non-packable type or a
    ///   dangling sub-reference.
    pub fn register(
        &mut self,
        schema: &Schema,
        extendee: TableId,
        descriptor: FieldDescriptor,
    ) -> Result<&Extension, RegistryError> {
        if schema.id() != self.schema {
            return Err(RegistryError::SchemaMismatch);
        }
        let Some(table) = schema.get(extendee) else {
            return Err(RegistryError::UnknownExtendee { extendee });
        };
        if !table.is_extendable() {
            return Err(RegistryError::NotExtendable { extendee });
        }
        let number = descriptor.number;
        if table.field(number).is_some() {
            return Err(RegistryError::NumberInUse {
                extendee,
                number: number.get(),
            });
        }
        check_descriptor(schema, &descriptor)?;
        if self.entries.contains_key(&(extendee, number)) {
            return Err(RegistryError::DuplicateExtension {
                extendee,
                number: number.get(),
            });
        }
        tracing::debug!(
            extendee = %table.name(),
            number = number.get(),
            field_type = ?descriptor.field_type,
            "extension registered"
        );
        let entry = self
            .entries
            .entry((extendee, number))
            .or_insert(Extension {
                extendee,
                descriptor,
            });
        Ok(entry)
    }

    /// The extension numbered `number` of `extendee`, if registered.
    pub fn lookup(&self, extendee: TableId, number: FieldNumber) -> Option<&Extension> {
        self.entries.get(&(extendee, number))
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All extensions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Extension> + '_ {
        self.entries.values()
    }
}

fn check_descriptor(schema: &Schema, d: &FieldDescriptor) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidDescriptor {
        number: d.number.get(),
        reason: reason.to_owned(),
    };
    if d.number.is_reserved() {
        return Err(invalid("reserved field number"));
    }
    if d.presence != Presence::Implicit || d.required {
        return Err(invalid("extensions track presence by slot, not has-bit or oneof"));
    }
    if d.mode == (FieldMode::Repeated { packed: true }) && !d.field_type.is_packable() {
        return Err(invalid("type cannot be packed"));
    }
    let ok = match (d.field_type.is_message(), d.sub) {
        (true, SubRef::Message(t)) => schema.get(t).is_some(),
        (false, SubRef::Enum(e)) => {
            d.field_type == FieldType::Enum && schema.enum_table(e).is_some()
        }
        (false, SubRef::None) => d.field_type != FieldType::Enum,
        _ => false,
    };
    if !ok {
        return Err(invalid("sub-reference missing, dangling or of the wrong kind"));
    }
    Ok(())
}
