//! Error types for table construction and extension registration.

use std::error::Error;
use std::fmt;

use strand_core::{EnumId, TableId};

/// Errors from building a [`MiniTable`](crate::MiniTable) or a
/// [`Schema`](crate::Schema).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// Field number is zero or above the 29-bit maximum.
    InvalidFieldNumber {
        /// Table being built.
        table: String,
        /// Offending number.
        number: u32,
    },
    /// Field number falls in the implementation-reserved range.
    ReservedFieldNumber {
        /// Table being built.
        table: String,
        /// Offending number.
        number: u32,
    },
    /// Two fields share a number.
    DuplicateFieldNumber {
        /// Table being built.
        table: String,
        /// Duplicated number.
        number: u32,
    },
    /// A field's storage extends past the end of the message.
    FieldOutOfBounds {
        /// Table being built.
        table: String,
        /// Offending field.
        number: u32,
        /// Declared offset.
        offset: u32,
        /// Message data size.
        size: u32,
    },
    /// A field's offset is not aligned for its representation.
    MisalignedField {
        /// Table being built.
        table: String,
        /// Offending field.
        number: u32,
        /// Declared offset.
        offset: u32,
        /// Required alignment.
        align: u32,
    },
    /// Two storage ranges overlap and are not members of the same oneof.
    OverlappingFields {
        /// Table being built.
        table: String,
        /// First field (0 for a has-bit area or oneof case slot).
        first: u32,
        /// Second field.
        second: u32,
    },
    /// Two fields were assigned the same has-bit.
    HasBitCollision {
        /// Table being built.
        table: String,
        /// Shared has-bit index.
        index: u16,
    },
    /// Presence, mode and requiredness do not fit together.
    InvalidPresence {
        /// Table being built.
        table: String,
        /// Offending field.
        number: u32,
        /// What is wrong.
        reason: &'static str,
    },
    /// `packed` was requested for a string, bytes or message field.
    NotPackable {
        /// Table being built.
        table: String,
        /// Offending field.
        number: u32,
    },
    /// A field's sub-table reference does not match its type or does
    /// not resolve within the schema.
    SubReference {
        /// Table being built.
        table: String,
        /// Offending field.
        number: u32,
        /// What is wrong.
        reason: String,
    },
    /// A table id was declared but never defined.
    UndefinedTable {
        /// The undefined id.
        id: TableId,
        /// Name given at declaration.
        name: String,
    },
    /// A table id was defined twice, or was never declared.
    BadDefinition {
        /// The id.
        id: TableId,
        /// What is wrong.
        reason: &'static str,
    },
    /// Two tables share a name.
    DuplicateName {
        /// The shared name.
        name: String,
    },
    /// An enum id does not resolve.
    UnknownEnum {
        /// The id.
        id: EnumId,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFieldNumber { table, number } => {
                write!(f, "{table}: invalid field number {number}")
            }
            Self::ReservedFieldNumber { table, number } => {
                write!(f, "{table}: field number {number} is reserved")
            }
            Self::DuplicateFieldNumber { table, number } => {
                write!(f, "{table}: duplicate field number {number}")
            }
            Self::FieldOutOfBounds {
                table,
                number,
                offset,
                size,
            } => write!(
                f,
                "{table}: field {number} at offset {offset} exceeds message size {size}"
            ),
            Self::MisalignedField {
                table,
                number,
                offset,
                align,
            } => write!(
                f,
                "{table}: field {number} at offset {offset} is not {align}-byte aligned"
            ),
            Self::OverlappingFields {
                table,
                first,
                second,
            } => write!(f, "{table}: storage of fields {first} and {second} overlaps"),
            Self::HasBitCollision { table, index } => {
                write!(f, "{table}: has-bit {index} assigned twice")
            }
            Self::InvalidPresence {
                table,
                number,
                reason,
            } => write!(f, "{table}: field {number}: {reason}"),
            Self::NotPackable { table, number } => {
                write!(f, "{table}: field {number} cannot be packed")
            }
            Self::SubReference {
                table,
                number,
                reason,
            } => write!(f, "{table}: field {number}: {reason}"),
            Self::UndefinedTable { id, name } => {
                write!(f, "table {id} ({name}) declared but never defined")
            }
            Self::BadDefinition { id, reason } => write!(f, "table {id}: {reason}"),
            Self::DuplicateName { name } => write!(f, "duplicate table name '{name}'"),
            Self::UnknownEnum { id } => write!(f, "unknown enum table {id}"),
        }
    }
}

impl Error for SchemaError {}

/// Errors from [`ExtensionRegistry::register`](crate::ExtensionRegistry::register).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// An extension with this (extendee, number) pair already exists.
    DuplicateExtension {
        /// Extended table.
        extendee: TableId,
        /// Extension number.
        number: u32,
    },
    /// The extendee does not accept extensions.
    NotExtendable {
        /// Extended table.
        extendee: TableId,
    },
    /// The number is already used by a regular field of the extendee.
    NumberInUse {
        /// Extended table.
        extendee: TableId,
        /// Conflicting number.
        number: u32,
    },
    /// The extendee is not a table of the registry's schema.
    UnknownExtendee {
        /// The id.
        extendee: TableId,
    },
    /// The registry was created for a different schema.
    SchemaMismatch,
    /// The extension descriptor itself is unusable.
    InvalidDescriptor {
        /// Extension number.
        number: u32,
        /// What is wrong.
        reason: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateExtension { extendee, number } => {
                write!(f, "extension {number} of table {extendee} already registered")
            }
            Self::NotExtendable { extendee } => {
                write!(f, "table {extendee} does not accept extensions")
            }
            Self::NumberInUse { extendee, number } => {
                write!(f, "table {extendee} already has a field numbered {number}")
            }
            Self::UnknownExtendee { extendee } => write!(f, "unknown table {extendee}"),
            Self::SchemaMismatch => write!(f, "registry belongs to a different schema"),
            Self::InvalidDescriptor { number, reason } => {
                write!(f, "extension {number}: {reason}")
            }
        }
    }
}

impl Error for RegistryError {}
