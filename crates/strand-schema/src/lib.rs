//! Schema tables for the Strand serialization runtime.
//!
//! A message type is described by a [`MiniTable`]: its fields sorted
//! by number, where each field's value lives in message memory, how
//! presence is tracked, and a small [`FastTable`] that resolves the
//! common one- and two-byte tags without searching. Tables are grouped
//! into a [`Schema`], which is what sub-message references index into,
//! and extensions of extendable tables live in an
//! [`ExtensionRegistry`].
//!
//! Tables are either laid out automatically with [`MessageLayout`] or
//! assembled from explicit [`FieldDescriptor`]s via [`MiniTable::new`],
//! which validates the layout. Everything here is immutable after
//! construction and safe to share across threads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod enums;
pub mod error;
pub mod fast;
pub mod field;
pub mod layout;
pub mod registry;
pub mod schema;
pub mod table;

pub use enums::EnumTable;
pub use error::{RegistryError, SchemaError};
pub use fast::{FastEntry, FastTable};
pub use field::{
    FieldDescriptor, FieldMode, FieldRep, FieldType, Presence, SubRef, ARRAY_HEADER_SIZE,
};
pub use layout::{Label, MessageLayout};
pub use registry::{Extension, ExtensionRegistry};
pub use schema::{Schema, SchemaBuilder, SchemaId};
pub use table::{ExtMode, MiniTable, OneofDescriptor};
