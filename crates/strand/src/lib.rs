//! Strand: a schema-driven binary wire codec with arena-allocated messages.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Strand sub-crates. For most users, adding `strand` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strand::prelude::*;
//!
//! // Describe a message type: field 1 is an int32, field 2 a string.
//! let mut builder = SchemaBuilder::new();
//! let point = builder
//!     .add(
//!         MessageLayout::new("Point")
//!             .field(1, FieldType::Int32)
//!             .optional(2, FieldType::String),
//!     )
//!     .unwrap();
//! let schema = builder.build().unwrap();
//!
//! // Build a message in an arena and encode it.
//! let mut arena = Arena::new();
//! let msg = MessageRef::new(&schema, point, &mut arena).unwrap();
//! msg.edit(&schema, &mut arena).set(1, Value::I32(150)).unwrap();
//! let bytes = Encoder::new(&schema).encode(msg, &arena).unwrap();
//! assert_eq!(bytes, [0x08, 0x96, 0x01]);
//!
//! // Decode it back into a second arena.
//! let mut other = Arena::new();
//! let decoded = Decoder::new(&schema).decode(&bytes, point, &mut other).unwrap();
//! let view = decoded.view(&schema, &other);
//! assert_eq!(view.get(1), Some(Value::I32(150)));
//! assert_eq!(view.get(2), None);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`wire`] | `strand-core` | Field numbers, tags, varints, `WireReader` |
//! | [`arena`] | `strand-arena` | Region-based arena, `Ptr` handles, fusion |
//! | [`schema`] | `strand-schema` | Mini-tables, layouts, schemas, extension registry |
//! | [`codec`] | `strand-codec` | Messages, decoder, encoder, comparison |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Wire-format primitives (`strand-core`).
///
/// Most users never touch these directly; [`wire::WireReader`] and the
/// varint helpers are useful when hand-building or inspecting bytes.
pub use strand_core as wire;

/// Arena allocator (`strand-arena`).
///
/// [`arena::Arena`] owns all message memory; fuse arenas with
/// [`arena::Arena::fuse`] before linking messages across them.
pub use strand_arena as arena;

/// Schema tables (`strand-schema`).
///
/// Build tables with [`schema::MessageLayout`] and group them in a
/// [`schema::Schema`] via [`schema::SchemaBuilder`].
pub use strand_schema as schema;

/// Decoder, encoder and message access (`strand-codec`).
pub use strand_codec as codec;

/// Common imports for typical Strand usage.
///
/// ```rust
/// use strand::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use strand_arena::{Arena, ArenaConfig, ArenaError};

    // Wire primitives
    pub use strand_core::{EnumId, FieldNumber, TableId};

    // Schema
    pub use strand_schema::{
        EnumTable, Extension, ExtensionRegistry, FieldType, Label, MessageLayout, Schema,
        SchemaBuilder, SubRef,
    };

    // Codec
    pub use strand_codec::{
        compare_messages, DecodeError, DecodeOptions, Decoder, EncodeError, EncodeOptions,
        Encoder, MessageMut, MessageRef, MessageView, UnknownEnumPolicy, Value,
    };
}
