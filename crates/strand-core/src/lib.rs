//! Wire-format primitives for the Strand serialization runtime.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the pieces of the tag-length-value wire format that every other
//! crate builds on: field numbers, wire types, tags, base-128 varints,
//! ZigZag mapping, and a bounded [`WireReader`] over an input slice.
//!
//! # Format
//!
//! ```text
//! field   := tag value
//! tag     := varint((field_number << 3) | wire_type)
//! value   := varint | fixed64 | len:varint bytes[len] | fields* END_GROUP | fixed32
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod reader;
pub mod wire;

pub use error::WireError;
pub use id::{EnumId, FieldNumber, TableId};
pub use reader::WireReader;
pub use wire::{
    decode_zigzag32, decode_zigzag64, encode_varint, encode_zigzag32, encode_zigzag64, varint_len,
    Tag, WireType,
};
