//! Wire decoder and encoder for the Strand serialization runtime.
//!
//! Messages live in an [`Arena`](strand_arena::Arena) and are shaped by
//! a [`MiniTable`](strand_schema::MiniTable) from a
//! [`Schema`](strand_schema::Schema). A [`MessageRef`] names one;
//! [`MessageView`] and [`MessageMut`] read and write its fields by
//! number.
//!
//! # Architecture
//!
//! - [`Decoder`] parses wire bytes into a new or existing message,
//!   dispatching known tags through each table's fast slots and falling
//!   back to number lookup, the extension registry, and finally the
//!   unknown-field buffer
//! - [`Encoder`] serializes in two passes (sizes, then bytes) into a
//!   `Vec<u8>` or an arena buffer
//! - [`compare_messages`] reports the first field-level divergence
//!   between two message trees
//!
//! Decoding and encoding are synchronous and keep no global state.
//! Schemas and registries are shared read-only; each thread brings its
//! own arena.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compare;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod message;
pub mod value;
pub mod view;

mod extension;
mod repeated;
mod required;
mod scalar;

pub use compare::{compare_messages, Divergence, DivergenceKind, PathSegment};
pub use config::{DecodeOptions, EncodeOptions, OptionsError, UnknownEnumPolicy};
pub use decode::{decode, Decoder};
pub use encode::{encode, Encoder};
pub use error::{DecodeError, EncodeError, MalformedReason};
pub use message::{allocate, MessageRef, HEADER_SIZE};
pub use value::Value;
pub use view::{MessageMut, MessageView};
