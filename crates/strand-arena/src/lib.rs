//! Bump-allocated, fusable memory regions for Strand messages.
//!
//! Every message, string, repeated-field buffer and unknown-field
//! accumulator produced by a decode (or built by hand) lives in an
//! [`Arena`]. Memory is reclaimed in bulk, never per object. This crate
//! contains no `unsafe` code: arena memory is addressed by [`Ptr`]
//! indices (region + address) rather than raw pointers.
//!
//! # Architecture
//!
//! ```text
//! Arena
//! ├── home region: BlockList → Block[] (bump-allocated Vec<u8>, doubling)
//! ├── fused regions: other arenas' memory, kept alive by this one
//! └── adopted regions: read-only input buffers (aliasing decode)
//! ```
//!
//! # Handle validity
//!
//! - Pointers survive block growth and fusion unchanged.
//! - [`Arena::reset`] renames the home region, so old pointers resolve
//!   to [`ArenaError::StaleHandle`]. An arena remembers only its last
//!   [`RETIRED_WINDOW`](arena::RETIRED_WINDOW) released regions; older
//!   pointers are reported as foreign.
//! - Region IDs are returned to a process-wide pool on reset and drop,
//!   and reissued only after a long delay.
//! - A pointer into an unfused arena resolves to
//!   [`ArenaError::ForeignHandle`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod handle;
mod raw;
mod region;

pub use arena::Arena;
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::{Ptr, RegionId};
