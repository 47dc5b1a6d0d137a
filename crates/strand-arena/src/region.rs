//! Memory regions: owned block chains and borrowed input buffers.

use bytes::Bytes;

use crate::block::BlockList;

/// One addressable region of an arena.
///
/// Owned regions are written by bump allocation. External regions wrap
/// an input buffer adopted for aliasing decode: string and byte fields
/// point straight into it, and it is never written.
pub(crate) enum Region {
    /// Bump-allocated blocks owned by the arena.
    Owned(BlockList),
    /// A shared, read-only input buffer.
    External(Bytes),
}

impl Region {
    pub(crate) fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        match self {
            Self::Owned(blocks) => blocks.slice(addr, len),
            Self::External(bytes) => {
                let start = addr as usize;
                bytes.get(start..start.checked_add(len)?)
            }
        }
    }

    pub(crate) fn memory_bytes(&self) -> usize {
        match self {
            Self::Owned(blocks) => blocks.memory_bytes(),
            Self::External(_) => 0,
        }
    }

    pub(crate) fn used_bytes(&self) -> usize {
        match self {
            Self::Owned(blocks) => blocks.total_used(),
            Self::External(_) => 0,
        }
    }

    pub(crate) fn block_count(&self) -> usize {
        match self {
            Self::Owned(blocks) => blocks.block_count(),
            Self::External(_) => 0,
        }
    }
}
