//! Region identifiers and arena pointers.
//!
//! A [`Ptr`] is an index, not an address: it names a region and a byte
//! address inside that region's linear address space. Pointers are
//! plain `Copy` data, so they can be stored inside message memory and
//! survive the arena's internal block growth unchanged.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Released IDs wait behind this many later releases before reuse.
const REUSE_DELAY: usize = 1 << 16;

/// Process-wide source of [`RegionId`]s.
///
/// Live IDs are unique and never zero. Released IDs queue up in FIFO
/// order and are handed out again only once more than [`REUSE_DELAY`]
/// are waiting, or once every 32-bit ID has been issued.
pub(crate) struct IdPool {
    /// Next never-issued ID; zero once all of them are gone.
    next: u32,
    free: VecDeque<u32>,
}

impl IdPool {
    pub(crate) const fn new() -> Self {
        Self {
            next: 1,
            free: VecDeque::new(),
        }
    }

    pub(crate) fn acquire(&mut self) -> Option<RegionId> {
        if self.free.len() > REUSE_DELAY || self.next == 0 {
            return self.free.pop_front().map(RegionId);
        }
        let id = self.next;
        self.next = id.wrapping_add(1);
        Some(RegionId(id))
    }

    pub(crate) fn release(&mut self, id: RegionId) {
        if id != RegionId::NULL {
            self.free.push_back(id.0);
        }
    }
}

static POOL: Mutex<IdPool> = Mutex::new(IdPool::new());

/// Lock the global pool. Its state stays consistent across a panic in
/// another holder, so poisoning is ignored.
pub(crate) fn pool() -> MutexGuard<'static, IdPool> {
    POOL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-unique identifier of a live memory region.
///
/// Every arena owns at least one region. Fusing arenas moves regions
/// between owners without renaming them, which is what keeps pointers
/// valid across a fuse. Resetting an arena renames its home region, so
/// pointers handed out before the reset stop resolving. IDs of released
/// regions are recycled, but only after a long delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub(crate) u32);

impl RegionId {
    /// The null region; never owned by any arena.
    pub const NULL: Self = Self(0);

    /// The raw identifier.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A location inside an arena region.
///
/// Encodes to 8 bytes (`region << 32 | addr`) for storage in message
/// memory; the all-zero encoding is [`Ptr::NULL`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Ptr {
    region: RegionId,
    addr: u32,
}

impl Ptr {
    /// The null pointer.
    pub const NULL: Self = Self {
        region: RegionId::NULL,
        addr: 0,
    };

    /// Size of the stored encoding in bytes.
    pub const ENCODED_LEN: usize = 8;

    pub(crate) fn new(region: RegionId, addr: u32) -> Self {
        Self { region, addr }
    }

    /// Whether this is the null pointer.
    pub fn is_null(self) -> bool {
        self.region == RegionId::NULL
    }

    /// The region this pointer names.
    pub fn region(self) -> RegionId {
        self.region
    }

    /// Byte address within the region.
    pub fn addr(self) -> u32 {
        self.addr
    }

    /// A pointer `delta` bytes further into the same allocation.
    ///
    /// # Panics
    ///
    /// Panics if called on the null pointer or if the address overflows.
    pub fn offset(self, delta: u32) -> Self {
        assert!(!self.is_null(), "offset applied to a null Ptr");
        let addr = self
            .addr
            .checked_add(delta)
            .unwrap_or_else(|| panic!("Ptr address overflow: {} + {delta}", self.addr));
        Self {
            region: self.region,
            addr,
        }
    }

    /// Pack into the 8-byte stored form.
    pub fn to_bits(self) -> u64 {
        (u64::from(self.region.0) << 32) | u64::from(self.addr)
    }

    /// Unpack from the 8-byte stored form.
    pub fn from_bits(bits: u64) -> Self {
        Self {
            region: RegionId((bits >> 32) as u32),
            addr: bits as u32,
        }
    }
}

impl fmt::Display for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Ptr(null)")
        } else {
            write!(f, "Ptr(region={}, addr={:#x})", self.region, self.addr)
        }
    }
}
