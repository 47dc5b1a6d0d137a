//! The [`Arena`]: a set of regions with one bump-allocated home.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::block::BlockList;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::{self, Ptr, RegionId};
use crate::region::Region;

/// Bump-pointer memory for one decode or build session.
///
/// All allocations come from the *home* region. Other regions arrive by
/// [`fuse`](Arena::fuse) (another arena's memory, kept alive as long as
/// this one) or by [`adopt`](Arena::adopt) (a read-only input buffer
/// used by aliasing decode). No allocation is freed individually; all
/// memory is reclaimed together by [`reset`](Arena::reset) or drop.
///
/// An arena is confined to one thread at a time (`&mut self` for every
/// write); independent arenas can be used from different threads.
pub struct Arena {
    home: RegionId,
    regions: IndexMap<RegionId, Region>,
    /// Most recently released regions, for stale-handle reporting.
    retired: VecDeque<RegionId>,
    config: ArenaConfig,
}

/// How many released region IDs an arena remembers. Pointers into older
/// regions are reported as [`ArenaError::ForeignHandle`].
pub const RETIRED_WINDOW: usize = 32;

impl Arena {
    /// Create an arena with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if every region ID is held by a live region.
    pub fn new() -> Self {
        match Self::build(ArenaConfig::default()) {
            Ok(arena) => arena,
            Err(e) => panic!("cannot create arena: {e}"),
        }
    }

    /// Create an arena with a validated configuration.
    pub fn with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Self::build(config)
    }

    fn build(config: ArenaConfig) -> Result<Self, ArenaError> {
        let home = handle::pool()
            .acquire()
            .ok_or(ArenaError::RegionsExhausted)?;
        let mut regions = IndexMap::with_capacity(1);
        regions.insert(
            home,
            Region::Owned(BlockList::new(
                config.initial_block_size,
                config.max_block_size,
            )),
        );
        Ok(Self {
            home,
            regions,
            retired: VecDeque::with_capacity(RETIRED_WINDOW),
            config,
        })
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The region new allocations are carved from.
    pub fn home_region(&self) -> RegionId {
        self.home
    }

    fn home_blocks(&mut self) -> &mut BlockList {
        match self.regions.get_mut(&self.home) {
            Some(Region::Owned(blocks)) => blocks,
            _ => unreachable!("home region is always owned and present"),
        }
    }

    /// Allocate `len` zeroed bytes aligned to `align` (a power of two).
    ///
    /// Amortised O(1). Fails only with [`ArenaError::OutOfMemory`] when
    /// a new block would exceed the configured ceiling or the region's
    /// 32-bit address space.
    pub fn alloc(&mut self, len: usize, align: u32) -> Result<Ptr, ArenaError> {
        debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
        let home = self.home;
        if let Some(addr) = self.home_blocks().alloc_existing(len, align) {
            return Ok(Ptr::new(home, addr));
        }

        let size = self
            .home_blocks()
            .next_block_size(len, align)
            .ok_or(ArenaError::OutOfMemory {
                requested: len,
                limit: u32::MAX as usize,
            })?;
        if let Some(limit) = self.config.max_bytes {
            if self.memory_bytes() + size as usize > limit {
                tracing::debug!(requested = len, limit, "arena memory ceiling reached");
                return Err(ArenaError::OutOfMemory {
                    requested: len,
                    limit,
                });
            }
        }
        tracing::trace!(block_size = size, region = home.get(), "arena grew a block");
        let addr = self
            .home_blocks()
            .push_block(size, len, align)
            .ok_or(ArenaError::OutOfMemory {
                requested: len,
                limit: size as usize,
            })?;
        Ok(Ptr::new(home, addr))
    }

    /// Allocate a copy of `data`.
    pub fn alloc_copy(&mut self, data: &[u8], align: u32) -> Result<Ptr, ArenaError> {
        let ptr = self.alloc(data.len(), align)?;
        self.bytes_mut(ptr, data.len()).copy_from_slice(data);
        Ok(ptr)
    }

    /// Grow an allocation from `old_len` to `new_len` bytes.
    ///
    /// Extends in place when `ptr` is the most recent home allocation;
    /// otherwise allocates fresh memory and copies the old contents.
    /// The bytes past `old_len` are zeroed. The old allocation is not
    /// reclaimed until the arena is reset or dropped.
    pub fn grow(
        &mut self,
        ptr: Ptr,
        old_len: usize,
        new_len: usize,
        align: u32,
    ) -> Result<Ptr, ArenaError> {
        if ptr.is_null() || old_len == 0 {
            return self.alloc(new_len, align);
        }
        debug_assert!(new_len >= old_len, "grow cannot shrink an allocation");
        if ptr.region() == self.home
            && self
                .home_blocks()
                .grow_in_place(ptr.addr(), old_len, new_len)
        {
            return Ok(ptr);
        }
        let fresh = self.alloc(new_len, align)?;
        if ptr.region() == self.home {
            self.home_blocks().copy(ptr.addr(), fresh.addr(), old_len);
        } else {
            let old = self.try_bytes(ptr, old_len)?.to_vec();
            self.bytes_mut(fresh, old_len).copy_from_slice(&old);
        }
        Ok(fresh)
    }

    /// Adopt a shared input buffer as a read-only region.
    ///
    /// Returns a pointer to its first byte. Fields that alias the input
    /// point into this region, which stays alive for as long as the
    /// arena does (the `Bytes` handle keeps the buffer referenced).
    pub fn adopt(&mut self, input: Bytes) -> Result<Ptr, ArenaError> {
        if input.len() > u32::MAX as usize {
            return Err(ArenaError::OutOfMemory {
                requested: input.len(),
                limit: u32::MAX as usize,
            });
        }
        let id = handle::pool()
            .acquire()
            .ok_or(ArenaError::RegionsExhausted)?;
        self.regions.insert(id, Region::External(input));
        Ok(Ptr::new(id, 0))
    }

    /// Take ownership of `other`'s memory.
    ///
    /// Every pointer into `other` stays valid and now resolves through
    /// `self`; the combined memory is released only when `self` is
    /// dropped or reset. This is what lets a message in one arena point
    /// at a sub-message decoded into another.
    pub fn fuse(&mut self, mut other: Arena) {
        tracing::trace!(
            into = self.home.get(),
            from = other.home.get(),
            regions = other.regions.len(),
            "fusing arenas"
        );
        self.regions.extend(std::mem::take(&mut other.regions));
        for id in std::mem::take(&mut other.retired) {
            self.retire(id);
        }
    }

    /// Release every allocation.
    ///
    /// Fused and adopted regions are dropped. The home blocks are kept
    /// for reuse under a fresh region ID, so pointers handed out before
    /// the reset fail with [`ArenaError::StaleHandle`] instead of
    /// silently reading new data.
    pub fn reset(&mut self) {
        let Some(Region::Owned(mut blocks)) = self.regions.swap_remove(&self.home) else {
            unreachable!("home region is always owned and present");
        };
        blocks.reset();
        let old_home = self.home;
        let released: Vec<RegionId> = self.regions.drain(..).map(|(id, _)| id).collect();
        {
            let mut pool = handle::pool();
            pool.release(old_home);
            for &id in &released {
                pool.release(id);
            }
            // Just released at least one ID, so the pool cannot be empty.
            self.home = pool.acquire().unwrap_or(old_home);
        }
        self.retire(old_home);
        for id in released {
            self.retire(id);
        }
        self.regions.insert(self.home, Region::Owned(blocks));
    }

    fn retire(&mut self, id: RegionId) {
        if self.retired.len() == RETIRED_WINDOW {
            self.retired.pop_front();
        }
        self.retired.push_back(id);
    }

    /// Number of released region IDs remembered for stale-handle
    /// reporting; never more than [`RETIRED_WINDOW`].
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Whether `ptr` names a region this arena currently owns.
    pub fn contains(&self, ptr: Ptr) -> bool {
        self.regions.contains_key(&ptr.region())
    }

    fn region(&self, ptr: Ptr) -> Result<&Region, ArenaError> {
        self.regions.get(&ptr.region()).ok_or_else(|| {
            if self.retired.contains(&ptr.region()) {
                ArenaError::StaleHandle {
                    region: ptr.region(),
                }
            } else {
                ArenaError::ForeignHandle {
                    region: ptr.region(),
                }
            }
        })
    }

    /// Check that `ptr` is owned by this arena (or is null).
    pub fn check(&self, ptr: Ptr) -> Result<(), ArenaError> {
        if ptr.is_null() {
            return Ok(());
        }
        self.region(ptr).map(drop)
    }

    /// Resolve `len` bytes at `ptr`.
    ///
    /// A zero-length read of the null pointer yields an empty slice.
    pub fn try_bytes(&self, ptr: Ptr, len: usize) -> Result<&[u8], ArenaError> {
        if ptr.is_null() && len == 0 {
            return Ok(&[]);
        }
        self.region(ptr)?
            .slice(ptr.addr(), len)
            .ok_or(ArenaError::OutOfBounds {
                region: ptr.region(),
                addr: ptr.addr(),
                len,
            })
    }

    /// Resolve `len` writable bytes at `ptr`.
    pub fn try_bytes_mut(&mut self, ptr: Ptr, len: usize) -> Result<&mut [u8], ArenaError> {
        self.region(ptr)?;
        match self.regions.get_mut(&ptr.region()) {
            Some(Region::Owned(blocks)) => {
                blocks
                    .slice_mut(ptr.addr(), len)
                    .ok_or(ArenaError::OutOfBounds {
                        region: ptr.region(),
                        addr: ptr.addr(),
                        len,
                    })
            }
            Some(Region::External(_)) => Err(ArenaError::ReadOnly {
                region: ptr.region(),
            }),
            None => unreachable!("region presence checked above"),
        }
    }

    /// Resolve `len` bytes at `ptr`.
    ///
    /// # Panics
    ///
    /// Panics if the pointer is stale, foreign, or out of bounds. These
    /// are caller contract violations; use [`try_bytes`](Self::try_bytes)
    /// to handle them.
    pub fn bytes(&self, ptr: Ptr, len: usize) -> &[u8] {
        match self.try_bytes(ptr, len) {
            Ok(bytes) => bytes,
            Err(e) => panic!("invalid arena read at {ptr}: {e}"),
        }
    }

    /// Resolve `len` writable bytes at `ptr`.
    ///
    /// # Panics
    ///
    /// Panics if the pointer is stale, foreign, read-only, or out of
    /// bounds.
    pub fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> &mut [u8] {
        match self.try_bytes_mut(ptr, len) {
            Ok(bytes) => bytes,
            Err(e) => panic!("invalid arena write at {ptr}: {e}"),
        }
    }

    /// Total owned block memory in bytes (capacity, not usage).
    pub fn memory_bytes(&self) -> usize {
        self.regions.values().map(Region::memory_bytes).sum()
    }

    /// Total bytes handed out by owned regions.
    pub fn allocated_bytes(&self) -> usize {
        self.regions.values().map(Region::used_bytes).sum()
    }

    /// Number of owned blocks across all regions.
    pub fn block_count(&self) -> usize {
        self.regions.values().map(Region::block_count).sum()
    }

    /// Number of regions (home, fused, and adopted).
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if self.regions.is_empty() {
            return;
        }
        let mut pool = handle::pool();
        for &id in self.regions.keys() {
            pool.release(id);
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("home", &self.home)
            .field("regions", &self.regions.len())
            .field("allocated_bytes", &self.allocated_bytes())
            .field("memory_bytes", &self.memory_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_arena() -> Arena {
        Arena::with_config(ArenaConfig {
            initial_block_size: 64,
            max_block_size: 256,
            max_bytes: None,
        })
        .unwrap()
    }

    #[test]
    fn alloc_returns_zeroed_aligned_memory() {
        let mut arena = Arena::new();
        arena.alloc(3, 1).unwrap();
        let p = arena.alloc(16, 8).unwrap();
        assert_eq!(p.addr() % 8, 0);
        assert!(arena.bytes(p, 16).iter().all(|&b| b == 0));
    }

    #[test]
    fn allocations_never_move_across_growth() {
        let mut arena = small_arena();
        let first = arena.alloc_copy(b"hello", 1).unwrap();
        for _ in 0..100 {
            arena.alloc(50, 8).unwrap();
        }
        assert!(arena.block_count() > 1);
        assert_eq!(arena.bytes(first, 5), b"hello");
    }

    #[test]
    fn large_allocation_gets_its_own_block() {
        let mut arena = small_arena();
        let p = arena.alloc(10_000, 8).unwrap();
        arena.bytes_mut(p, 10_000)[9_999] = 1;
        assert_eq!(arena.bytes(p, 10_000)[9_999], 1);
    }

    #[test]
    fn grow_in_place_keeps_pointer() {
        let mut arena = Arena::new();
        let p = arena.alloc_copy(&[1, 2, 3, 4], 4).unwrap();
        let q = arena.grow(p, 4, 8, 4).unwrap();
        assert_eq!(p, q);
        assert_eq!(arena.bytes(q, 8), &[1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn grow_copies_when_not_last() {
        let mut arena = Arena::new();
        let p = arena.alloc_copy(&[5, 6], 1).unwrap();
        arena.alloc(1, 1).unwrap();
        let q = arena.grow(p, 2, 4, 1).unwrap();
        assert_ne!(p, q);
        assert_eq!(arena.bytes(q, 4), &[5, 6, 0, 0]);
        // The old allocation is untouched.
        assert_eq!(arena.bytes(p, 2), &[5, 6]);
    }

    #[test]
    fn reset_invalidates_old_pointers() {
        let mut arena = Arena::new();
        let p = arena.alloc_copy(b"abc", 1).unwrap();
        arena.reset();
        assert_eq!(
            arena.try_bytes(p, 3),
            Err(ArenaError::StaleHandle { region: p.region() })
        );
        assert_eq!(arena.allocated_bytes(), 0);
        let q = arena.alloc(3, 1).unwrap();
        assert_ne!(p.region(), q.region());
    }

    #[test]
    fn repeated_resets_keep_bookkeeping_bounded() {
        let mut arena = Arena::new();
        for _ in 0..100_000 {
            arena.alloc(8, 8).unwrap();
            arena.reset();
        }
        assert_eq!(arena.retired_count(), RETIRED_WINDOW);
        assert_eq!(arena.region_count(), 1);

        let p = arena.alloc_copy(b"live", 1).unwrap();
        arena.reset();
        assert_eq!(
            arena.try_bytes(p, 4),
            Err(ArenaError::StaleHandle { region: p.region() })
        );
    }

    #[test]
    fn reset_releases_fused_and_adopted_regions() {
        let mut a = Arena::new();
        let mut b = Arena::new();
        let pb = b.alloc(4, 4).unwrap();
        a.fuse(b);
        let pin = a.adopt(Bytes::from_static(b"in")).unwrap();
        assert_eq!(a.region_count(), 3);
        a.reset();
        assert_eq!(a.region_count(), 1);
        assert_eq!(a.retired_count(), 3);
        assert!(matches!(a.try_bytes(pb, 4), Err(ArenaError::StaleHandle { .. })));
        assert!(matches!(a.try_bytes(pin, 2), Err(ArenaError::StaleHandle { .. })));
    }

    #[test]
    fn fresh_allocations_are_never_null() {
        let mut arenas: Vec<Arena> = (0..64).map(|_| Arena::new()).collect();
        for arena in &mut arenas {
            assert!(!arena.alloc(16, 8).unwrap().is_null());
            arena.reset();
            assert!(!arena.alloc(16, 8).unwrap().is_null());
        }
    }

    #[test]
    fn foreign_pointer_is_reported() {
        let mut a = Arena::new();
        let b = Arena::new();
        let p = a.alloc(4, 4).unwrap();
        assert_eq!(
            b.try_bytes(p, 4),
            Err(ArenaError::ForeignHandle { region: p.region() })
        );
        assert!(!b.contains(p));
    }

    #[test]
    fn fuse_keeps_other_memory_alive() {
        let mut a = Arena::new();
        let mut b = Arena::new();
        let pb = b.alloc_copy(b"from b", 1).unwrap();
        a.fuse(b);
        assert!(a.contains(pb));
        assert_eq!(a.bytes(pb, 6), b"from b");
        // New allocations still come from a's home.
        let pa = a.alloc(1, 1).unwrap();
        assert_eq!(pa.region(), a.home_region());
        assert_eq!(a.region_count(), 2);
    }

    #[test]
    fn grow_from_fused_region_copies_home() {
        let mut a = Arena::new();
        let mut b = Arena::new();
        let pb = b.alloc_copy(&[1, 2], 1).unwrap();
        a.fuse(b);
        let q = a.grow(pb, 2, 3, 1).unwrap();
        assert_eq!(q.region(), a.home_region());
        assert_eq!(a.bytes(q, 3), &[1, 2, 0]);
    }

    #[test]
    fn adopted_region_is_read_only() {
        let mut arena = Arena::new();
        let p = arena.adopt(Bytes::from_static(b"input")).unwrap();
        assert_eq!(arena.bytes(p.offset(1), 3), b"npu");
        assert_eq!(
            arena.try_bytes_mut(p, 1).map(|_| ()),
            Err(ArenaError::ReadOnly { region: p.region() })
        );
        assert!(arena.try_bytes(p.offset(4), 2).is_err());
    }

    #[test]
    fn memory_ceiling_reports_out_of_memory() {
        let mut arena = Arena::with_config(ArenaConfig {
            initial_block_size: 64,
            max_block_size: 64,
            max_bytes: Some(128),
        })
        .unwrap();
        arena.alloc(64, 1).unwrap();
        arena.alloc(64, 1).unwrap();
        assert!(matches!(
            arena.alloc(1, 1),
            Err(ArenaError::OutOfMemory { limit: 128, .. })
        ));
    }

    #[test]
    fn null_zero_length_read_is_empty() {
        let arena = Arena::new();
        assert_eq!(arena.try_bytes(Ptr::NULL, 0), Ok(&[][..]));
        assert!(arena.check(Ptr::NULL).is_ok());
    }

    #[test]
    #[should_panic(expected = "invalid arena read")]
    fn plain_read_of_foreign_pointer_panics() {
        let mut a = Arena::new();
        let p = a.alloc(1, 1).unwrap();
        let _ = Arena::new().bytes(p, 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_allocation_keeps_its_contents(
                sizes in proptest::collection::vec(1usize..300, 1..60),
            ) {
                let mut arena = small_arena();
                let mut live = Vec::new();
                for (i, &len) in sizes.iter().enumerate() {
                    let fill = (i % 251) as u8;
                    let p = arena.alloc(len, 8).unwrap();
                    arena.bytes_mut(p, len).fill(fill);
                    live.push((p, len, fill));
                }
                for (p, len, fill) in live {
                    prop_assert_eq!(p.addr() % 8, 0);
                    prop_assert!(arena.bytes(p, len).iter().all(|&b| b == fill));
                }
            }
        }
    }
}
