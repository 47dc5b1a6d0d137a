//! Contiguous memory blocks and growable block lists.
//!
//! A [`Block`] is a contiguous zero-initialised `Vec<u8>` with a bump
//! cursor. A [`BlockList`] chains blocks into one linear address space:
//! block `i` covers `[base_i, base_i + capacity_i)`, so an address alone
//! identifies its block. Allocations never span blocks and are never
//! moved once handed out.

/// Round `value` up to a multiple of `align` (a power of two).
pub(crate) fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// A single contiguous memory block with bump allocation.
pub struct Block {
    /// First address covered by this block.
    base: u32,
    /// Backing storage. Allocated to full capacity at creation.
    data: Vec<u8>,
    /// Bump pointer: next free byte within `data`.
    cursor: usize,
}

impl Block {
    /// Create a zeroed block covering `[base, base + capacity)`.
    pub fn new(base: u32, capacity: u32) -> Self {
        Self {
            base,
            data: vec![0; capacity as usize],
            cursor: 0,
        }
    }

    /// Bump-allocate `len` bytes aligned to `align`.
    ///
    /// Returns the address of the allocation, or `None` if the block
    /// has insufficient remaining capacity. The returned bytes are
    /// zeroed even if the block was reset and reused.
    pub fn alloc(&mut self, len: usize, align: u32) -> Option<u32> {
        let start_addr = align_up(
            u64::from(self.base) + self.cursor as u64,
            u64::from(align.max(1)),
        );
        let start = (start_addr - u64::from(self.base)) as usize;
        let end = start.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        self.data[self.cursor..end].fill(0);
        self.cursor = end;
        Some(start_addr as u32)
    }

    /// Try to extend the allocation ending at the cursor in place.
    ///
    /// Succeeds only when `[addr, addr + old_len)` is the most recent
    /// allocation in this block and the block has room for `new_len`.
    pub fn grow_in_place(&mut self, addr: u32, old_len: usize, new_len: usize) -> bool {
        let start = (addr - self.base) as usize;
        if start + old_len != self.cursor || start + new_len > self.data.len() {
            return false;
        }
        self.data[self.cursor..start + new_len].fill(0);
        self.cursor = start + new_len;
        true
    }

    /// Whether `[addr, addr + len)` lies inside the allocated prefix.
    pub fn covers(&self, addr: u32, len: usize) -> bool {
        addr >= self.base && (addr - self.base) as usize + len <= self.cursor
    }

    /// Shared slice of an allocated range.
    ///
    /// # Panics
    ///
    /// Panics if the range is outside this block.
    pub fn slice(&self, addr: u32, len: usize) -> &[u8] {
        let start = (addr - self.base) as usize;
        &self.data[start..start + len]
    }

    /// Mutable slice of an allocated range.
    ///
    /// # Panics
    ///
    /// Panics if the range is outside this block.
    pub fn slice_mut(&mut self, addr: u32, len: usize) -> &mut [u8] {
        let start = (addr - self.base) as usize;
        &mut self.data[start..start + len]
    }

    /// Reset the bump pointer to zero without deallocating.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// First address covered by this block.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Bytes currently allocated.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
}

/// A growable chain of [`Block`]s sharing one address space.
///
/// When the current block is full, allocation moves to the next block
/// (reusing blocks kept across a reset) or appends a new one whose size
/// doubles the previous, up to `max_block_size`.
pub struct BlockList {
    blocks: Vec<Block>,
    /// Index of the block currently being filled.
    current: usize,
    /// Address the next appended block will start at.
    next_base: u64,
    max_block_size: u32,
}

impl BlockList {
    /// Create a list with one pre-allocated block.
    pub fn new(initial_block_size: u32, max_block_size: u32) -> Self {
        Self {
            blocks: vec![Block::new(0, initial_block_size)],
            current: 0,
            next_base: u64::from(initial_block_size),
            max_block_size,
        }
    }

    /// Bump-allocate from existing blocks without growing.
    pub fn alloc_existing(&mut self, len: usize, align: u32) -> Option<u32> {
        while self.current < self.blocks.len() {
            if let Some(addr) = self.blocks[self.current].alloc(len, align) {
                return Some(addr);
            }
            if self.current + 1 == self.blocks.len() {
                return None;
            }
            self.current += 1;
        }
        None
    }

    /// Size the next block would need to hold `len` bytes at `align`.
    ///
    /// Returns `None` if the block would not fit in the 32-bit address
    /// space.
    pub fn next_block_size(&self, len: usize, align: u32) -> Option<u32> {
        let last = self.blocks.last().map_or(0, Block::capacity) as u64;
        let grown = (last * 2).min(u64::from(self.max_block_size));
        // Block bases are 16-aligned, so only stricter alignments need slack.
        let slack = if align > 16 { u64::from(align) - 1 } else { 0 };
        let needed = align_up(len as u64 + slack, 16);
        let size = grown.max(needed);
        if self.next_base + size > u64::from(u32::MAX) {
            return None;
        }
        Some(size as u32)
    }

    /// Append a block of `size` bytes and allocate from it.
    pub fn push_block(&mut self, size: u32, len: usize, align: u32) -> Option<u32> {
        let base = self.next_base as u32;
        let mut block = Block::new(base, size);
        let addr = block.alloc(len, align)?;
        self.next_base = align_up(self.next_base + u64::from(size), 16);
        self.blocks.push(block);
        self.current = self.blocks.len() - 1;
        Some(addr)
    }

    /// Index of the block containing `addr`.
    fn find(&self, addr: u32) -> Option<usize> {
        let idx = self.blocks.partition_point(|b| b.base() <= addr);
        idx.checked_sub(1)
    }

    /// Whether `[addr, addr + len)` is allocated memory of this list.
    pub fn covers(&self, addr: u32, len: usize) -> bool {
        self.find(addr)
            .is_some_and(|i| self.blocks[i].covers(addr, len))
    }

    /// Shared slice of an allocated range, if it is one.
    pub fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let i = self.find(addr)?;
        let block = &self.blocks[i];
        block.covers(addr, len).then(|| block.slice(addr, len))
    }

    /// Mutable slice of an allocated range, if it is one.
    pub fn slice_mut(&mut self, addr: u32, len: usize) -> Option<&mut [u8]> {
        let i = self.find(addr)?;
        let block = &mut self.blocks[i];
        if block.covers(addr, len) {
            Some(block.slice_mut(addr, len))
        } else {
            None
        }
    }

    /// Extend the most recent allocation in place, if possible.
    pub fn grow_in_place(&mut self, addr: u32, old_len: usize, new_len: usize) -> bool {
        match self.find(addr) {
            Some(i) if i == self.current => self.blocks[i].grow_in_place(addr, old_len, new_len),
            _ => false,
        }
    }

    /// Copy `len` bytes from `src` to `dst`, both allocated ranges.
    ///
    /// # Panics
    ///
    /// Panics if either range is not allocated memory of this list.
    pub fn copy(&mut self, src: u32, dst: u32, len: usize) {
        let (Some(si), Some(di)) = (self.find(src), self.find(dst)) else {
            panic!("copy between unallocated addresses {src:#x} -> {dst:#x}");
        };
        if si == di {
            let block = &mut self.blocks[si];
            let s = (src - block.base()) as usize;
            let d = (dst - block.base()) as usize;
            block.data.copy_within(s..s + len, d);
        } else if si < di {
            let (lo, hi) = self.blocks.split_at_mut(di);
            hi[0]
                .slice_mut(dst, len)
                .copy_from_slice(lo[si].slice(src, len));
        } else {
            let (lo, hi) = self.blocks.split_at_mut(si);
            lo[di]
                .slice_mut(dst, len)
                .copy_from_slice(hi[0].slice(src, len));
        }
    }

    /// Reset all blocks' bump pointers without deallocating.
    ///
    /// After reset, allocations start from the first block again.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.reset();
        }
        self.current = 0;
    }

    /// Number of blocks currently allocated.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total capacity across all blocks in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.blocks.iter().map(Block::capacity).sum()
    }

    /// Total allocated bytes across all blocks.
    pub fn total_used(&self) -> usize {
        self.blocks.iter().map(Block::used).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_alloc_returns_zeroed_data() {
        let mut block = Block::new(0, 1024);
        let addr = block.alloc(10, 1).unwrap();
        assert_eq!(addr, 0);
        assert!(block.slice(addr, 10).iter().all(|&b| b == 0));
    }

    #[test]
    fn block_alloc_respects_alignment() {
        let mut block = Block::new(0, 1024);
        block.alloc(3, 1).unwrap();
        let addr = block.alloc(8, 8).unwrap();
        assert_eq!(addr, 8);
        assert_eq!(block.used(), 16);
    }

    #[test]
    fn block_alloc_fails_when_full() {
        let mut block = Block::new(0, 100);
        assert!(block.alloc(100, 1).is_some());
        assert!(block.alloc(1, 1).is_none());
    }

    #[test]
    fn reset_then_alloc_rezeroes() {
        let mut block = Block::new(0, 64);
        let addr = block.alloc(4, 1).unwrap();
        block.slice_mut(addr, 4).copy_from_slice(&[1, 2, 3, 4]);
        block.reset();
        let addr = block.alloc(4, 1).unwrap();
        assert_eq!(block.slice(addr, 4), &[0, 0, 0, 0]);
    }

    #[test]
    fn grow_in_place_only_for_last_allocation() {
        let mut block = Block::new(0, 64);
        let a = block.alloc(8, 8).unwrap();
        let b = block.alloc(8, 8).unwrap();
        assert!(!block.grow_in_place(a, 8, 16));
        assert!(block.grow_in_place(b, 8, 16));
        assert_eq!(block.used(), 24);
    }

    #[test]
    fn list_grows_geometrically() {
        let mut list = BlockList::new(64, 1024);
        assert!(list.alloc_existing(64, 1).is_some());
        assert!(list.alloc_existing(1, 1).is_none());
        let size = list.next_block_size(1, 1).unwrap();
        assert_eq!(size, 128);
        let addr = list.push_block(size, 1, 1).unwrap();
        assert_eq!(addr, 64);
        assert_eq!(list.block_count(), 2);
    }

    #[test]
    fn oversized_request_gets_dedicated_block() {
        let list = BlockList::new(64, 256);
        let size = list.next_block_size(10_000, 8).unwrap();
        assert!(size as usize >= 10_000);
    }

    #[test]
    fn addresses_resolve_to_their_block() {
        let mut list = BlockList::new(64, 1024);
        let a = list.alloc_existing(60, 1).unwrap();
        let size = list.next_block_size(32, 8).unwrap();
        let b = list.push_block(size, 32, 8).unwrap();
        list.slice_mut(a, 4).unwrap().copy_from_slice(&[9, 9, 9, 9]);
        list.slice_mut(b, 4).unwrap().copy_from_slice(&[7, 7, 7, 7]);
        assert_eq!(list.slice(a, 4).unwrap(), &[9, 9, 9, 9]);
        assert_eq!(list.slice(b, 4).unwrap(), &[7, 7, 7, 7]);
        // Past the allocated prefix of the first block.
        assert!(list.slice(60, 8).is_none());
    }

    #[test]
    fn copy_across_blocks() {
        let mut list = BlockList::new(64, 1024);
        let a = list.alloc_existing(8, 8).unwrap();
        list.slice_mut(a, 8).unwrap().copy_from_slice(&[1; 8]);
        list.alloc_existing(56, 8).unwrap();
        let size = list.next_block_size(8, 8).unwrap();
        let b = list.push_block(size, 8, 8).unwrap();
        list.copy(a, b, 8);
        assert_eq!(list.slice(b, 8).unwrap(), &[1; 8]);
    }

    #[test]
    fn reset_reuses_blocks() {
        let mut list = BlockList::new(64, 1024);
        list.alloc_existing(64, 1).unwrap();
        let size = list.next_block_size(64, 1).unwrap();
        list.push_block(size, 64, 1).unwrap();
        list.reset();
        assert_eq!(list.total_used(), 0);
        assert_eq!(list.block_count(), 2);
        assert_eq!(list.alloc_existing(10, 1), Some(0));
    }
}
