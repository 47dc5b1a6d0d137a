//! Little-endian loads and stores on arena memory.
//!
//! Message memory is plain bytes; these helpers are the only place
//! integers are packed into or out of it.

use crate::arena::Arena;
use crate::handle::Ptr;

impl Arena {
    /// Read one byte.
    pub fn read_u8(&self, ptr: Ptr) -> u8 {
        self.bytes(ptr, 1)[0]
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&self, ptr: Ptr) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.bytes(ptr, 4));
        u32::from_le_bytes(raw)
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&self, ptr: Ptr) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.bytes(ptr, 8));
        u64::from_le_bytes(raw)
    }

    /// Read a stored [`Ptr`].
    pub fn read_ptr(&self, ptr: Ptr) -> Ptr {
        Ptr::from_bits(self.read_u64(ptr))
    }

    /// Write one byte.
    pub fn write_u8(&mut self, ptr: Ptr, v: u8) {
        self.bytes_mut(ptr, 1)[0] = v;
    }

    /// Write a little-endian `u32`.
    pub fn write_u32(&mut self, ptr: Ptr, v: u32) {
        self.bytes_mut(ptr, 4).copy_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `u64`.
    pub fn write_u64(&mut self, ptr: Ptr, v: u64) {
        self.bytes_mut(ptr, 8).copy_from_slice(&v.to_le_bytes());
    }

    /// Store a [`Ptr`] in its 8-byte form.
    pub fn write_ptr(&mut self, ptr: Ptr, v: Ptr) {
        self.write_u64(ptr, v.to_bits());
    }

    /// Zero `len` bytes.
    pub fn zero(&mut self, ptr: Ptr, len: usize) {
        self.bytes_mut(ptr, len).fill(0);
    }
}

#[cfg(test)]
mod tests {
    use crate::Arena;

    #[test]
    fn integers_are_little_endian() {
        let mut arena = Arena::new();
        let p = arena.alloc(16, 8).unwrap();
        arena.write_u32(p, 0x0403_0201);
        assert_eq!(arena.bytes(p, 4), &[1, 2, 3, 4]);
        arena.write_u64(p.offset(8), u64::MAX - 1);
        assert_eq!(arena.read_u64(p.offset(8)), u64::MAX - 1);
        assert_eq!(arena.read_u8(p), 1);
    }

    #[test]
    fn stored_pointer_round_trips() {
        let mut arena = Arena::new();
        let slot = arena.alloc(8, 8).unwrap();
        let target = arena.alloc(4, 4).unwrap();
        arena.write_ptr(slot, target);
        assert_eq!(arena.read_ptr(slot), target);
        arena.zero(slot, 8);
        assert!(arena.read_ptr(slot).is_null());
    }
}
