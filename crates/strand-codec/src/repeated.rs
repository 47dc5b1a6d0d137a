//! Growable arrays stored behind a 16-byte inline header.
//!
//! ```text
//! header: data: Ptr (8) | len: u32 | capacity: u32
//! ```
//!
//! Repeated fields, the unknown-field byte buffer and the extension
//! list all use this shape. Growth doubles the capacity and copies
//! through [`Arena::grow`], which extends in place when it can.

use strand_arena::{Arena, ArenaError, Ptr};

const MIN_CAPACITY: u32 = 4;

/// Decoded array header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ArrayHeader {
    pub data: Ptr,
    pub len: u32,
    pub cap: u32,
}

pub(crate) fn header(arena: &Arena, slot: Ptr) -> ArrayHeader {
    ArrayHeader {
        data: arena.read_ptr(slot),
        len: arena.read_u32(slot.offset(8)),
        cap: arena.read_u32(slot.offset(12)),
    }
}

fn store_header(arena: &mut Arena, slot: Ptr, h: ArrayHeader) {
    arena.write_ptr(slot, h.data);
    arena.write_u32(slot.offset(8), h.len);
    arena.write_u32(slot.offset(12), h.cap);
}

/// Number of elements.
pub(crate) fn len(arena: &Arena, slot: Ptr) -> usize {
    arena.read_u32(slot.offset(8)) as usize
}

/// Pointer to element `index`.
///
/// # Panics
///
/// Panics if `index` is out of bounds.
pub(crate) fn element(arena: &Arena, slot: Ptr, elem_size: u32, index: usize) -> Ptr {
    let h = header(arena, slot);
    assert!(
        index < h.len as usize,
        "index {index} out of bounds for repeated field of length {}",
        h.len
    );
    h.data.offset(index as u32 * elem_size)
}

/// Ensure room for `additional` more elements.
pub(crate) fn reserve(
    arena: &mut Arena,
    slot: Ptr,
    elem_size: u32,
    additional: usize,
) -> Result<(), ArenaError> {
    let mut h = header(arena, slot);
    let needed = (h.len as usize).saturating_add(additional);
    if needed <= h.cap as usize {
        return Ok(());
    }
    let new_cap = needed
        .max(h.cap as usize * 2)
        .max(MIN_CAPACITY as usize);
    let too_big = || ArenaError::OutOfMemory {
        requested: new_cap.saturating_mul(elem_size as usize),
        limit: u32::MAX as usize,
    };
    let new_cap = u32::try_from(new_cap).map_err(|_| too_big())?;
    let new_bytes = new_cap.checked_mul(elem_size).ok_or_else(too_big)?;
    h.data = arena.grow(
        h.data,
        (h.cap * elem_size) as usize,
        new_bytes as usize,
        elem_size.min(8).next_power_of_two(),
    )?;
    h.cap = new_cap;
    store_header(arena, slot, h);
    Ok(())
}

/// Append one zeroed element and return a pointer to it.
pub(crate) fn push(arena: &mut Arena, slot: Ptr, elem_size: u32) -> Result<Ptr, ArenaError> {
    reserve(arena, slot, elem_size, 1)?;
    let mut h = header(arena, slot);
    let elem = h.data.offset(h.len * elem_size);
    h.len += 1;
    arena.write_u32(slot.offset(8), h.len);
    arena.zero(elem, elem_size as usize);
    Ok(elem)
}

/// Append raw bytes to a byte array.
pub(crate) fn append_bytes(arena: &mut Arena, slot: Ptr, bytes: &[u8]) -> Result<(), ArenaError> {
    if bytes.is_empty() {
        return Ok(());
    }
    reserve(arena, slot, 1, bytes.len())?;
    let h = header(arena, slot);
    arena
        .bytes_mut(h.data.offset(h.len), bytes.len())
        .copy_from_slice(bytes);
    arena.write_u32(slot.offset(8), h.len + bytes.len() as u32);
    Ok(())
}

/// Contents of a byte array.
pub(crate) fn bytes(arena: &Arena, slot: Ptr) -> &[u8] {
    let h = header(arena, slot);
    arena.bytes(h.data, h.len as usize)
}

/// Remove element `index` by moving the last element into its place.
pub(crate) fn swap_remove(arena: &mut Arena, slot: Ptr, elem_size: u32, index: usize) {
    let mut h = header(arena, slot);
    let last = h.len as usize - 1;
    if index != last {
        let tail = arena
            .bytes(h.data.offset(last as u32 * elem_size), elem_size as usize)
            .to_vec();
        arena
            .bytes_mut(h.data.offset(index as u32 * elem_size), elem_size as usize)
            .copy_from_slice(&tail);
    }
    h.len -= 1;
    arena.write_u32(slot.offset(8), h.len);
}

/// Drop every element, keeping the capacity.
pub(crate) fn clear(arena: &mut Arena, slot: Ptr) {
    arena.write_u32(slot.offset(8), 0);
}
