//! Bounded reader over wire-format input.
//!
//! [`WireReader`] walks a byte slice with a movable *limit*: entering a
//! length-delimited region pushes a tighter limit, leaving it pops the
//! previous one. Every read is checked against the current limit, so a
//! length prefix that lies about its size can never cause a read past
//! the region it claims (or past the end of the input).

use smallvec::SmallVec;

use crate::error::WireError;
use crate::id::FieldNumber;
use crate::wire::{Tag, WireType, MAX_VARINT_LEN};

/// A cursor over wire-format bytes with a stack of nested limits.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// End of the current region (exclusive).
    limit: usize,
    /// Limits of enclosing regions, innermost last.
    saved: SmallVec<[usize; 16]>,
}

impl<'a> WireReader<'a> {
    /// Create a reader over the whole of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            limit: buf.len(),
            saved: SmallVec::new(),
        }
    }

    /// The full input, independent of the current limit.
    pub fn input(&self) -> &'a [u8] {
        self.buf
    }

    /// Current offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// End of the current region.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes left in the current region.
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// Whether the current region is exhausted.
    pub fn is_at_limit(&self) -> bool {
        self.pos >= self.limit
    }

    /// Number of regions currently pushed.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Restrict reads to the next `len` bytes.
    ///
    /// Fails with [`WireError::LengthOverrun`] if `len` exceeds the
    /// bytes left in the current region. `offset` is the position of
    /// the length prefix, used for error reporting.
    pub fn push_limit(&mut self, len: u64, offset: usize) -> Result<(), WireError> {
        let available = self.remaining();
        if len > available as u64 {
            return Err(WireError::LengthOverrun {
                offset,
                declared: len,
                available,
            });
        }
        self.saved.push(self.limit);
        self.limit = self.pos + len as usize;
        Ok(())
    }

    /// Restore the limit saved by the matching [`push_limit`](Self::push_limit).
    ///
    /// The cursor is moved to the end of the region being left, so any
    /// bytes a caller chose not to consume are skipped.
    pub fn pop_limit(&mut self) {
        if let Some(outer) = self.saved.pop() {
            self.pos = self.limit;
            self.limit = outer;
        }
    }

    /// Peek the dispatch key of the next tag without consuming it.
    ///
    /// The key is the tag's own encoded bytes, little-endian: one byte
    /// if the first byte has no continuation bit, otherwise the first
    /// two. Returns `None` near the end of the region or for tags of
    /// three or more bytes.
    pub fn peek_fast_key(&self) -> Option<u16> {
        let first = *self.buf[..self.limit].get(self.pos)?;
        if first < 0x80 {
            return Some(u16::from(first));
        }
        let second = *self.buf[..self.limit].get(self.pos + 1)?;
        if second >= 0x80 {
            return None;
        }
        Some(u16::from(first) | (u16::from(second) << 8))
    }

    /// Advance past `n` bytes already inspected with a peek.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.limit);
    }

    /// Read a base-128 varint.
    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let start = self.pos;
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.buf[..self.limit].get(start + i) else {
                return Err(WireError::Truncated {
                    offset: start,
                    needed: i + 1,
                });
            };
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(WireError::VarintOverflow { offset: start });
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte < 0x80 {
                self.pos = start + i + 1;
                return Ok(value);
            }
        }
        Err(WireError::VarintOverflow { offset: start })
    }

    /// Read a tag, validating the wire type and field number.
    pub fn read_tag(&mut self) -> Result<Tag, WireError> {
        let offset = self.pos;
        let raw = self.read_varint()?;
        if raw > u64::from(u32::MAX) {
            return Err(WireError::InvalidFieldNumber { offset, value: raw });
        }
        let bits = (raw & 7) as u8;
        let wire_type =
            WireType::from_bits(bits).ok_or(WireError::InvalidWireType { offset, value: bits })?;
        let number = FieldNumber::new((raw >> 3) as u32)
            .ok_or(WireError::InvalidFieldNumber { offset, value: raw })?;
        Ok(Tag::new(number, wire_type))
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::Truncated {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    /// Read a little-endian 32-bit value.
    pub fn read_fixed32(&mut self) -> Result<u32, WireError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    /// Read a little-endian 64-bit value.
    pub fn read_fixed64(&mut self) -> Result<u64, WireError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a varint length prefix and the bytes it covers.
    ///
    /// Returns the offset of the first payload byte and the payload.
    pub fn read_length_delimited(&mut self) -> Result<(usize, &'a [u8]), WireError> {
        let offset = self.pos;
        let len = self.read_varint()?;
        let available = self.remaining();
        if len > available as u64 {
            return Err(WireError::LengthOverrun {
                offset,
                declared: len,
                available,
            });
        }
        let start = self.pos;
        let bytes = self.read_bytes(len as usize)?;
        Ok((start, bytes))
    }

    /// Skip the value belonging to `tag`, which has already been read.
    ///
    /// Groups are skipped recursively up to `depth_budget` levels; an
    /// END_GROUP tag whose number differs from the group being skipped
    /// is malformed. Skipping a bare END_GROUP is an error because the
    /// caller is responsible for matching its own group.
    pub fn skip_value(&mut self, tag: Tag, depth_budget: u32) -> Result<(), WireError> {
        match tag.wire_type {
            WireType::Varint => self.read_varint().map(drop),
            WireType::Fixed64 => self.read_bytes(8).map(drop),
            WireType::Fixed32 => self.read_bytes(4).map(drop),
            WireType::LengthDelimited => self.read_length_delimited().map(drop),
            WireType::StartGroup => self.skip_group(tag.number, depth_budget),
            WireType::EndGroup => Err(WireError::GroupMismatch {
                offset: self.pos,
                expected: 0,
                found: tag.number.get(),
            }),
        }
    }

    fn skip_group(&mut self, number: FieldNumber, depth_budget: u32) -> Result<(), WireError> {
        if depth_budget == 0 {
            return Err(WireError::NestingTooDeep { limit: depth_budget });
        }
        loop {
            if self.is_at_limit() {
                return Err(WireError::UnterminatedGroup {
                    offset: self.pos,
                    number: number.get(),
                });
            }
            let offset = self.pos;
            let tag = self.read_tag()?;
            if tag.wire_type == WireType::EndGroup {
                if tag.number != number {
                    return Err(WireError::GroupMismatch {
                        offset,
                        expected: number.get(),
                        found: tag.number.get(),
                    });
                }
                return Ok(());
            }
            match tag.wire_type {
                WireType::StartGroup => self
                    .skip_group(tag.number, depth_budget - 1)
                    .map_err(|e| match e {
                        WireError::NestingTooDeep { .. } => {
                            WireError::NestingTooDeep { limit: depth_budget }
                        }
                        other => other,
                    })?,
                _ => self.skip_value(tag, depth_budget)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_tag_and_varint() {
        let mut r = WireReader::new(&[0x08, 0x96, 0x01]);
        let tag = r.read_tag().unwrap();
        assert_eq!(tag.number.get(), 1);
        assert_eq!(tag.wire_type, WireType::Varint);
        assert_eq!(r.read_varint().unwrap(), 150);
        assert!(r.is_at_limit());
    }

    #[test]
    fn truncated_varint_reports_offset() {
        let mut r = WireReader::new(&[0x08, 0x96]);
        r.read_tag().unwrap();
        assert_eq!(
            r.read_varint(),
            Err(WireError::Truncated {
                offset: 1,
                needed: 2
            })
        );
    }

    #[test]
    fn length_prefix_past_end_is_rejected() {
        // Field 1, length 10, but only 3 payload bytes.
        let mut r = WireReader::new(&[0x0a, 0x0a, 1, 2, 3]);
        r.read_tag().unwrap();
        assert!(matches!(
            r.read_length_delimited(),
            Err(WireError::LengthOverrun {
                declared: 10,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn limits_nest_and_restore() {
        let data = [1, 2, 3, 4, 5];
        let mut r = WireReader::new(&data);
        r.push_limit(3, 0).unwrap();
        assert_eq!(r.remaining(), 3);
        r.push_limit(1, 0).unwrap();
        assert_eq!(r.read_bytes(1).unwrap(), &[1]);
        assert!(r.read_bytes(1).is_err());
        r.pop_limit();
        assert_eq!(r.remaining(), 2);
        r.pop_limit();
        // Leaving the outer region skips its unread bytes.
        assert_eq!(r.position(), 3);
        assert_eq!(r.remaining(), 2);
    }

    #[test]
    fn push_limit_cannot_exceed_parent() {
        let mut r = WireReader::new(&[0; 4]);
        r.push_limit(2, 0).unwrap();
        assert!(matches!(
            r.push_limit(3, 0),
            Err(WireError::LengthOverrun { .. })
        ));
    }

    #[test]
    fn wire_type_seven_is_invalid() {
        let mut r = WireReader::new(&[0x0f]);
        assert!(matches!(
            r.read_tag(),
            Err(WireError::InvalidWireType { value: 7, .. })
        ));
    }

    #[test]
    fn field_number_zero_is_invalid() {
        let mut r = WireReader::new(&[0x00]);
        assert!(matches!(
            r.read_tag(),
            Err(WireError::InvalidFieldNumber { .. })
        ));
    }

    #[test]
    fn skip_nested_groups() {
        // Group 1 { group 2 { varint 3 = 1 } } then varint 4 = 7.
        let data = [0x0b, 0x13, 0x18, 0x01, 0x14, 0x0c, 0x20, 0x07];
        let mut r = WireReader::new(&data);
        let tag = r.read_tag().unwrap();
        r.skip_value(tag, 8).unwrap();
        let tag = r.read_tag().unwrap();
        assert_eq!(tag.number.get(), 4);
    }

    #[test]
    fn mismatched_end_group_is_rejected() {
        // START_GROUP 1 then END_GROUP 2.
        let mut r = WireReader::new(&[0x0b, 0x14]);
        let tag = r.read_tag().unwrap();
        assert!(matches!(
            r.skip_value(tag, 8),
            Err(WireError::GroupMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn unterminated_group_is_rejected() {
        let mut r = WireReader::new(&[0x0b, 0x08, 0x01]);
        let tag = r.read_tag().unwrap();
        assert!(matches!(
            r.skip_value(tag, 8),
            Err(WireError::UnterminatedGroup { number: 1, .. })
        ));
    }

    #[test]
    fn group_skip_depth_is_bounded() {
        let mut data = vec![0x0b; 10];
        data.extend(std::iter::repeat(0x0c).take(10));
        let mut r = WireReader::new(&data);
        let tag = r.read_tag().unwrap();
        assert!(matches!(
            r.skip_value(tag, 4),
            Err(WireError::NestingTooDeep { limit: 4 })
        ));
    }

    #[test]
    fn fast_key_peeks_tag_bytes_only() {
        let r = WireReader::new(&[0x08, 0x96, 0x01]);
        assert_eq!(r.peek_fast_key(), Some(0x08));
        let r = WireReader::new(&[0x82, 0x01, 0x00]);
        assert_eq!(r.peek_fast_key(), Some(0x0182));
        let r = WireReader::new(&[0x80, 0x80, 0x01]);
        assert_eq!(r.peek_fast_key(), None);
        let r = WireReader::new(&[]);
        assert_eq!(r.peek_fast_key(), None);
    }
}
