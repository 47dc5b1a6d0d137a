//! Test utilities for Strand development.
//!
//! Provides a [`WireBuilder`] for writing wire bytes by hand, without
//! going through the encoder under test, and a set of fixture schemas
//! in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use strand_core::{encode_varint, encode_zigzag32, encode_zigzag64, FieldNumber, Tag, WireType};

pub use fixtures::Fixtures;

/// Hand-assembles wire-format bytes field by field.
///
/// Numbers are taken as plain `u32` so tests can also build invalid
/// input; [`tag`](Self::tag) writes whatever it is given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WireBuilder {
    buf: Vec<u8>,
}

impl WireBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw tag `(number << 3) | wire_type`.
    pub fn tag(mut self, number: u32, wire_type: WireType) -> Self {
        match FieldNumber::new(number) {
            Some(n) => Tag::new(n, wire_type).encode(&mut self.buf),
            None => encode_varint(u64::from(number) << 3 | wire_type as u64, &mut self.buf),
        }
        self
    }

    pub fn varint(self, number: u32, value: u64) -> Self {
        let mut b = self.tag(number, WireType::Varint);
        encode_varint(value, &mut b.buf);
        b
    }

    /// An int32 field, sign-extended the way the format requires.
    pub fn int32(self, number: u32, value: i32) -> Self {
        self.varint(number, i64::from(value) as u64)
    }

    pub fn sint32(self, number: u32, value: i32) -> Self {
        self.varint(number, u64::from(encode_zigzag32(value)))
    }

    pub fn sint64(self, number: u32, value: i64) -> Self {
        self.varint(number, encode_zigzag64(value))
    }

    pub fn fixed32(self, number: u32, value: u32) -> Self {
        let mut b = self.tag(number, WireType::Fixed32);
        b.buf.extend_from_slice(&value.to_le_bytes());
        b
    }

    pub fn fixed64(self, number: u32, value: u64) -> Self {
        let mut b = self.tag(number, WireType::Fixed64);
        b.buf.extend_from_slice(&value.to_le_bytes());
        b
    }

    pub fn bytes(self, number: u32, data: &[u8]) -> Self {
        let mut b = self.tag(number, WireType::LengthDelimited);
        encode_varint(data.len() as u64, &mut b.buf);
        b.buf.extend_from_slice(data);
        b
    }

    pub fn string(self, number: u32, s: &str) -> Self {
        self.bytes(number, s.as_bytes())
    }

    /// A length-delimited sub-message.
    pub fn message(self, number: u32, inner: WireBuilder) -> Self {
        self.bytes(number, &inner.buf)
    }

    /// A START_GROUP/END_GROUP pair around `inner`.
    pub fn group(self, number: u32, inner: WireBuilder) -> Self {
        let mut b = self.tag(number, WireType::StartGroup);
        b.buf.extend_from_slice(&inner.buf);
        b.tag(number, WireType::EndGroup)
    }

    /// Packed varints, already converted to their wire values.
    pub fn packed_varints(self, number: u32, values: &[u64]) -> Self {
        let mut payload = Vec::new();
        for &v in values {
            encode_varint(v, &mut payload);
        }
        self.bytes(number, &payload)
    }

    pub fn packed_fixed32(self, number: u32, values: &[u32]) -> Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.bytes(number, &payload)
    }

    /// Append arbitrary bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_reference_bytes() {
        assert_eq!(WireBuilder::new().varint(1, 150).build(), [0x08, 0x96, 0x01]);
        assert_eq!(
            WireBuilder::new().string(2, "testing").build(),
            b"\x12\x07testing"
        );
        assert_eq!(
            WireBuilder::new().group(1, WireBuilder::new().varint(2, 1)).build(),
            [0x0b, 0x10, 0x01, 0x0c]
        );
    }

    #[test]
    fn negative_int32_is_ten_bytes() {
        assert_eq!(WireBuilder::new().int32(1, -1).len(), 11);
    }

    #[test]
    fn field_zero_still_written() {
        assert_eq!(WireBuilder::new().varint(0, 1).build(), [0x00, 0x01]);
    }
}
