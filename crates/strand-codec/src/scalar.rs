//! Conversions between wire values and the raw bits stored in messages.
//!
//! Every scalar is held as up to 64 raw bits: integers in two's
//! complement, floats as IEEE bits, booleans as 0/1, 32-bit types
//! zero-extended. ZigZag and sign extension happen only at the wire
//! boundary.

use strand_core::{
    decode_zigzag32, decode_zigzag64, encode_varint, encode_zigzag32, encode_zigzag64, varint_len,
    WireError, WireReader, WireType,
};
use strand_schema::FieldType;

/// Raw bits for a varint of type `ft`.
pub(crate) fn varint_to_raw(ft: FieldType, v: u64) -> u64 {
    match ft {
        FieldType::Bool => u64::from(v != 0),
        FieldType::Int32 | FieldType::UInt32 | FieldType::Enum => u64::from(v as u32),
        FieldType::SInt32 => u64::from(decode_zigzag32(v as u32) as u32),
        FieldType::SInt64 => decode_zigzag64(v) as u64,
        _ => v,
    }
}

/// Varint to emit for raw bits of type `ft`.
pub(crate) fn raw_to_varint(ft: FieldType, raw: u64) -> u64 {
    match ft {
        // Negative 32-bit values are sign-extended to ten bytes.
        FieldType::Int32 | FieldType::Enum => i64::from(raw as u32 as i32) as u64,
        FieldType::UInt32 => u64::from(raw as u32),
        FieldType::SInt32 => u64::from(encode_zigzag32(raw as u32 as i32)),
        FieldType::SInt64 => encode_zigzag64(raw as i64),
        FieldType::Bool => u64::from(raw != 0),
        _ => raw,
    }
}

/// Read one scalar of type `ft` in its element wire form.
///
/// # Panics
///
/// Panics for string, bytes, message and group types.
pub(crate) fn read_raw(r: &mut WireReader<'_>, ft: FieldType) -> Result<u64, WireError> {
    match ft.wire_type() {
        WireType::Varint => Ok(varint_to_raw(ft, r.read_varint()?)),
        WireType::Fixed32 => r.read_fixed32().map(u64::from),
        WireType::Fixed64 => r.read_fixed64(),
        other => panic!("{ft:?} is not a scalar type (wire type {other})"),
    }
}

/// Encoded size of one scalar value, without tag.
pub(crate) fn value_len(ft: FieldType, raw: u64) -> usize {
    match ft.wire_type() {
        WireType::Fixed32 => 4,
        WireType::Fixed64 => 8,
        _ => varint_len(raw_to_varint(ft, raw)),
    }
}

/// Append one scalar value, without tag.
pub(crate) fn write_value(buf: &mut Vec<u8>, ft: FieldType, raw: u64) {
    match ft.wire_type() {
        WireType::Fixed32 => buf.extend_from_slice(&(raw as u32).to_le_bytes()),
        WireType::Fixed64 => buf.extend_from_slice(&raw.to_le_bytes()),
        _ => encode_varint(raw_to_varint(ft, raw), buf),
    }
}

/// Width of a fixed-size element, for pre-sizing packed arrays.
pub(crate) fn fixed_width(ft: FieldType) -> Option<usize> {
    match ft.wire_type() {
        WireType::Fixed32 => Some(4),
        WireType::Fixed64 => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_truncates_and_sign_extends() {
        let wire = (-1i64) as u64;
        let raw = varint_to_raw(FieldType::Int32, wire);
        assert_eq!(raw, 0xffff_ffff);
        assert_eq!(raw_to_varint(FieldType::Int32, raw), wire);
        assert_eq!(value_len(FieldType::Int32, raw), 10);
    }

    #[test]
    fn uint32_does_not_sign_extend() {
        assert_eq!(raw_to_varint(FieldType::UInt32, 0xffff_ffff), 0xffff_ffff);
        assert_eq!(value_len(FieldType::UInt32, 0xffff_ffff), 5);
    }

    #[test]
    fn zigzag_types() {
        let raw = varint_to_raw(FieldType::SInt32, 3);
        assert_eq!(raw as u32 as i32, -2);
        assert_eq!(raw_to_varint(FieldType::SInt32, raw), 3);
        let raw = varint_to_raw(FieldType::SInt64, 1);
        assert_eq!(raw as i64, -1);
        assert_eq!(raw_to_varint(FieldType::SInt64, raw), 1);
    }

    #[test]
    fn bool_normalizes() {
        assert_eq!(varint_to_raw(FieldType::Bool, 7), 1);
        assert_eq!(raw_to_varint(FieldType::Bool, 1), 1);
    }

    #[test]
    fn fixed_values_round_trip_through_reader() {
        let mut buf = Vec::new();
        write_value(&mut buf, FieldType::Float, u64::from(1.5f32.to_bits()));
        write_value(&mut buf, FieldType::SFixed64, (-9i64) as u64);
        assert_eq!(buf.len(), 12);
        let mut r = WireReader::new(&buf);
        assert_eq!(read_raw(&mut r, FieldType::Float).unwrap() as u32, 1.5f32.to_bits());
        assert_eq!(read_raw(&mut r, FieldType::SFixed64).unwrap() as i64, -9);
    }

    #[test]
    fn fixed_width_only_for_fixed_types() {
        assert_eq!(fixed_width(FieldType::Double), Some(8));
        assert_eq!(fixed_width(FieldType::Fixed32), Some(4));
        assert_eq!(fixed_width(FieldType::Int64), None);
    }
}
