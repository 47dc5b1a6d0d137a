//! Typed field values.

use strand_schema::FieldType;

use crate::message::MessageRef;

/// One field value, tagged by storage kind.
///
/// Reads return the variant matching the field's declared type; writes
/// must pass that variant. String fields also accept [`Value::Bytes`],
/// and a string field whose stored bytes are not UTF-8 (possible only
/// when decoding with `validate_utf8` off) reads back as `Bytes`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    /// `bool`.
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32`.
    I32(i32),
    /// `int64`, `sint64`, `sfixed64`.
    I64(i64),
    /// `uint32`, `fixed32`.
    U32(u32),
    /// `uint64`, `fixed64`.
    U64(u64),
    /// `float`.
    F32(f32),
    /// `double`.
    F64(f64),
    /// Enum number.
    Enum(i32),
    /// UTF-8 text.
    Str(&'a str),
    /// Opaque bytes.
    Bytes(&'a [u8]),
    /// Sub-message or group.
    Message(MessageRef),
}

impl<'a> Value<'a> {
    /// Interpret stored raw bits as a scalar of type `ft`.
    ///
    /// # Panics
    ///
    /// Panics for string, bytes, message and group types.
    pub(crate) fn from_raw(ft: FieldType, raw: u64) -> Value<'static> {
        match ft {
            FieldType::Bool => Value::Bool(raw != 0),
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
                Value::I32(raw as u32 as i32)
            }
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => Value::I64(raw as i64),
            FieldType::UInt32 | FieldType::Fixed32 => Value::U32(raw as u32),
            FieldType::UInt64 | FieldType::Fixed64 => Value::U64(raw),
            FieldType::Float => Value::F32(f32::from_bits(raw as u32)),
            FieldType::Double => Value::F64(f64::from_bits(raw)),
            FieldType::Enum => Value::Enum(raw as u32 as i32),
            FieldType::String | FieldType::Bytes | FieldType::Message | FieldType::Group => {
                panic!("{ft:?} has no scalar representation")
            }
        }
    }

    /// Raw bits for storing this value in a scalar field of type `ft`,
    /// or `None` if the variant does not match.
    pub(crate) fn to_raw(self, ft: FieldType) -> Option<u64> {
        Some(match (ft, self) {
            (FieldType::Bool, Value::Bool(b)) => u64::from(b),
            (FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32, Value::I32(v)) => {
                u64::from(v as u32)
            }
            (FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64, Value::I64(v)) => v as u64,
            (FieldType::UInt32 | FieldType::Fixed32, Value::U32(v)) => u64::from(v),
            (FieldType::UInt64 | FieldType::Fixed64, Value::U64(v)) => v,
            (FieldType::Float, Value::F32(v)) => u64::from(v.to_bits()),
            (FieldType::Double, Value::F64(v)) => v.to_bits(),
            (FieldType::Enum, Value::Enum(v)) => u64::from(v as u32),
            _ => return None,
        })
    }

    /// Bytes of a `Str` or `Bytes` value.
    pub(crate) fn as_raw_bytes(self) -> Option<&'a [u8]> {
        match self {
            Value::Str(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Short name of the variant, for panic messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Enum(_) => "enum",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Message(_) => "message",
        }
    }

    /// The `bool`, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// The `i32`, if this is an `I32` or `Enum`.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::I32(v) | Value::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// The `i64`, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    /// The `u32`, if this is one.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U32(v) => Some(v),
            _ => None,
        }
    }

    /// The `u64`, if this is one.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U64(v) => Some(v),
            _ => None,
        }
    }

    /// The `f32`, if this is one.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::F32(v) => Some(v),
            _ => None,
        }
    }

    /// The `f64`, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// The text, if this is a `Str`.
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The bytes, if this is `Bytes` or `Str`.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        self.as_raw_bytes()
    }

    /// The sub-message, if this is one.
    pub fn as_message(&self) -> Option<MessageRef> {
        match *self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip_per_type() {
        let cases = [
            (FieldType::Int32, Value::I32(-7)),
            (FieldType::SInt64, Value::I64(i64::MIN)),
            (FieldType::Fixed32, Value::U32(u32::MAX)),
            (FieldType::UInt64, Value::U64(1 << 60)),
            (FieldType::Float, Value::F32(-0.5)),
            (FieldType::Double, Value::F64(1e300)),
            (FieldType::Bool, Value::Bool(true)),
            (FieldType::Enum, Value::Enum(-1)),
        ];
        for (ft, v) in cases {
            let raw = v.to_raw(ft).unwrap();
            assert_eq!(Value::from_raw(ft, raw), v, "{ft:?}");
        }
    }

    #[test]
    fn kind_mismatch_is_none() {
        assert_eq!(Value::I64(1).to_raw(FieldType::Int32), None);
        assert_eq!(Value::Str("x").to_raw(FieldType::Bytes), None);
        assert_eq!(Value::I32(1).to_raw(FieldType::Enum), None);
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Enum(3).as_i32(), Some(3));
        assert_eq!(Value::Str("hi").as_bytes(), Some(&b"hi"[..]));
        assert_eq!(Value::Bytes(b"x").as_str(), None);
        assert_eq!(Value::Bool(true).kind(), "bool");
    }
}
