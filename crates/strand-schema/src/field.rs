//! Field descriptors: number, storage location, presence and type.

use strand_core::{EnumId, FieldNumber, TableId, Tag, WireType};

/// Size in bytes of an inline repeated-field header
/// (`data: Ptr`, `len: u32`, `capacity: u32`).
pub const ARRAY_HEADER_SIZE: u32 = 16;

/// Declared type of a field.
///
/// The discriminants follow the descriptor type numbering of the
/// interchange format's schema language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    /// 64-bit IEEE float, fixed64 on the wire.
    Double = 1,
    /// 32-bit IEEE float, fixed32 on the wire.
    Float = 2,
    /// Signed 64-bit varint.
    Int64 = 3,
    /// Unsigned 64-bit varint.
    UInt64 = 4,
    /// Signed 32-bit varint (negative values take 10 bytes).
    Int32 = 5,
    /// Unsigned 64-bit fixed-width.
    Fixed64 = 6,
    /// Unsigned 32-bit fixed-width.
    Fixed32 = 7,
    /// Boolean varint.
    Bool = 8,
    /// UTF-8 text, length-delimited.
    String = 9,
    /// Legacy group: a sub-message framed by START_GROUP/END_GROUP.
    Group = 10,
    /// Length-delimited sub-message.
    Message = 11,
    /// Opaque bytes, length-delimited.
    Bytes = 12,
    /// Unsigned 32-bit varint.
    UInt32 = 13,
    /// Enum value, 32-bit varint, validated against an enum table.
    Enum = 14,
    /// Signed 32-bit fixed-width.
    SFixed32 = 15,
    /// Signed 64-bit fixed-width.
    SFixed64 = 16,
    /// Signed 32-bit ZigZag varint.
    SInt32 = 17,
    /// Signed 64-bit ZigZag varint.
    SInt64 = 18,
}

impl FieldType {
    /// Wire type of a single (unpacked) value of this type.
    pub fn wire_type(self) -> WireType {
        match self {
            Self::Int32
            | Self::Int64
            | Self::UInt32
            | Self::UInt64
            | Self::SInt32
            | Self::SInt64
            | Self::Bool
            | Self::Enum => WireType::Varint,
            Self::Fixed64 | Self::SFixed64 | Self::Double => WireType::Fixed64,
            Self::Fixed32 | Self::SFixed32 | Self::Float => WireType::Fixed32,
            Self::String | Self::Bytes | Self::Message => WireType::LengthDelimited,
            Self::Group => WireType::StartGroup,
        }
    }

    /// How a single value is stored in message memory.
    pub fn rep(self) -> FieldRep {
        match self {
            Self::Bool => FieldRep::OneByte,
            Self::Int32
            | Self::UInt32
            | Self::SInt32
            | Self::Fixed32
            | Self::SFixed32
            | Self::Float
            | Self::Enum => FieldRep::FourByte,
            Self::Int64
            | Self::UInt64
            | Self::SInt64
            | Self::Fixed64
            | Self::SFixed64
            | Self::Double => FieldRep::EightByte,
            Self::String | Self::Bytes => FieldRep::StringView,
            Self::Message | Self::Group => FieldRep::Pointer,
        }
    }

    /// Whether repeated values of this type may use packed encoding.
    pub fn is_packable(self) -> bool {
        !matches!(
            self,
            Self::String | Self::Bytes | Self::Message | Self::Group
        )
    }

    /// Whether values of this type are sub-messages.
    pub fn is_message(self) -> bool {
        matches!(self, Self::Message | Self::Group)
    }
}

impl TryFrom<u8> for FieldType {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        Ok(match v {
            1 => Self::Double,
            2 => Self::Float,
            3 => Self::Int64,
            4 => Self::UInt64,
            5 => Self::Int32,
            6 => Self::Fixed64,
            7 => Self::Fixed32,
            8 => Self::Bool,
            9 => Self::String,
            10 => Self::Group,
            11 => Self::Message,
            12 => Self::Bytes,
            13 => Self::UInt32,
            14 => Self::Enum,
            15 => Self::SFixed32,
            16 => Self::SFixed64,
            17 => Self::SInt32,
            18 => Self::SInt64,
            other => return Err(other),
        })
    }
}

/// Storage representation of one value in message memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldRep {
    /// 1 byte (`bool`).
    OneByte,
    /// 4 bytes little-endian.
    FourByte,
    /// 8 bytes little-endian.
    EightByte,
    /// 16 bytes: data `Ptr`, `u32` length, 4 bytes padding.
    StringView,
    /// 8 bytes: a stored `Ptr` to a sub-message (null when absent).
    Pointer,
}

impl FieldRep {
    /// Bytes occupied by one value.
    pub fn size(self) -> u32 {
        match self {
            Self::OneByte => 1,
            Self::FourByte => 4,
            Self::EightByte | Self::Pointer => 8,
            Self::StringView => 16,
        }
    }

    /// Required alignment of one value.
    pub fn align(self) -> u32 {
        match self {
            Self::OneByte => 1,
            Self::FourByte => 4,
            Self::EightByte | Self::Pointer | Self::StringView => 8,
        }
    }
}

/// Cardinality of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldMode {
    /// At most one value.
    Scalar,
    /// Any number of values, kept in insertion order.
    Repeated {
        /// Whether the encoder emits the packed form. The decoder
        /// accepts both forms regardless.
        packed: bool,
    },
}

/// How "set" is distinguished from "default" for a singular field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Presence {
    /// No presence slot: the zero value means unset. Sub-messages use
    /// this too, with a null pointer meaning unset.
    Implicit,
    /// A bit in the message's has-bit area.
    HasBit(u16),
    /// Member of a oneof whose active field number is stored as a
    /// `u32` at `case_offset`.
    Oneof {
        /// Offset of the shared case slot.
        case_offset: u32,
    },
}

/// Reference from a field to another table in the same schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubRef {
    /// Scalar, string or bytes field.
    None,
    /// Sub-message or group table.
    Message(TableId),
    /// Enum validity table.
    Enum(EnumId),
}

/// Everything the codec needs to know about one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Wire identity.
    pub number: FieldNumber,
    /// Byte offset into the message's field storage.
    pub offset: u32,
    /// Presence tracking.
    pub presence: Presence,
    /// Declared type.
    pub field_type: FieldType,
    /// Singular or repeated.
    pub mode: FieldMode,
    /// Sub-message or enum table, if the type needs one.
    pub sub: SubRef,
    /// Whether the field is required (needs a has-bit).
    pub required: bool,
}

impl FieldDescriptor {
    /// A singular field with implicit presence and no sub-table.
    pub fn scalar(number: FieldNumber, offset: u32, field_type: FieldType) -> Self {
        Self {
            number,
            offset,
            presence: Presence::Implicit,
            field_type,
            mode: FieldMode::Scalar,
            sub: SubRef::None,
            required: false,
        }
    }

    /// An extension descriptor.
    ///
    /// Extensions live in their own storage slot, so the offset is 0
    /// and presence is the existence of the slot.
    pub fn extension(
        number: FieldNumber,
        field_type: FieldType,
        mode: FieldMode,
        sub: SubRef,
    ) -> Self {
        Self {
            number,
            offset: 0,
            presence: Presence::Implicit,
            field_type,
            mode,
            sub,
            required: false,
        }
    }

    /// Whether the field is repeated.
    pub fn is_repeated(&self) -> bool {
        matches!(self.mode, FieldMode::Repeated { .. })
    }

    /// Whether the encoder emits this field packed.
    pub fn is_packed(&self) -> bool {
        matches!(self.mode, FieldMode::Repeated { packed: true }) && self.field_type.is_packable()
    }

    /// Bytes this field occupies in message storage.
    pub fn storage_size(&self) -> u32 {
        if self.is_repeated() {
            ARRAY_HEADER_SIZE
        } else {
            self.field_type.rep().size()
        }
    }

    /// Alignment of this field's storage.
    pub fn storage_align(&self) -> u32 {
        if self.is_repeated() {
            8
        } else {
            self.field_type.rep().align()
        }
    }

    /// Size of one element (the value itself for singular fields).
    pub fn element_size(&self) -> u32 {
        self.field_type.rep().size()
    }

    /// The tag the encoder emits and the fast table keys on.
    pub fn tag(&self) -> Tag {
        let wire_type = if self.is_packed() {
            WireType::LengthDelimited
        } else {
            self.field_type.wire_type()
        };
        Tag::new(self.number, wire_type)
    }

    /// The oneof case slot, if this field belongs to a oneof.
    pub fn oneof_case(&self) -> Option<u32> {
        match self.presence {
            Presence::Oneof { case_offset } => Some(case_offset),
            _ => None,
        }
    }

    /// Whether a default-valued singular field is still emitted when set.
    pub fn has_explicit_presence(&self) -> bool {
        !matches!(self.presence, Presence::Implicit) || self.field_type.is_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: u32) -> FieldNumber {
        FieldNumber::new(n).unwrap()
    }

    #[test]
    fn type_codes_round_trip() {
        for code in 1..=18u8 {
            let ty = FieldType::try_from(code).unwrap();
            assert_eq!(ty as u8, code);
        }
        assert_eq!(FieldType::try_from(0), Err(0));
        assert_eq!(FieldType::try_from(19), Err(19));
    }

    #[test]
    fn wire_types_follow_type() {
        assert_eq!(FieldType::SInt32.wire_type(), WireType::Varint);
        assert_eq!(FieldType::Double.wire_type(), WireType::Fixed64);
        assert_eq!(FieldType::SFixed32.wire_type(), WireType::Fixed32);
        assert_eq!(FieldType::Bytes.wire_type(), WireType::LengthDelimited);
        assert_eq!(FieldType::Group.wire_type(), WireType::StartGroup);
    }

    #[test]
    fn repeated_storage_is_array_header() {
        let mut d = FieldDescriptor::scalar(num(1), 0, FieldType::Bool);
        assert_eq!(d.storage_size(), 1);
        d.mode = FieldMode::Repeated { packed: true };
        assert_eq!(d.storage_size(), ARRAY_HEADER_SIZE);
        assert_eq!(d.element_size(), 1);
    }

    #[test]
    fn packed_tag_is_length_delimited() {
        let mut d = FieldDescriptor::scalar(num(4), 0, FieldType::Int32);
        assert_eq!(d.tag().wire_type, WireType::Varint);
        d.mode = FieldMode::Repeated { packed: true };
        assert_eq!(d.tag().wire_type, WireType::LengthDelimited);
    }

    #[test]
    fn packed_flag_ignored_for_strings() {
        let mut d = FieldDescriptor::scalar(num(2), 0, FieldType::String);
        d.mode = FieldMode::Repeated { packed: true };
        assert!(!d.is_packed());
        assert_eq!(d.tag().wire_type, WireType::LengthDelimited);
    }

    #[test]
    fn message_fields_have_presence() {
        let d = FieldDescriptor::scalar(num(3), 0, FieldType::Message);
        assert!(d.has_explicit_presence());
        let d = FieldDescriptor::scalar(num(3), 0, FieldType::Int64);
        assert!(!d.has_explicit_presence());
    }
}
