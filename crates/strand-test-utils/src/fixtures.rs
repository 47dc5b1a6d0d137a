//! Fixture schemas shared by codec tests and benches.
//!
//! - `Scalars`: one implicit-presence field per scalar type, 1..=15.
//! - `Person`/`Phone`: strings, optionals, repeated messages, packed
//!   and closed-enum fields, a oneof.
//! - `Node`: self-recursive through a message, a repeated message and
//!   a group.
//! - `Host`: extendable, with extensions registered by [`registry`].
//! - `Strict`: a required field.

use strand_core::{EnumId, FieldNumber, TableId};
use strand_schema::{
    EnumTable, ExtensionRegistry, FieldDescriptor, FieldMode, FieldType, Label, MessageLayout,
    Schema, SchemaBuilder, SubRef,
};

/// Scalar types in `Scalars` field order (field `n` has type `n - 1`).
pub const SCALAR_TYPES: [FieldType; 15] = [
    FieldType::Double,
    FieldType::Float,
    FieldType::Int64,
    FieldType::UInt64,
    FieldType::Int32,
    FieldType::Fixed64,
    FieldType::Fixed32,
    FieldType::Bool,
    FieldType::UInt32,
    FieldType::SFixed32,
    FieldType::SFixed64,
    FieldType::SInt32,
    FieldType::SInt64,
    FieldType::String,
    FieldType::Bytes,
];

/// `Person` field numbers.
pub mod person {
    pub const NAME: u32 = 1;
    pub const ID: u32 = 2;
    pub const EMAIL: u32 = 3;
    pub const PHONES: u32 = 4;
    pub const TAGS: u32 = 5;
    pub const SCORES: u32 = 6;
    pub const KIND: u32 = 7;
    pub const CONTACT_EMAIL: u32 = 8;
    pub const CONTACT_PHONE: u32 = 9;
    pub const KINDS: u32 = 10;
    pub const LUCKY: u32 = 11;
}

/// `Phone` field numbers.
pub mod phone {
    pub const NUMBER: u32 = 1;
    pub const KIND: u32 = 2;
}

/// `Node` field numbers.
pub mod node {
    pub const VALUE: u32 = 1;
    pub const CHILDREN: u32 = 2;
    pub const NEXT: u32 = 3;
    pub const LEGACY: u32 = 4;
}

/// Extension numbers on `Host`.
pub mod host {
    pub const ID: u32 = 1;
    pub const EXT_INT: u32 = 100;
    pub const EXT_PACKED: u32 = 101;
    pub const EXT_PHONE: u32 = 102;
    pub const EXT_NAME: u32 = 103;
}

/// A built schema and the ids of its tables.
pub struct Fixtures {
    pub schema: Schema,
    pub scalars: TableId,
    pub person: TableId,
    pub phone: TableId,
    pub node: TableId,
    pub host: TableId,
    pub strict: TableId,
    /// Closed enum with values 0, 1, 2.
    pub kind: EnumId,
}

/// Build the fixture schema.
///
/// # Panics
///
/// Panics if a fixture layout is rejected, which means the schema
/// crate changed under the tests.
pub fn standard() -> Fixtures {
    let mut b = SchemaBuilder::new();
    let kind = b.add_enum(EnumTable::closed("Kind", [0, 1, 2]));

    let mut scalars = MessageLayout::new("Scalars");
    for (i, ft) in SCALAR_TYPES.iter().enumerate() {
        scalars = scalars.field(i as u32 + 1, *ft);
    }
    let scalars = b.add(scalars).expect("Scalars layout");

    let phone = b
        .add(
            MessageLayout::new("Phone")
                .field(phone::NUMBER, FieldType::String)
                .enumeration(phone::KIND, kind, Label::Optional),
        )
        .expect("Phone layout");

    let person = b
        .add(
            MessageLayout::new("Person")
                .field(person::NAME, FieldType::String)
                .field(person::ID, FieldType::Int32)
                .optional(person::EMAIL, FieldType::String)
                .repeated_message(person::PHONES, phone)
                .repeated(person::TAGS, FieldType::String)
                .packed(person::SCORES, FieldType::SInt64)
                .enumeration(person::KIND, kind, Label::Implicit)
                .oneof([
                    (person::CONTACT_EMAIL, FieldType::String, SubRef::None),
                    (person::CONTACT_PHONE, FieldType::Message, SubRef::Message(phone)),
                ])
                .enumeration(person::KINDS, kind, Label::Packed)
                .repeated(person::LUCKY, FieldType::Int32),
        )
        .expect("Person layout");

    let node = b.declare("Node");
    b.define(
        node,
        MessageLayout::new("Node")
            .field(node::VALUE, FieldType::Int32)
            .repeated_message(node::CHILDREN, node)
            .message(node::NEXT, node)
            .group(node::LEGACY, node),
    )
    .expect("Node layout");

    let host = b
        .add(
            MessageLayout::new("Host")
                .field(host::ID, FieldType::Int32)
                .extendable(),
        )
        .expect("Host layout");

    let strict = b
        .add(
            MessageLayout::new("Strict")
                .required(1, FieldType::Int32)
                .optional(2, FieldType::String),
        )
        .expect("Strict layout");

    Fixtures {
        schema: b.build().expect("fixture schema"),
        scalars,
        person,
        phone,
        node,
        host,
        strict,
        kind,
    }
}

/// Extensions of `Host`: an int32, a packed fixed32, a `Phone` message
/// and a string.
///
/// # Panics
///
/// Panics if the registry rejects a fixture extension.
pub fn registry(f: &Fixtures) -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new(&f.schema);
    let ext = |number: u32, ft, mode, sub| {
        let number = FieldNumber::new(number).expect("fixture extension number");
        FieldDescriptor::extension(number, ft, mode, sub)
    };
    let descriptors = [
        ext(host::EXT_INT, FieldType::Int32, FieldMode::Scalar, SubRef::None),
        ext(
            host::EXT_PACKED,
            FieldType::Fixed32,
            FieldMode::Repeated { packed: true },
            SubRef::None,
        ),
        ext(
            host::EXT_PHONE,
            FieldType::Message,
            FieldMode::Scalar,
            SubRef::Message(f.phone),
        ),
        ext(host::EXT_NAME, FieldType::String, FieldMode::Scalar, SubRef::None),
    ];
    for d in descriptors {
        registry
            .register(&f.schema, f.host, d)
            .expect("fixture extension");
    }
    registry
}
