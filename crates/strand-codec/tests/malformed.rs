//! Hostile and malformed input: every case must fail with a typed
//! error and never panic.

use proptest::prelude::*;
use strand_arena::{Arena, ArenaConfig, ArenaError};
use strand_codec::{
    compare_messages, DecodeError, DecodeOptions, Decoder, Encoder, MalformedReason,
};
use strand_core::WireType;
use strand_test_utils::fixtures::{self, node, person};
use strand_test_utils::WireBuilder;

fn reason(input: &[u8]) -> MalformedReason {
    let f = fixtures::standard();
    let mut arena = Arena::new();
    match Decoder::new(&f.schema).decode(input, f.person, &mut arena) {
        Err(DecodeError::Malformed { reason, .. }) => reason,
        other => panic!("expected malformed input, got {other:?}"),
    }
}

#[test]
fn truncated_values() {
    assert_eq!(reason(&[0x10]), MalformedReason::Truncated);
    assert_eq!(reason(&[0x10, 0x96]), MalformedReason::Truncated);
    assert_eq!(reason(&[0x09, 1, 2, 3]), MalformedReason::Truncated);
    assert_eq!(reason(&[0x80]), MalformedReason::Truncated);
}

#[test]
fn overlong_varint() {
    let mut input = vec![0x10];
    input.extend_from_slice(&[0xff; 10]);
    input.push(0x01);
    assert_eq!(reason(&input), MalformedReason::BadVarint);

    // Ten bytes whose last carries more than one bit.
    let mut input = vec![0x10];
    input.extend_from_slice(&[0xff; 9]);
    input.push(0x02);
    assert_eq!(reason(&input), MalformedReason::BadVarint);
}

#[test]
fn invalid_wire_types_and_numbers() {
    assert_eq!(reason(&[0x0e]), MalformedReason::BadWireType);
    assert_eq!(reason(&[0x0f]), MalformedReason::BadWireType);
    assert_eq!(reason(&[0x00, 0x01]), MalformedReason::BadFieldNumber);
    // Tag wider than 32 bits.
    assert_eq!(
        reason(&[0x80, 0x80, 0x80, 0x80, 0x10, 0x00]),
        MalformedReason::BadFieldNumber
    );
}

#[test]
fn length_prefix_overrun() {
    let input = WireBuilder::new()
        .tag(person::NAME, WireType::LengthDelimited)
        .raw(&[0x05, b'a', b'b'])
        .build();
    assert_eq!(reason(&input), MalformedReason::LengthOverrun);

    // A sub-message length that runs past its parent's region.
    let input = WireBuilder::new()
        .tag(person::PHONES, WireType::LengthDelimited)
        .raw(&[0x02, 0x0a, 0x05])
        .build();
    assert_eq!(reason(&input), MalformedReason::LengthOverrun);
}

#[test]
fn mismatched_groups() {
    let unknown_mismatch = WireBuilder::new()
        .tag(60, WireType::StartGroup)
        .tag(61, WireType::EndGroup)
        .build();
    assert_eq!(reason(&unknown_mismatch), MalformedReason::BadGroupNesting);

    let unterminated = WireBuilder::new()
        .tag(60, WireType::StartGroup)
        .varint(1, 1)
        .build();
    assert_eq!(reason(&unterminated), MalformedReason::BadGroupNesting);

    let stray_end = WireBuilder::new().tag(60, WireType::EndGroup).build();
    assert_eq!(reason(&stray_end), MalformedReason::BadGroupNesting);
}

#[test]
fn invalid_utf8_offset_points_at_payload() {
    let f = fixtures::standard();
    let input = WireBuilder::new()
        .varint(person::ID, 1)
        .bytes(person::NAME, &[b'o', b'k', 0xc3])
        .build();
    let mut arena = Arena::new();
    let err = Decoder::new(&f.schema)
        .decode(&input, f.person, &mut arena)
        .unwrap_err();
    assert_eq!(
        err,
        DecodeError::Malformed {
            offset: 4,
            reason: MalformedReason::InvalidUtf8
        }
    );
}

fn nested(depth: usize) -> Vec<u8> {
    let mut bytes = WireBuilder::new().varint(node::VALUE, 1);
    for _ in 0..depth {
        bytes = WireBuilder::new().message(node::NEXT, bytes);
    }
    bytes.build()
}

#[test]
fn thousand_deep_nesting_hits_default_limit() {
    let f = fixtures::standard();
    let mut arena = Arena::new();
    let err = Decoder::new(&f.schema)
        .decode(&nested(1000), f.node, &mut arena)
        .unwrap_err();
    assert_eq!(err, DecodeError::DepthExceeded { limit: 100 });
}

#[test]
fn nesting_at_the_limit_is_accepted() {
    let f = fixtures::standard();
    let mut arena = Arena::new();
    let decoder = Decoder::new(&f.schema);
    assert!(decoder.decode(&nested(100), f.node, &mut arena).is_ok());
    assert!(decoder.decode(&nested(101), f.node, &mut arena).is_err());
}

#[test]
fn deep_unknown_groups_hit_limit() {
    let f = fixtures::standard();
    let mut inner = WireBuilder::new();
    for _ in 0..1000 {
        inner = WireBuilder::new().group(60, inner);
    }
    let mut arena = Arena::new();
    let err = Decoder::new(&f.schema)
        .decode(inner.as_slice(), f.person, &mut arena)
        .unwrap_err();
    assert_eq!(err, DecodeError::DepthExceeded { limit: 100 });
}

#[test]
fn invalid_options_rejected() {
    let f = fixtures::standard();
    let mut arena = Arena::new();
    let err = Decoder::new(&f.schema)
        .with_options(DecodeOptions::default().with_max_depth(0))
        .decode(&[], f.person, &mut arena)
        .unwrap_err();
    assert!(matches!(err, DecodeError::Options(_)));
}

#[test]
fn arena_ceiling_reports_out_of_memory() {
    let f = fixtures::standard();
    let big = "x".repeat(64 * 1024);
    let input = WireBuilder::new().string(person::NAME, &big).build();
    let mut arena = Arena::with_config(ArenaConfig::with_max_bytes(16 * 1024)).unwrap();
    let err = Decoder::new(&f.schema)
        .decode(&input, f.person, &mut arena)
        .unwrap_err();
    assert!(matches!(err, DecodeError::OutOfMemory { .. }));
}

#[test]
fn decode_into_stale_message_is_an_error() {
    let f = fixtures::standard();
    let mut arena = Arena::new();
    let decoder = Decoder::new(&f.schema);
    let m = decoder.decode(&[], f.person, &mut arena).unwrap();
    arena.reset();
    let err = decoder.decode_into(&[], m, &mut arena).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Arena(ArenaError::StaleHandle { .. })
    ));
}

mod proptests {
    use super::*;

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let f = fixtures::standard();
            for table in [f.person, f.node, f.scalars] {
                let mut arena = Arena::new();
                let decoder = Decoder::new(&f.schema);
                if let Ok(m) = decoder.decode(&input, table, &mut arena) {
                    let bytes = Encoder::new(&f.schema).encode(m, &arena).unwrap();
                    let mut other = Arena::new();
                    let again = decoder.decode(&bytes, table, &mut other).unwrap();
                    prop_assert_eq!(compare_messages(&f.schema, m, &arena, again, &other), None);
                }
            }
        }

        #[test]
        fn truncating_valid_input_never_panics(cut in 0usize..64) {
            let f = fixtures::standard();
            let input = WireBuilder::new()
                .string(person::NAME, "someone")
                .varint(person::ID, 300)
                .message(person::PHONES, WireBuilder::new().string(1, "555"))
                .packed_varints(person::SCORES, &[1, 2, 3])
                .build();
            let cut = cut.min(input.len());
            let mut arena = Arena::new();
            let _ = Decoder::new(&f.schema).decode(&input[..cut], f.person, &mut arena);
        }
    }
}
