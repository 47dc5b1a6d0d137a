//! Benchmark workloads for the Strand serialization runtime.
//!
//! Provides deterministic message payloads over the shared fixture
//! schema:
//!
//! - [`person_payload`]: a `Person` with `n` phones, tags and scores
//! - [`tree_payload`]: a `Node` tree of a given depth and fan-out
//! - [`scalar_payload`]: every scalar type set to a non-default value

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strand_test_utils::fixtures::{node, person, phone};
use strand_test_utils::WireBuilder;

/// Wire bytes for a `Person` with `n` phones, `n` tags and `n` packed scores.
pub fn person_payload(n: usize) -> Vec<u8> {
    let mut b = WireBuilder::new()
        .string(person::NAME, "Benchmark Person")
        .varint(person::ID, 123_456);
    for i in 0..n {
        b = b.message(
            person::PHONES,
            WireBuilder::new()
                .string(phone::NUMBER, &format!("+1-555-{i:04}"))
                .varint(phone::KIND, (i % 3) as u64),
        );
    }
    for i in 0..n {
        b = b.string(person::TAGS, &format!("tag-{i}"));
    }
    let scores: Vec<u64> = (0..n as i64)
        .map(|i| ((i * 7919) << 1 ^ ((i * 7919) >> 63)) as u64)
        .collect();
    b.packed_varints(person::SCORES, &scores)
        .string(person::CONTACT_EMAIL, "bench@example.com")
        .build()
}

/// Wire bytes for a complete `Node` tree: each node has `fanout`
/// children down to `depth` levels.
pub fn tree_payload(depth: u32, fanout: usize) -> Vec<u8> {
    fn build(level: u32, depth: u32, fanout: usize) -> WireBuilder {
        let mut b = WireBuilder::new().varint(node::VALUE, u64::from(level) + 1);
        if level < depth {
            for _ in 0..fanout {
                b = b.message(node::CHILDREN, build(level + 1, depth, fanout));
            }
        }
        b
    }
    build(0, depth, fanout).build()
}

/// Wire bytes for `Scalars` with every field set.
pub fn scalar_payload() -> Vec<u8> {
    WireBuilder::new()
        .fixed64(1, 2.5f64.to_bits())
        .fixed32(2, 1.25f32.to_bits())
        .varint(3, (-3i64) as u64)
        .varint(4, 4)
        .int32(5, -5)
        .fixed64(6, 6)
        .fixed32(7, 7)
        .varint(8, 1)
        .varint(9, 9)
        .fixed32(10, (-10i32) as u32)
        .fixed64(11, (-11i64) as u64)
        .sint32(12, -12)
        .sint64(13, -13)
        .string(14, "fourteen")
        .bytes(15, &[15; 15])
        .build()
}
