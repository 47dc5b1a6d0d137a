//! Field-level comparison of two message trees.
//!
//! Two messages are equal when every field has the same presence and
//! value, repeated fields have the same elements in the same order,
//! extensions match by number and value, and retained unknown bytes
//! are identical. Floats compare by bit pattern, so `NaN` equals
//! itself and `0.0` differs from `-0.0`. The messages may live in
//! different arenas.

use std::fmt;

use smallvec::SmallVec;
use strand_arena::{Arena, Ptr};
use strand_core::FieldNumber;
use strand_schema::{FieldDescriptor, Schema};

use crate::extension;
use crate::message::{self, MessageRef};
use crate::repeated;
use crate::value::Value;
use crate::view::{read_element, read_singular};

/// One step from a root message to a nested value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A regular field.
    Field(FieldNumber),
    /// An extension field.
    Extension(FieldNumber),
    /// An element of the repeated field named by the previous segment.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(n) => write!(f, ".{n}"),
            Self::Extension(n) => write!(f, ".({n})"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// How two messages differ at a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DivergenceKind {
    /// Set on one side only.
    Presence {
        /// Whether the left side is set.
        left: bool,
    },
    /// Both set, with different values.
    Value,
    /// Repeated fields of different lengths.
    Length {
        /// Left element count.
        left: usize,
        /// Right element count.
        right: usize,
    },
    /// Different retained unknown bytes.
    UnknownFields,
    /// Different sets of extension numbers.
    Extensions,
}

/// The first difference found between two messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Divergence {
    /// Where, starting from the root messages. Empty for differences
    /// in the roots' unknown fields or extension sets.
    pub path: SmallVec<[PathSegment; 8]>,
    /// What differs.
    pub kind: DivergenceKind,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        write!(f, ": {:?}", self.kind)
    }
}

/// Compare two messages of the same type.
///
/// Returns `None` if they are field-equal, otherwise the first
/// divergence in field-number order.
///
/// # Panics
///
/// Panics if the two messages have different types, or if either does
/// not resolve in its arena.
pub fn compare_messages(
    schema: &Schema,
    left: MessageRef,
    left_arena: &Arena,
    right: MessageRef,
    right_arena: &Arena,
) -> Option<Divergence> {
    assert_eq!(
        left.table(),
        right.table(),
        "cannot compare messages of different types"
    );
    left.assert_valid(schema, left_arena);
    right.assert_valid(schema, right_arena);
    let mut cmp = Comparer {
        schema,
        left: left_arena,
        right: right_arena,
        path: SmallVec::new(),
    };
    cmp.message(left, right).map(|kind| Divergence {
        path: cmp.path,
        kind,
    })
}

struct Comparer<'c> {
    schema: &'c Schema,
    left: &'c Arena,
    right: &'c Arena,
    path: SmallVec<[PathSegment; 8]>,
}

impl Comparer<'_> {
    /// On divergence the path is left pointing at it.
    fn message(&mut self, l: MessageRef, r: MessageRef) -> Option<DivergenceKind> {
        let table = self.schema.table(l.table());
        for field in table.fields() {
            self.path.push(PathSegment::Field(field.number));
            let lp = message::is_present(self.left, l, field);
            let rp = message::is_present(self.right, r, field);
            let kind = if field.is_repeated() {
                self.repeated(field, l.field_ptr(field), r.field_ptr(field))
            } else if lp != rp {
                Some(DivergenceKind::Presence { left: lp })
            } else if lp {
                self.singular(field, l.field_ptr(field), r.field_ptr(field))
            } else {
                None
            };
            if kind.is_some() {
                return kind;
            }
            self.path.pop();
        }

        let mut numbers: Vec<u32> = extension::entries(self.left, l)
            .map(|e| extension::number(self.left, e))
            .collect();
        let mut other: Vec<u32> = extension::entries(self.right, r)
            .map(|e| extension::number(self.right, e))
            .collect();
        numbers.sort_unstable();
        other.sort_unstable();
        if numbers != other {
            return Some(DivergenceKind::Extensions);
        }
        for number in numbers.into_iter().filter_map(FieldNumber::new) {
            let (Some(le), Some(re)) = (
                extension::find(self.left, l, number),
                extension::find(self.right, r, number),
            ) else {
                return Some(DivergenceKind::Extensions);
            };
            let desc = extension::descriptor(self.left, le);
            if extension::descriptor(self.right, re) != desc {
                return Some(DivergenceKind::Extensions);
            }
            self.path.push(PathSegment::Extension(number));
            let (ls, rs) = (extension::slot(le), extension::slot(re));
            let kind = if desc.is_repeated() {
                self.repeated(&desc, ls, rs)
            } else {
                self.singular(&desc, ls, rs)
            };
            if kind.is_some() {
                return kind;
            }
            self.path.pop();
        }

        let lu = repeated::bytes(self.left, l.unknown_slot());
        let ru = repeated::bytes(self.right, r.unknown_slot());
        (lu != ru).then_some(DivergenceKind::UnknownFields)
    }

    fn repeated(&mut self, field: &FieldDescriptor, ls: Ptr, rs: Ptr) -> Option<DivergenceKind> {
        let left = repeated::len(self.left, ls);
        let right = repeated::len(self.right, rs);
        if left != right {
            return Some(DivergenceKind::Length { left, right });
        }
        for i in 0..left {
            self.path.push(PathSegment::Index(i));
            let kind = self.values(
                Some(read_element(self.left, ls, field, i)),
                Some(read_element(self.right, rs, field, i)),
            );
            if kind.is_some() {
                return kind;
            }
            self.path.pop();
        }
        None
    }

    fn singular(&mut self, field: &FieldDescriptor, ls: Ptr, rs: Ptr) -> Option<DivergenceKind> {
        self.values(
            read_singular(self.left, ls, field),
            read_singular(self.right, rs, field),
        )
    }

    fn values(&mut self, l: Option<Value<'_>>, r: Option<Value<'_>>) -> Option<DivergenceKind> {
        let (l, r) = match (l, r) {
            (None, None) => return None,
            (Some(l), Some(r)) => (l, r),
            (l, _) => {
                return Some(DivergenceKind::Presence {
                    left: l.is_some(),
                })
            }
        };
        let same = match (l, r) {
            (Value::Message(lm), Value::Message(rm)) => return self.message(lm, rm),
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        };
        (!same).then_some(DivergenceKind::Value)
    }
}
