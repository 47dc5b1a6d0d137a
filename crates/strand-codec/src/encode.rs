//! Two-pass wire encoder.
//!
//! The size pass walks the tree once and records every sub-message
//! length and packed payload length in visiting order. The write pass
//! walks the same tree in the same order and consumes those lengths,
//! so no length prefix is ever back-patched.

use strand_arena::{Arena, Ptr};
use strand_core::{varint_len, FieldNumber, Tag, WireReader, WireType};
use strand_schema::{FieldDescriptor, FieldType, Schema};

use crate::config::EncodeOptions;
use crate::error::EncodeError;
use crate::extension;
use crate::message::{self, sub_table, MessageRef};
use crate::repeated;
use crate::required;
use crate::scalar;

/// Reusable encoder bound to a schema and options.
#[derive(Clone, Debug)]
pub struct Encoder<'s> {
    schema: &'s Schema,
    options: EncodeOptions,
}

impl<'s> Encoder<'s> {
    /// An encoder with default options.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            options: EncodeOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// The active options.
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Exact encoded size of `msg`.
    ///
    /// # Errors
    ///
    /// [`EncodeError::DepthExceeded`], [`EncodeError::MissingRequired`]
    /// (when checking) or [`EncodeError::Options`].
    ///
    /// # Panics
    ///
    /// Panics if `msg` does not belong to this schema and arena.
    pub fn encoded_len(&self, msg: MessageRef, arena: &Arena) -> Result<usize, EncodeError> {
        self.size(msg, arena).map(|sizes| sizes[0])
    }

    /// Encode `msg` into a new buffer.
    ///
    /// # Errors
    ///
    /// See [`encode_to`](Self::encode_to).
    pub fn encode(&self, msg: MessageRef, arena: &Arena) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_to(msg, arena, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of `msg` to `out`, returning the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// [`EncodeError::OutOfMemory`] if `out` cannot grow, plus the
    /// errors of [`encoded_len`](Self::encoded_len). `out` is left
    /// unchanged on error.
    ///
    /// # Panics
    ///
    /// Panics if `msg` does not belong to this schema and arena.
    pub fn encode_to(
        &self,
        msg: MessageRef,
        arena: &Arena,
        out: &mut Vec<u8>,
    ) -> Result<usize, EncodeError> {
        let sizes = self.size(msg, arena)?;
        let total = sizes[0];
        out.try_reserve(total)
            .map_err(|_| EncodeError::OutOfMemory { requested: total })?;
        let start = out.len();
        let mut writer = Writer {
            schema: self.schema,
            arena,
            options: &self.options,
            sizes: &sizes,
            next: 0,
            out: &mut *out,
        };
        writer.message(msg);
        debug_assert_eq!(writer.next, sizes.len());
        let written = out.len() - start;
        debug_assert_eq!(written, total);
        Ok(written)
    }

    /// Encode `msg` into a buffer allocated from `arena`.
    ///
    /// Returns the buffer and its length.
    ///
    /// # Errors
    ///
    /// As [`encode_to`](Self::encode_to); arena exhaustion is reported
    /// as [`EncodeError::OutOfMemory`].
    pub fn encode_in_arena(
        &self,
        msg: MessageRef,
        arena: &mut Arena,
    ) -> Result<(Ptr, usize), EncodeError> {
        let bytes = self.encode(msg, arena)?;
        let ptr = arena
            .alloc_copy(&bytes, 1)
            .map_err(|_| EncodeError::OutOfMemory {
                requested: bytes.len(),
            })?;
        Ok((ptr, bytes.len()))
    }

    fn size(&self, msg: MessageRef, arena: &Arena) -> Result<Vec<usize>, EncodeError> {
        msg.assert_valid(self.schema, arena);
        let result = self.try_size(msg, arena);
        if let Err(e) = &result {
            tracing::debug!(
                table = self.schema.table(msg.table()).name(),
                error = %e,
                "encode failed"
            );
        }
        result
    }

    fn try_size(&self, msg: MessageRef, arena: &Arena) -> Result<Vec<usize>, EncodeError> {
        self.options.validate()?;
        let mut sizer = Sizer {
            schema: self.schema,
            arena,
            options: &self.options,
            sizes: Vec::new(),
        };
        sizer.message(msg, 0)?;
        if self.options.check_required {
            required::check(self.schema, arena, msg, self.options.max_depth).map_err(|missing| {
                EncodeError::MissingRequired {
                    message: missing.message,
                    field: missing.field,
                }
            })?;
        }
        Ok(sizer.sizes)
    }
}

/// Encode `msg` with `options`.
///
/// # Errors
///
/// See [`Encoder::encode_to`].
pub fn encode(
    schema: &Schema,
    msg: MessageRef,
    arena: &Arena,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    Encoder::new(schema)
        .with_options(options.clone())
        .encode(msg, arena)
}

/// One unit of output for a message.
#[derive(Clone, Copy)]
enum Item<'a> {
    Field(&'a FieldDescriptor),
    /// An extension entry.
    Extension(Ptr),
    /// Retained unknown bytes (one record, or the whole buffer).
    Unknown(&'a [u8]),
}

/// What a message emits, in output order.
fn plan<'a>(
    schema: &'a Schema,
    arena: &'a Arena,
    options: &EncodeOptions,
    msg: MessageRef,
) -> Vec<Item<'a>> {
    let table = schema.table(msg.table());
    let mut items: Vec<(u32, u8, Item<'a>)> = table
        .fields()
        .iter()
        .filter(|field| {
            message::is_present(arena, msg, field)
                || (!options.skip_defaults && writes_default(field))
        })
        .map(|field| (field.number.get(), 0, Item::Field(field)))
        .collect();
    for entry in extension::entries(arena, msg) {
        let desc = extension::descriptor(arena, entry);
        if desc.is_repeated() && repeated::len(arena, extension::slot(entry)) == 0 {
            continue;
        }
        items.push((desc.number.get(), 1, Item::Extension(entry)));
    }
    let unknown = repeated::bytes(arena, msg.unknown_slot());
    if !options.skip_unknown && !unknown.is_empty() {
        match options.deterministic.then(|| split_unknown(unknown)).flatten() {
            Some(records) => {
                items.extend(records.into_iter().map(|(n, r)| (n, 2, Item::Unknown(r))));
            }
            None => items.push((u32::MAX, 2, Item::Unknown(unknown))),
        }
    }
    if options.deterministic {
        items.sort_by_key(|&(number, rank, _)| (number, rank));
    }
    items.into_iter().map(|(_, _, item)| item).collect()
}

/// Singular implicit-presence fields other than sub-messages: these
/// have a value to write even when nothing was set.
fn writes_default(field: &FieldDescriptor) -> bool {
    !field.is_repeated() && !field.has_explicit_presence()
}

/// Split retained unknown bytes into `(number, record)` pairs.
fn split_unknown(bytes: &[u8]) -> Option<Vec<(u32, &[u8])>> {
    let mut r = WireReader::new(bytes);
    let mut records = Vec::new();
    while !r.is_at_limit() {
        let start = r.position();
        let tag = r.read_tag().ok()?;
        r.skip_value(tag, u32::MAX).ok()?;
        records.push((tag.number.get(), &bytes[start..r.position()]));
    }
    Some(records)
}

/// Storage location and descriptor for an item.
fn resolve(arena: &Arena, msg: MessageRef, item: Item<'_>) -> Option<(FieldDescriptor, Ptr)> {
    match item {
        Item::Field(field) => Some((field.clone(), msg.field_ptr(field))),
        Item::Extension(entry) => Some((
            extension::descriptor(arena, entry),
            extension::slot(entry),
        )),
        Item::Unknown(_) => None,
    }
}

fn tag_len(number: FieldNumber, wire_type: WireType) -> usize {
    Tag::new(number, wire_type).encoded_len()
}

fn is_group(ft: FieldType) -> bool {
    ft == FieldType::Group
}

struct Sizer<'e> {
    schema: &'e Schema,
    arena: &'e Arena,
    options: &'e EncodeOptions,
    sizes: Vec<usize>,
}

impl Sizer<'_> {
    fn message(&mut self, msg: MessageRef, depth: u32) -> Result<usize, EncodeError> {
        if depth > self.options.max_depth {
            return Err(EncodeError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        let index = self.sizes.len();
        self.sizes.push(0);
        let mut total = 0;
        for item in plan(self.schema, self.arena, self.options, msg) {
            total += match resolve(self.arena, msg, item) {
                Some((field, slot)) => self.field(&field, slot, depth)?,
                None => match item {
                    Item::Unknown(bytes) => bytes.len(),
                    _ => 0,
                },
            };
        }
        self.sizes[index] = total;
        Ok(total)
    }

    fn child(
        &mut self,
        ptr: Ptr,
        field: &FieldDescriptor,
        depth: u32,
    ) -> Result<usize, EncodeError> {
        if ptr.is_null() {
            self.sizes.push(0);
            return Ok(0);
        }
        self.message(MessageRef::from_parts(ptr, sub_table(field)), depth + 1)
    }

    /// Size of one sub-message occurrence including its framing.
    fn framed_child(
        &mut self,
        ptr: Ptr,
        field: &FieldDescriptor,
        depth: u32,
    ) -> Result<usize, EncodeError> {
        let ft = field.field_type;
        let body = self.child(ptr, field, depth)?;
        Ok(if is_group(ft) {
            2 * tag_len(field.number, WireType::StartGroup) + body
        } else {
            tag_len(field.number, WireType::LengthDelimited) + varint_len(body as u64) + body
        })
    }

    fn field(
        &mut self,
        field: &FieldDescriptor,
        slot: Ptr,
        depth: u32,
    ) -> Result<usize, EncodeError> {
        let arena = self.arena;
        let ft = field.field_type;
        if !field.is_repeated() {
            return match ft {
                FieldType::Message | FieldType::Group => {
                    self.framed_child(arena.read_ptr(slot), field, depth)
                }
                FieldType::String | FieldType::Bytes => {
                    let len = message::read_view(arena, slot).len();
                    Ok(field.tag().encoded_len() + varint_len(len as u64) + len)
                }
                _ => {
                    let raw = message::read_raw(arena, slot, ft.rep());
                    Ok(field.tag().encoded_len() + scalar::value_len(ft, raw))
                }
            };
        }

        let count = repeated::len(arena, slot);
        let size = field.element_size();
        let element = |i| repeated::element(arena, slot, size, i);
        match ft {
            FieldType::Message | FieldType::Group => {
                let mut total = 0;
                for i in 0..count {
                    total += self.framed_child(arena.read_ptr(element(i)), field, depth)?;
                }
                Ok(total)
            }
            FieldType::String | FieldType::Bytes => {
                let tag = field.tag().encoded_len();
                Ok((0..count)
                    .map(|i| {
                        let len = message::read_view(arena, element(i)).len();
                        tag + varint_len(len as u64) + len
                    })
                    .sum())
            }
            _ => {
                let payload: usize = (0..count)
                    .map(|i| scalar::value_len(ft, message::read_raw(arena, element(i), ft.rep())))
                    .sum();
                if field.is_packed() {
                    self.sizes.push(payload);
                    Ok(field.tag().encoded_len() + varint_len(payload as u64) + payload)
                } else {
                    Ok(count * field.tag().encoded_len() + payload)
                }
            }
        }
    }
}

struct Writer<'e> {
    schema: &'e Schema,
    arena: &'e Arena,
    options: &'e EncodeOptions,
    sizes: &'e [usize],
    next: usize,
    out: &'e mut Vec<u8>,
}

impl Writer<'_> {
    fn take(&mut self) -> usize {
        let size = self.sizes[self.next];
        self.next += 1;
        size
    }

    fn message(&mut self, msg: MessageRef) {
        self.take();
        for item in plan(self.schema, self.arena, self.options, msg) {
            match resolve(self.arena, msg, item) {
                Some((field, slot)) => self.field(&field, slot),
                None => {
                    if let Item::Unknown(bytes) = item {
                        self.out.extend_from_slice(bytes);
                    }
                }
            }
        }
    }

    fn child(&mut self, ptr: Ptr, field: &FieldDescriptor) {
        let number = field.number;
        if is_group(field.field_type) {
            Tag::new(number, WireType::StartGroup).encode(self.out);
        } else {
            Tag::new(number, WireType::LengthDelimited).encode(self.out);
            let len = self.sizes[self.next];
            strand_core::encode_varint(len as u64, self.out);
        }
        if ptr.is_null() {
            self.take();
        } else {
            self.message(MessageRef::from_parts(ptr, sub_table(field)));
        }
        if is_group(field.field_type) {
            Tag::new(number, WireType::EndGroup).encode(self.out);
        }
    }

    fn bytes(&mut self, field: &FieldDescriptor, data: &[u8]) {
        field.tag().encode(self.out);
        strand_core::encode_varint(data.len() as u64, self.out);
        self.out.extend_from_slice(data);
    }

    fn field(&mut self, field: &FieldDescriptor, slot: Ptr) {
        let arena = self.arena;
        let ft = field.field_type;
        if !field.is_repeated() {
            match ft {
                FieldType::Message | FieldType::Group => self.child(arena.read_ptr(slot), field),
                FieldType::String | FieldType::Bytes => {
                    self.bytes(field, message::read_view(arena, slot));
                }
                _ => {
                    field.tag().encode(self.out);
                    scalar::write_value(self.out, ft, message::read_raw(arena, slot, ft.rep()));
                }
            }
            return;
        }

        let count = repeated::len(arena, slot);
        let size = field.element_size();
        let element = |i| repeated::element(arena, slot, size, i);
        match ft {
            FieldType::Message | FieldType::Group => {
                for i in 0..count {
                    self.child(arena.read_ptr(element(i)), field);
                }
            }
            FieldType::String | FieldType::Bytes => {
                for i in 0..count {
                    self.bytes(field, message::read_view(arena, element(i)));
                }
            }
            _ if field.is_packed() => {
                field.tag().encode(self.out);
                let payload = self.take();
                strand_core::encode_varint(payload as u64, self.out);
                for i in 0..count {
                    let raw = message::read_raw(arena, element(i), ft.rep());
                    scalar::write_value(self.out, ft, raw);
                }
            }
            _ => {
                for i in 0..count {
                    field.tag().encode(self.out);
                    let raw = message::read_raw(arena, element(i), ft.rep());
                    scalar::write_value(self.out, ft, raw);
                }
            }
        }
    }
}
