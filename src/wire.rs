//! Schema-less wire-format decoding.
//!
//! Replay bodies are protobuf-style streams, but the schema is not published
//! and shifts between game patches. This module therefore reconstructs a
//! best-effort tree of tagged fields from raw bytes: every field keeps its
//! field number, and length-delimited payloads are classified heuristically
//! as nested messages, printable strings or opaque blobs.
//!
//! The load-bearing rule is the message-vs-string tie-break: a payload is
//! only accepted as a nested [`Message`][Leaf::Message] if the recursive
//! parse consumes *every* byte of it. Arbitrary text frequently parses as a
//! few valid fields followed by garbage, and requiring full consumption
//! rejects virtually all of those false positives.

use std::collections::BTreeMap;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde_json::{json, Map, Value};

/// Maximum recursion depth for nested message parsing.
///
/// Real replays nest a handful of levels; anything deeper is almost
/// certainly a blob that happens to look like a message.
pub const MAX_DEPTH: usize = 32;

/// Field numbers above this are treated as decoder garbage and terminate the
/// current message.
pub const MAX_FIELD_NUMBER: u64 = 50_000;

/// Scale divisor for fixed-point world coordinates (12-bit fraction).
pub const WORLD_SCALE: f64 = 4096.0;

/// The two-bit-plus encoding selector embedded in every wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

/// A single decoded field value.
///
/// Fixed-width values keep their raw bytes so that callers can pick the
/// integer or floating-point interpretation as needed.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// A base-128 unsigned integer.
    Varint(u64),
    /// A 32-bit fixed-width value (raw little-endian bytes).
    Fixed32([u8; 4]),
    /// A 64-bit fixed-width value (raw little-endian bytes).
    Fixed64([u8; 8]),
    /// A length-delimited payload that decoded as printable UTF-8.
    Str(String),
    /// A length-delimited payload that fully parsed as a nested message.
    Message(Tree),
    /// A length-delimited payload that is neither a message nor a string.
    Bytes(Vec<u8>),
    /// A start-group/end-group delimited subtree (rare).
    Group(Tree),
}

impl Leaf {
    /// The varint value, if this leaf is a varint.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Leaf::Varint(v) => Some(*v),
            _ => None,
        }
    }

    /// The string value, if this leaf is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Leaf::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The nested subtree, if this leaf is a message or group.
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Leaf::Message(t) | Leaf::Group(t) => Some(t),
            _ => None,
        }
    }

    /// The opaque payload, if this leaf is a byte blob.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Leaf::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The 32-bit value interpreted as a signed integer.
    pub fn fixed32_i32(&self) -> Option<i32> {
        match self {
            Leaf::Fixed32(raw) => Some(i32::from_le_bytes(*raw)),
            _ => None,
        }
    }

    /// The 32-bit value interpreted as a float.
    pub fn fixed32_f32(&self) -> Option<f32> {
        match self {
            Leaf::Fixed32(raw) => Some(f32::from_le_bytes(*raw)),
            _ => None,
        }
    }

    /// The 64-bit value interpreted as a signed integer.
    pub fn fixed64_i64(&self) -> Option<i64> {
        match self {
            Leaf::Fixed64(raw) => Some(i64::from_le_bytes(*raw)),
            _ => None,
        }
    }

    /// The 64-bit value interpreted as a double.
    pub fn fixed64_f64(&self) -> Option<f64> {
        match self {
            Leaf::Fixed64(raw) => Some(f64::from_le_bytes(*raw)),
            _ => None,
        }
    }
}

/// A decoded message: field numbers mapped to their values, in order.
///
/// A field number may occur more than once; repeated occurrences keep their
/// original order. Field numbers are normalized to integers at decode time,
/// so path navigation only ever deals with one key form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    fields: BTreeMap<u32, Vec<Leaf>>,
}

impl Tree {
    /// Whether no fields were decoded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the given field number is present.
    pub fn has(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    /// All values recorded for the given field number, oldest first.
    pub fn entries(&self, tag: u32) -> &[Leaf] {
        self.fields.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value recorded for the given field number.
    pub fn first(&self, tag: u32) -> Option<&Leaf> {
        self.fields.get(&tag).and_then(|leaves| leaves.first())
    }

    /// Iterate over `(field number, values)` pairs in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Leaf])> {
        self.fields.iter().map(|(tag, leaves)| (*tag, leaves.as_slice()))
    }

    /// Append a value under the given field number.
    pub fn push(&mut self, tag: u32, leaf: Leaf) {
        self.fields.entry(tag).or_default().push(leaf);
    }

    /// Resolve a path of field numbers to a terminal leaf.
    ///
    /// At every step the *first* value of the field is selected. Messages and
    /// groups are descended into; a scalar or string reached before the path
    /// is exhausted is returned as-is (the remaining path elements are
    /// ignored), matching how callers probe slightly different layouts across
    /// game patches.
    pub fn at(&self, path: &[u32]) -> Option<&Leaf> {
        let (&tag, rest) = path.split_first()?;
        let leaf = self.first(tag)?;
        if rest.is_empty() {
            return Some(leaf);
        }
        match leaf {
            Leaf::Message(sub) | Leaf::Group(sub) => sub.at(rest),
            other => Some(other),
        }
    }

    /// Resolve a path to a varint value.
    pub fn u64_at(&self, path: &[u32]) -> Option<u64> {
        self.at(path).and_then(Leaf::as_u64)
    }

    /// Resolve a path to a string value.
    pub fn str_at(&self, path: &[u32]) -> Option<&str> {
        self.at(path).and_then(Leaf::as_str)
    }

    /// Resolve a path to a nested subtree.
    pub fn tree_at(&self, path: &[u32]) -> Option<&Tree> {
        self.at(path).and_then(Leaf::as_tree)
    }
}

/// Decode an unsigned base-128 integer starting at `pos`.
///
/// Returns the value and the position of the first byte after it. Decoding
/// stops at the first byte with the high bit clear or at the end of the
/// slice; the shift never exceeds 63, so overlong encodings cannot overflow.
pub fn decode_varint(data: &[u8], mut pos: usize) -> (u64, usize) {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    while pos < data.len() {
        let byte = data[pos];
        if shift <= 63 {
            result |= u64::from(byte & 0x7f) << shift;
        }
        pos += 1;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    (result, pos)
}

/// Encode an unsigned integer as a base-128 varint.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out
}

/// Reinterpret an unsigned 64-bit value as signed (two's complement).
pub fn u64_to_i64(value: u64) -> i64 {
    value as i64
}

/// Convert a coordinate leaf to world units.
///
/// Positions arrive either as a raw 8-byte fixed64 or as an already-decoded
/// varint, depending on the record layout; both carry a signed fixed-point
/// value with a 12-bit fraction.
pub fn fixed_to_world(leaf: &Leaf) -> Option<f64> {
    match leaf {
        Leaf::Fixed64(raw) => Some(i64::from_le_bytes(*raw) as f64 / WORLD_SCALE),
        Leaf::Varint(value) => Some(u64_to_i64(*value) as f64 / WORLD_SCALE),
        _ => None,
    }
}

/// Decode a byte slice into a message tree.
///
/// This never fails at the top level: malformed input simply yields a tree
/// with however many fields decoded cleanly. `None` is only returned for an
/// input whose *first* field already fails to parse and which produced
/// nothing (callers treat that the same as an empty tree).
pub fn decode_tree(data: &[u8]) -> Option<Tree> {
    decode_at(data, 0, None).map(|(tree, _)| tree)
}

/// Recursive decoder.
///
/// `end_group` carries the field number whose end-group tag terminates this
/// scope. Returns the decoded tree and the number of bytes consumed, or
/// `None` when the depth cap is exceeded (the caller then degrades the
/// payload to bytes).
fn decode_at(data: &[u8], depth: usize, end_group: Option<u32>) -> Option<(Tree, usize)> {
    if depth > MAX_DEPTH {
        return None;
    }

    let mut tree = Tree::default();
    let mut pos = 0;
    let len = data.len();

    while pos < len {
        let tag_start = pos;
        let (tag, next) = decode_varint(data, pos);
        pos = next;
        if tag == 0 {
            break;
        }
        let field = tag >> 3;
        if field == 0 || field > MAX_FIELD_NUMBER {
            break;
        }
        let field = field as u32;
        let wire_type = match WireType::from_u64(tag & 0x7) {
            Some(w) => w,
            None => break,
        };

        match wire_type {
            WireType::EndGroup => {
                if end_group == Some(field) {
                    return Some((tree, pos));
                }
                // Stray end-group: rewind to the tag and stop this scope.
                return Some((tree, tag_start));
            }
            WireType::Varint => {
                let (value, next) = decode_varint(data, pos);
                pos = next;
                tree.push(field, Leaf::Varint(value));
            }
            WireType::Fixed64 => {
                if len - pos < 8 {
                    break;
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&data[pos..pos + 8]);
                pos += 8;
                tree.push(field, Leaf::Fixed64(raw));
            }
            WireType::Fixed32 => {
                if len - pos < 4 {
                    break;
                }
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&data[pos..pos + 4]);
                pos += 4;
                tree.push(field, Leaf::Fixed32(raw));
            }
            WireType::LengthDelimited => {
                let (sub_len, next) = decode_varint(data, pos);
                pos = next;
                if sub_len > (len - pos) as u64 {
                    break;
                }
                let sub_len = sub_len as usize;
                let payload = &data[pos..pos + sub_len];
                pos += sub_len;
                tree.push(field, classify_payload(payload, depth));
            }
            WireType::StartGroup => {
                match decode_at(&data[pos..], depth + 1, Some(field)) {
                    Some((sub, consumed)) => {
                        pos += consumed;
                        tree.push(field, Leaf::Group(sub));
                    }
                    None => break,
                }
            }
        }
    }

    Some((tree, pos))
}

/// Classify a length-delimited payload as message, string or bytes.
fn classify_payload(payload: &[u8], depth: usize) -> Leaf {
    if let Some((sub, consumed)) = decode_at(payload, depth + 1, None) {
        if consumed == payload.len() {
            return Leaf::Message(sub);
        }
    }
    if let Ok(text) = std::str::from_utf8(payload) {
        if text.chars().all(is_textual) {
            return Leaf::Str(text.to_owned());
        }
    }
    Leaf::Bytes(payload.to_vec())
}

fn is_textual(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || !c.is_control()
}

/// Recursively collect every string leaf in the tree.
pub fn find_strings(tree: &Tree) -> Vec<String> {
    let mut strings = Vec::new();
    collect_strings(tree, 0, &mut strings);
    strings
}

fn collect_strings(tree: &Tree, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    for (_, leaves) in tree.iter() {
        for leaf in leaves {
            match leaf {
                Leaf::Str(s) => out.push(s.clone()),
                Leaf::Message(sub) | Leaf::Group(sub) => {
                    collect_strings(sub, depth + 1, out);
                }
                _ => {}
            }
        }
    }
}

/// Controls how much of an opaque byte blob survives simplification.
#[derive(Debug, Clone, Copy)]
pub struct SimplifyOptions {
    /// Include a hex preview of byte blobs instead of just their length.
    pub include_bytes: bool,
    /// Maximum number of bytes shown in the hex preview.
    pub bytes_hex_limit: usize,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        SimplifyOptions {
            include_bytes: false,
            bytes_hex_limit: 64,
        }
    }
}

/// Convert a tree into a JSON-friendly value.
///
/// Single-valued fields are unwrapped, multi-valued fields become arrays.
/// Byte blobs collapse to `{"_bytes": n}` unless a hex preview was requested.
pub fn simplify_tree(tree: &Tree, opts: &SimplifyOptions) -> Value {
    simplify_tree_at(tree, opts, 0)
}

fn simplify_tree_at(tree: &Tree, opts: &SimplifyOptions, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::Null;
    }
    let mut map = Map::new();
    for (tag, leaves) in tree.iter() {
        let mut values: Vec<Value> = leaves
            .iter()
            .map(|leaf| simplify_leaf(leaf, opts, depth + 1))
            .collect();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        map.insert(tag.to_string(), value);
    }
    Value::Object(map)
}

fn simplify_leaf(leaf: &Leaf, opts: &SimplifyOptions, depth: usize) -> Value {
    match leaf {
        Leaf::Varint(v) => json!(v),
        Leaf::Str(s) => json!(s),
        Leaf::Message(sub) | Leaf::Group(sub) => simplify_tree_at(sub, opts, depth),
        Leaf::Fixed32(_) => json!({
            "_f32": leaf.fixed32_f32(),
            "_i32": leaf.fixed32_i32(),
        }),
        Leaf::Fixed64(_) => json!({
            "_f64": leaf.fixed64_f64(),
            "_i64": leaf.fixed64_i64(),
        }),
        Leaf::Bytes(bytes) => {
            if !opts.include_bytes {
                return json!({ "_bytes": bytes.len() });
            }
            let preview = &bytes[..bytes.len().min(opts.bytes_hex_limit)];
            json!({
                "_bytes": bytes.len(),
                "_hex": hex_string(preview),
                "_hex_truncated": bytes.len() > opts.bytes_hex_limit,
            })
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
