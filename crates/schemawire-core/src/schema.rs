//! The declarative schema surface: `Field`, `Protocol`, and
//! `FramingRule` configuration, as typed Rust values rather than a document
//! format. Schema *document* parsing (YAML/JSON text) is explicitly out of
//! scope; an embedder builds these structs directly, or deserializes them
//! from whatever `serde` format it prefers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::convert::{ByteOrder, PadPosition};

/// Which pass(es) a node is visited on. Schema-level counterpart of
/// [`crate::context::Flow`]; `Both` (the default) means the node runs on
/// every decode and every encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSpec {
    /// Visited on both decode and encode.
    #[default]
    Both,
    /// Visited on encode only.
    Encode,
    /// Visited on decode only.
    Decode,
}

/// How a node's size is declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSpec {
    /// A fixed byte count.
    Bytes(usize),
    /// A fixed bit count (sub-byte field).
    Bits(u32),
    /// An expression evaluated at decode/encode time, yielding a byte
    /// count.
    Expr(String),
}

/// How many elements an `array` node has.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthSpec {
    /// A fixed element count.
    Fixed(usize),
    /// An expression evaluated once, yielding an element count.
    Expr(String),
    /// Consume elements until the underlying data is exhausted (decode
    /// only; on encode, the element count is the list's own length).
    UntilEof,
}

/// A single field in a `struct`'s field list, or the root of a protocol
/// body. Tagged by `type` so schemas can be deserialized from self-
/// describing formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSpec {
    /// A leaf scalar: hex/string/int/uint/float, see [`BytesSpec`].
    Bytes(BytesSpec),
    /// A computed or placeholder-then-patched scalar (CRCs, lengths), see
    /// [`CalcSpec`].
    Calc(CalcSpec),
    /// A conditionally-present field group, see [`IfSpec`].
    If(IfSpec),
    /// A discriminated field group, see [`SwitchSpec`].
    Switch(SwitchSpec),
    /// A homogeneous repeated field group, see [`ArraySpec`].
    Array(ArraySpec),
    /// A nested named field group, see [`StructSpec`].
    Struct(StructSpec),
}

impl FieldSpec {
    /// The field's own name, used for dictionary keys and error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Bytes(s) => &s.name,
            Self::Calc(s) => &s.name,
            Self::If(s) => &s.name,
            Self::Switch(s) => &s.name,
            Self::Array(s) => &s.name,
            Self::Struct(s) => &s.name,
        }
    }
}

/// `bytes` node configuration: a fixed- or expression-sized
/// scalar converted to/from one of `hex`/`string`/`int`/`uint`/`float`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BytesSpec {
    /// Field name.
    pub name: String,
    /// Which pass this node is visited on.
    #[serde(default)]
    pub flow: FlowSpec,
    /// The encode round this node's value is written in. A plain `bytes`
    /// field is normally round `0`; a CRC-bearing one is deferred to the
    /// round after everything it covers has been written, same as `calc`.
    #[serde(default)]
    pub round: u32,
    /// Whether to record this node's starting byte offset under its own
    /// name in `Context::offsets`.
    #[serde(default)]
    pub track_offset: bool,
    /// `hex` (default), `string`, `int`, `uint`, or `float`.
    #[serde(default)]
    pub wire_type: String,
    /// The field's size on the wire.
    pub size: SizeSpec,
    /// Byte order for `int`/`uint`/`float`.
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Padding byte used when the encoded value is shorter than `size`.
    #[serde(default)]
    pub pad_byte: u8,
    /// Which side padding goes on.
    #[serde(default)]
    pub pad_position: PadPosition,
    /// A typed literal used when encoding and the field is
    /// absent from the supplied dictionary.
    #[serde(default)]
    pub default: Option<String>,
    /// An expression evaluated against the decoded `val`; must be truthy
    /// or decode fails with `CheckFailed`.
    #[serde(default)]
    pub check: Option<String>,
    /// CRC recomputed/verified over a declared byte range, if this field
    /// carries one.
    #[serde(default)]
    pub crc: Option<CrcSpec>,
}

/// CRC configuration attached to a `bytes` field: the named algorithm and
/// the byte range it covers, both range endpoints evaluated against
/// `Context::offsets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrcSpec {
    /// `crc<bits>_<variant>` name.
    pub name: String,
    /// Start-of-range expression; defaults to `"0"`.
    #[serde(default = "default_crc_start")]
    pub start: String,
    /// End-of-range expression.
    pub end: String,
}

fn default_crc_start() -> String {
    "0".to_string()
}

/// `calc` node configuration: round 0 writes a zero-filled placeholder of
/// `size` bytes and records its offset; the node's own declared `round`
/// is when it patches that placeholder with its formula's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcSpec {
    /// Field name.
    pub name: String,
    /// Which pass this node is visited on.
    #[serde(default)]
    pub flow: FlowSpec,
    /// The round this node's value becomes final and gets patched in.
    #[serde(default = "default_calc_round")]
    pub round: u32,
    /// Whether to record this node's starting offset.
    #[serde(default)]
    pub track_offset: bool,
    /// Placeholder/value width in bytes.
    pub size: usize,
    /// Byte order the computed value is laid out in.
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// The expression computing this field's value, re-evaluated every
    /// round it's asked for.
    pub formula: String,
}

fn default_calc_round() -> u32 {
    1
}

/// `if` node configuration: `then` fields are decoded or encoded only
/// when `condition` evaluates truthy; otherwise this node is a no-op.
/// `then`'s fields are written directly into the enclosing dictionary —
/// `if` is a control construct, not a nesting level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfSpec {
    /// Field name, used only for diagnostics (no dictionary entry of its
    /// own is created).
    pub name: String,
    /// Which pass this node is visited on.
    #[serde(default)]
    pub flow: FlowSpec,
    /// Always round `0`.
    #[serde(default)]
    pub round: u32,
    /// Whether to record this node's starting offset.
    #[serde(default)]
    pub track_offset: bool,
    /// The condition expression.
    pub condition: String,
    /// Fields decoded/encoded when `condition` is truthy.
    pub then: Vec<FieldSpec>,
}

/// `switch` node configuration: `discriminator` is
/// evaluated and coerced to `u64`, selecting one of `cases` (falling back
/// to `default`, or failing with `NoSwitchCase`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSpec {
    /// Field name.
    pub name: String,
    /// Which pass this node is visited on.
    #[serde(default)]
    pub flow: FlowSpec,
    /// Always round `0`.
    #[serde(default)]
    pub round: u32,
    /// Whether to record this node's starting offset.
    #[serde(default)]
    pub track_offset: bool,
    /// Expression selecting the case, coerced to `u64`.
    pub discriminator: String,
    /// Case key (as the discriminator's decimal string) to field list.
    pub cases: IndexMap<String, Vec<FieldSpec>>,
    /// Fields used when no case matches.
    #[serde(default)]
    pub default: Option<Vec<FieldSpec>>,
}

/// `array` node configuration: `item` is compiled once and
/// re-used to decode/encode every element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySpec {
    /// Field name.
    pub name: String,
    /// Which pass this node is visited on.
    #[serde(default)]
    pub flow: FlowSpec,
    /// Always round `0`.
    #[serde(default)]
    pub round: u32,
    /// Whether to record this node's starting offset.
    #[serde(default)]
    pub track_offset: bool,
    /// How many elements.
    pub length: LengthSpec,
    /// The per-element field schema.
    pub item: Box<FieldSpec>,
}

/// `struct` node configuration: a nested, named group of
/// fields, or a `ref` to a shared one defined in
/// [`crate::scheme::Scheme::data_structures`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructSpec {
    /// Field name.
    pub name: String,
    /// Which pass this node is visited on.
    #[serde(default)]
    pub flow: FlowSpec,
    /// Always round `0`.
    #[serde(default)]
    pub round: u32,
    /// Whether to record this node's starting offset.
    #[serde(default)]
    pub track_offset: bool,
    /// This struct's own fields, if not a `ref`.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// The name of a shared data structure to expand in place of `fields`.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Binary framing configuration: a fixed header marker
/// followed by a length-prefixed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryFramingSpec {
    /// Typed literal identifying this protocol's packets.
    pub header_marker: String,
    /// Byte offset of the length field, relative to the start of the
    /// header marker.
    pub length_field_offset: usize,
    /// Width of the length field in bytes.
    pub length_field_size: usize,
    /// Byte order of the length field.
    #[serde(default)]
    pub length_byte_order: ByteOrder,
    /// Whether the length field's value counts the header marker and
    /// length field themselves, or only the bytes after them.
    #[serde(default)]
    pub length_includes_header: bool,
    /// Hard cap on total frame size; exceeding it without completing the
    /// frame raises `FramingError::MaxLenExceeded`.
    pub max_len: usize,
}

/// Text framing configuration: delimiter-bounded packets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFramingSpec {
    /// Bytes marking the start of a packet.
    pub start_delimiter: String,
    /// Bytes marking the end of a packet.
    pub end_delimiter: String,
    /// Whether the returned token includes the delimiters. When `false`,
    /// the returned slice is the body re-anchored at
    /// `start_delimiter.len()`.
    #[serde(default)]
    pub contain_delimiter: bool,
    /// Hard cap on total frame size while scanning for `end_delimiter`.
    pub max_len: usize,
}

/// A protocol's framing rule, one of the two supported shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramingSpec {
    /// See [`BinaryFramingSpec`].
    Binary(BinaryFramingSpec),
    /// See [`TextFramingSpec`].
    Text(TextFramingSpec),
}

/// One protocol: a framing rule plus the field list decoded/encoded from
/// the framed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSpec {
    /// Protocol name, used by `Codec::encode`'s protocol selector.
    pub name: String,
    /// How packets for this protocol are recognized in a byte stream.
    pub framing: FramingSpec,
    /// The body's field list.
    pub fields: Vec<FieldSpec>,
}

/// A full schema: zero or more shared, named field groups plus the
/// protocols that reference them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemeSpec {
    /// Named field groups, expandable into a `struct` node via `ref`.
    #[serde(default)]
    pub data_structures: IndexMap<String, Vec<FieldSpec>>,
    /// The protocols this scheme recognizes, tried in order during
    /// stream scanning.
    pub protocols: Vec<ProtocolSpec>,
}
