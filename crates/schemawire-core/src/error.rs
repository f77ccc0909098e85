//! Error types for schema compilation, decode, encode, framing, and
//! expression evaluation.
//!
//! One `thiserror` enum per concern, with `From` conversions at the
//! boundaries that need them: a `DecodeError`/`EncodeError` never lets an
//! attacker-controlled packet panic the process.

use thiserror::Error;

/// Errors raised while compiling a [`crate::schema::Field`] list into a node
/// tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field's `type` does not match any registered node kind.
    #[error("unknown node type {ty:?} for field {field}")]
    UnknownType {
        /// Field path that named the type.
        field: String,
        /// The unrecognized type string.
        ty: String,
    },

    /// A `ref` pointed at a data structure name that doesn't exist.
    #[error("unresolved ref {name:?} (field {field})")]
    UnresolvedRef {
        /// Field that carried the `ref`.
        field: String,
        /// The missing data-structure name.
        name: String,
    },

    /// CRC name didn't match the `crc<bits>_<variant>` shape, or named an
    /// unsupported bit-width/variant.
    #[error("malformed crc name {name:?} (field {field}): {reason}")]
    BadCrcName {
        /// Field that carried the CRC spec.
        field: String,
        /// The CRC name as written in the schema.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `FramingRule::setup` rejected the configured parameters.
    #[error("invalid framing parameters for protocol {protocol}: {reason}")]
    BadFraming {
        /// Protocol name.
        protocol: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An expression string failed to compile.
    #[error("failed to compile expression {expr:?} (field {field}): {reason}")]
    ExpressionCompile {
        /// Field that carried the expression.
        field: String,
        /// The source expression text.
        expr: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A field is missing a size by every available means (`size`, `bits`,
    /// `size_expr`).
    #[error("field {field} should specify a size, bits, or size_expr")]
    MissingSize {
        /// Field path.
        field: String,
    },

    /// A typed literal (`header_marker`, `pad_byte`, `default`, ...) didn't
    /// match its declared shape.
    #[error("invalid literal {raw:?}: {reason}")]
    BadLiteral {
        /// The literal text as written in the schema.
        raw: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors raised while scanning incoming bytes for packet boundaries
///.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// A text packet grew past `max_len` without finding its end delimiter.
    #[error("text frame exceeded max_len ({max_len}) without an end delimiter")]
    MaxLenExceeded {
        /// The configured limit.
        max_len: usize,
    },

    /// The declared length field could not be parsed (wrong size, etc).
    #[error("malformed length field: {reason}")]
    MalformedLength {
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors raised while walking the node tree to decode a packet into a field
/// dictionary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Ran out of bytes before the cursor's requested read was satisfied.
    #[error("unexpected EOF in field {field}: need {need} bytes, have {have}")]
    UnexpectedEof {
        /// Field being decoded.
        field: String,
        /// Bytes the read required.
        need: usize,
        /// Bytes actually remaining.
        have: usize,
    },

    /// `read_bytes` was called with `bit_pos != 0`.
    #[error("misaligned read in field {field}: bit_pos must be 0 to read bytes")]
    MisalignedRead {
        /// Field being decoded.
        field: String,
    },

    /// A bit read requested more than 64 bits.
    #[error("field {field} requested {bits} bits, more than 64")]
    BitFieldTooLarge {
        /// Field being decoded.
        field: String,
        /// The requested bit count.
        bits: u32,
    },

    /// The CRC recomputed over the declared range didn't match the value
    /// read from the packet.
    #[error("CRC mismatch in field {field}: expected {expected:#x}, computed {computed:#x}")]
    CrcMismatch {
        /// Field carrying the CRC.
        field: String,
        /// Value read from the packet.
        expected: u64,
        /// Value recomputed over the declared range.
        computed: u64,
    },

    /// A CRC's start/end expressions described an invalid byte range.
    #[error("invalid CRC range in field {field}: start={start}, end={end}, len={len}")]
    InvalidCrcRange {
        /// Field carrying the CRC.
        field: String,
        /// Resolved start offset.
        start: usize,
        /// Resolved end offset.
        end: usize,
        /// Total buffer length.
        len: usize,
    },

    /// A `check` expression evaluated to `false` (or a non-bool).
    #[error("check failed for field {field}")]
    CheckFailed {
        /// Field whose check failed.
        field: String,
    },

    /// A `switch` discriminator matched no case and there was no default.
    #[error("no switch case for field {field} matched discriminator value {value}")]
    NoSwitchCase {
        /// The switch node's own field name.
        field: String,
        /// The discriminator value that matched nothing.
        value: String,
    },

    /// A `bytes` node's declared `type` isn't one of the supported shapes.
    #[error("unsupported type {ty:?} for field {field}")]
    UnsupportedType {
        /// Field being decoded.
        field: String,
        /// The unsupported type string.
        ty: String,
    },

    /// `size_expr` (or a CRC offset expression) evaluated to a negative
    /// number.
    #[error("negative size in field {field}: {size}")]
    NegativeSize {
        /// Field being decoded.
        field: String,
        /// The offending evaluated size.
        size: i64,
    },

    /// A discriminator field or other referenced field was absent.
    #[error("missing field {field}")]
    MissingField {
        /// The absent field path.
        field: String,
    },

    /// An expression failed to evaluate during decode.
    #[error("expression error in field {field}: {0}", field = .field)]
    Expression {
        /// Field whose expression failed.
        field: String,
        /// Underlying evaluator error.
        #[source]
        source: ExpressionError,
    },
}

/// Errors raised while walking the node tree to encode a field dictionary
/// into bytes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A field's value couldn't be coerced to its declared wire type.
    #[error("type mismatch in field {field}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Field being encoded.
        field: String,
        /// The wire type the field declared.
        expected: &'static str,
        /// A description of the value actually supplied.
        got: String,
    },

    /// `size_expr` evaluated to a negative number.
    #[error("negative size in field {field}: {size}")]
    SizeNegative {
        /// Field being encoded.
        field: String,
        /// The offending evaluated size.
        size: i64,
    },

    /// A field has no `size`, `bits`, or `size_expr`.
    #[error("field {field} should specify a size, bits, or size_expr")]
    MissingSize {
        /// Field being encoded.
        field: String,
    },

    /// A `calc`/size formula failed to evaluate or returned an unusable
    /// value.
    #[error("formula error in field {field}: {reason}")]
    FormulaError {
        /// Field being encoded.
        field: String,
        /// Why the formula failed.
        reason: String,
    },

    /// An expression failed to evaluate during encode.
    #[error("expression error in field {field}")]
    Expression {
        /// Field whose expression failed.
        field: String,
        /// Underlying evaluator error.
        #[source]
        source: ExpressionError,
    },
}

/// Errors surfaced by the expression evaluator, annotated with the node
/// being evaluated by callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// The expression text failed to compile.
    #[error("compile error: {0}")]
    Compile(String),

    /// The expression raised an error while executing.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// The expression returned a value of a shape the caller can't use
    /// (e.g. a size expression returning a string).
    #[error("unexpected result type: {0}")]
    UnexpectedResultType(String),
}

/// Top-level error returned from [`crate::codec::Codec`] entry points,
/// unifying each category-specific error behind one type callers can
/// match on without reaching into the individual compile/decode/encode
/// error enums.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The underlying reader failed while scanning for packets.
    #[error("I/O error while scanning: {0}")]
    Io(#[from] std::io::Error),

    /// Failed during schema compilation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Failed while framing a byte stream.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// Failed while decoding a packet.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Failed while encoding a field dictionary.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The caller asked to encode against a protocol name the scheme
    /// doesn't define.
    #[error("unknown protocol {0:?}")]
    UnknownProtocol(String),

    /// A scheme with no protocols was asked to encode with no selector.
    #[error("scheme defines no protocols")]
    NoProtocols,
}
