//! Fixture schemas for `schemawire-core`'s property and scenario tests.
//!
//! Schema *document* parsing is out of scope for the core crate, so every
//! fixture here is built directly through the `schemawire_core::schema`
//! struct API — the same way an embedder would construct a scheme in
//! process rather than loading one from a config file.

use indexmap::IndexMap;
use schemawire_core::{
    convert::ByteOrder,
    schema::{
        ArraySpec, BinaryFramingSpec, BytesSpec, CalcSpec, CrcSpec, FieldSpec, FlowSpec, FramingSpec,
        LengthSpec, ProtocolSpec, SchemeSpec, StructSpec, SwitchSpec, TextFramingSpec,
    },
    Value,
};

fn bytes_field(name: &str, wire_type: &str, size: usize) -> FieldSpec {
    FieldSpec::Bytes(BytesSpec {
        name: name.to_string(),
        flow: FlowSpec::Both,
        round: 0,
        track_offset: false,
        wire_type: wire_type.to_string(),
        size: schemawire_core::schema::SizeSpec::Bytes(size),
        byte_order: ByteOrder::Big,
        pad_byte: 0,
        pad_position: schemawire_core::convert::PadPosition::Right,
        default: None,
        check: None,
        crc: None,
    })
}

fn hex_field_with_default(name: &str, size: usize, default: &str) -> FieldSpec {
    let FieldSpec::Bytes(mut spec) = bytes_field(name, "hex", size) else { unreachable!() };
    spec.default = Some(default.to_string());
    FieldSpec::Bytes(spec)
}

/// Card-payload data structure shared by the `dtu` protocol's `card` switch
/// case: a 4-byte card identifier and a 4-byte balance.
#[must_use]
pub fn card_fields() -> Vec<FieldSpec> {
    vec![bytes_field("cardId", "uint", 4), bytes_field("balance", "uint", 4)]
}

/// Set-time-payload data structure shared by the `dtu` protocol's
/// `set_time` switch case: a 4-byte unix timestamp.
#[must_use]
pub fn set_time_fields() -> Vec<FieldSpec> {
    vec![bytes_field("timestamp", "uint", 4)]
}

/// The DTU-style binary protocol used throughout the scenario and property
/// tests: a fixed 12-byte header (`magic`/`sn`/`productCode`/`version`/
/// `command`), a round-1 `dataLen` back-reference, a `command`-discriminated
/// payload (`card` or `set_time`), and a round-2 CRC-16/MODBUS trailer
/// covering everything before it.
///
/// `dataLen` and `dataCrc` both read `Context::offsets` rather than hard-
/// coding the 12-byte header width, so the schema stays correct if a field
/// is inserted or resized ahead of them.
#[must_use]
pub fn dtu_scheme() -> SchemeSpec {
    let mut data_structures = IndexMap::new();
    data_structures.insert("card".to_string(), card_fields());
    data_structures.insert("set_time".to_string(), set_time_fields());

    let data_len = FieldSpec::Calc(CalcSpec {
        name: "dataLen".to_string(),
        flow: FlowSpec::Both,
        round: 1,
        track_offset: true,
        size: 2,
        byte_order: ByteOrder::Big,
        formula: "offsets.dataCrc - offsets.dataLen".to_string(),
    });

    let mut cases = IndexMap::new();
    cases.insert(
        "1".to_string(),
        vec![FieldSpec::Struct(StructSpec {
            name: "data".to_string(),
            flow: FlowSpec::Both,
            round: 0,
            track_offset: false,
            fields: Vec::new(),
            reference: Some("card".to_string()),
        })],
    );
    cases.insert(
        "2".to_string(),
        vec![FieldSpec::Struct(StructSpec {
            name: "data".to_string(),
            flow: FlowSpec::Both,
            round: 0,
            track_offset: false,
            fields: Vec::new(),
            reference: Some("set_time".to_string()),
        })],
    );

    let data = FieldSpec::Switch(SwitchSpec {
        name: "data".to_string(),
        flow: FlowSpec::Both,
        round: 0,
        track_offset: true,
        discriminator: "fields.command".to_string(),
        cases,
        default: None,
    });

    let data_crc = FieldSpec::Bytes(BytesSpec {
        name: "dataCrc".to_string(),
        flow: FlowSpec::Both,
        round: 2,
        track_offset: true,
        wire_type: "uint".to_string(),
        size: schemawire_core::schema::SizeSpec::Bytes(2),
        byte_order: ByteOrder::Big,
        pad_byte: 0,
        pad_position: schemawire_core::convert::PadPosition::Right,
        default: None,
        check: None,
        crc: Some(CrcSpec {
            name: "crc16_modbus".to_string(),
            start: "0".to_string(),
            end: "offsets.dataCrc".to_string(),
        }),
    });

    let fields = vec![
        hex_field_with_default("magic", 2, "7273"),
        bytes_field("sn", "hex", 6),
        hex_field_with_default("productCode", 2, "0001"),
        hex_field_with_default("version", 1, "01"),
        bytes_field("command", "uint", 1),
        data_len,
        data,
        data_crc,
    ];

    let framing = FramingSpec::Binary(BinaryFramingSpec {
        header_marker: "7273".to_string(),
        length_field_offset: 12,
        length_field_size: 2,
        length_byte_order: ByteOrder::Big,
        length_includes_header: false,
        max_len: 4096,
    });

    SchemeSpec {
        data_structures,
        protocols: vec![ProtocolSpec { name: "dtu".to_string(), framing, fields }],
    }
}

/// A minimal text-framed protocol (`<<...>>`-delimited) exercising `if` and
/// `array` in isolation, independent of the `dtu` fixture's CRC/switch
/// machinery: a one-byte flag, an optional 2-byte extra field gated on it,
/// and a flag-counted array of 1-byte elements.
///
/// `contain_delimiter` is `true`, so the delimiters themselves fall inside
/// the frame body the node tree parses — the same way `dtu`'s `magic`
/// field consumes its own binary header marker rather than having it
/// injected by the framing rule. `start`/`end` below are that literal
/// consumption, one field each.
#[must_use]
pub fn text_array_scheme() -> SchemeSpec {
    let item = FieldSpec::Bytes(BytesSpec {
        name: "item".to_string(),
        flow: FlowSpec::Both,
        round: 0,
        track_offset: false,
        wire_type: "uint".to_string(),
        size: schemawire_core::schema::SizeSpec::Bytes(1),
        byte_order: ByteOrder::Big,
        pad_byte: 0,
        pad_position: schemawire_core::convert::PadPosition::Right,
        default: None,
        check: None,
        crc: None,
    });

    let fields = vec![
        hex_field_with_default("start", 2, "3c3c"),
        bytes_field("flag", "uint", 1),
        FieldSpec::If(schemawire_core::schema::IfSpec {
            name: "extra_present".to_string(),
            flow: FlowSpec::Both,
            round: 0,
            track_offset: false,
            condition: "fields.flag > 0".to_string(),
            then: vec![bytes_field("extra", "uint", 2)],
        }),
        bytes_field("count", "uint", 1),
        FieldSpec::Array(ArraySpec {
            name: "items".to_string(),
            flow: FlowSpec::Both,
            round: 0,
            track_offset: false,
            length: LengthSpec::Expr("fields.count".to_string()),
            item: Box::new(item),
        }),
        hex_field_with_default("end", 2, "3e3e"),
    ];

    let framing = FramingSpec::Text(TextFramingSpec {
        start_delimiter: "s'<<'".to_string(),
        end_delimiter: "s'>>'".to_string(),
        contain_delimiter: true,
        max_len: 1024,
    });

    SchemeSpec { data_structures: IndexMap::new(), protocols: vec![ProtocolSpec { name: "flags".to_string(), framing, fields }] }
}

/// Build a `dtu` packet's field dictionary for the `card` case
/// (`command=1`), with every header field present explicitly so encoding it
/// and decoding the result back round-trips to an identical dictionary.
#[must_use]
pub fn card_request_fields(sn_hex: &str, card_id: u64, balance: u64) -> Value {
    let mut data = schemawire_core::ValueMap::new();
    data.insert("cardId".to_string(), Value::UInt(card_id));
    data.insert("balance".to_string(), Value::UInt(balance));

    let mut root = schemawire_core::ValueMap::new();
    root.insert("magic".to_string(), Value::Str("7273".to_string()));
    root.insert("sn".to_string(), Value::Str(sn_hex.to_string()));
    root.insert("productCode".to_string(), Value::Str("0001".to_string()));
    root.insert("version".to_string(), Value::Str("01".to_string()));
    root.insert("command".to_string(), Value::UInt(1));
    root.insert("data".to_string(), Value::Map(data));
    Value::Map(root)
}

/// Build a `dtu` packet's field dictionary for the `set_time` case
/// (`command=2`).
#[must_use]
pub fn set_time_request_fields(sn_hex: &str, timestamp: u64) -> Value {
    let mut data = schemawire_core::ValueMap::new();
    data.insert("timestamp".to_string(), Value::UInt(timestamp));

    let mut root = schemawire_core::ValueMap::new();
    root.insert("magic".to_string(), Value::Str("7273".to_string()));
    root.insert("sn".to_string(), Value::Str(sn_hex.to_string()));
    root.insert("productCode".to_string(), Value::Str("0001".to_string()));
    root.insert("version".to_string(), Value::Str("01".to_string()));
    root.insert("command".to_string(), Value::UInt(2));
    root.insert("data".to_string(), Value::Map(data));
    Value::Map(root)
}
