//! Schema compilation: turns the declarative [`crate::schema`] structs into
//! an executable node tree.
//!
//! Schema discovery at runtime is out of scope; the set
//! of node *kinds* is fixed and matched on `FieldSpec`'s variant rather
//! than through a dynamic registry keyed by a type string.

use indexmap::IndexMap;

use crate::{
    context::Flow,
    crc,
    error::SchemaError,
    expr::{self, CompiledExpr},
    node::{
        array::LengthKind,
        bytes::{self, BytesCrc, SizeSource},
        ArrayNode, BytesNode, CalcNode, IfNode, Node, StructNode, SwitchNode,
    },
    schema::{
        ArraySpec, BytesSpec, CalcSpec, FieldSpec, FlowSpec, IfSpec, LengthSpec, SizeSpec, StructSpec,
        SwitchSpec,
    },
};

/// Named, shared field-group definitions a `struct` node's `ref` can
/// expand in place of its own `fields` list.
pub type DataStructures = IndexMap<String, Vec<FieldSpec>>;

/// Compile one field-list into a `Vec<Box<dyn Node>>`, resolving any
/// `ref`s against `data_structures`.
pub fn compile_fields(
    specs: &[FieldSpec],
    data_structures: &DataStructures,
) -> Result<Vec<Box<dyn Node>>, SchemaError> {
    specs.iter().map(|spec| compile_field(spec, data_structures)).collect()
}

fn compile_field(spec: &FieldSpec, data_structures: &DataStructures) -> Result<Box<dyn Node>, SchemaError> {
    Ok(match spec {
        FieldSpec::Bytes(b) => Box::new(compile_bytes(b)?),
        FieldSpec::Calc(c) => Box::new(compile_calc(c)?),
        FieldSpec::If(i) => Box::new(compile_if(i, data_structures)?),
        FieldSpec::Switch(s) => Box::new(compile_switch(s, data_structures)?),
        FieldSpec::Array(a) => Box::new(compile_array(a, data_structures)?),
        FieldSpec::Struct(s) => Box::new(compile_struct(s, data_structures, false)?),
    })
}

fn compile_size(field: &str, spec: &SizeSpec) -> Result<SizeSource, SchemaError> {
    Ok(match spec {
        SizeSpec::Bytes(n) => SizeSource::Bytes(*n),
        SizeSpec::Bits(n) => SizeSource::Bits(*n),
        SizeSpec::Expr(e) => SizeSource::Expr(compile_expr(field, e)?),
    })
}

fn compile_expr(field: &str, source: &str) -> Result<CompiledExpr, SchemaError> {
    expr::compile(source).map_err(|e| SchemaError::ExpressionCompile {
        field: field.to_string(),
        expr: source.to_string(),
        reason: e.to_string(),
    })
}

fn compile_flow(flow: FlowSpec) -> Flow {
    match flow {
        FlowSpec::Both => Flow::Both,
        FlowSpec::Encode => Flow::Encode,
        FlowSpec::Decode => Flow::Decode,
    }
}

fn compile_bytes(spec: &BytesSpec) -> Result<BytesNode, SchemaError> {
    let size = compile_size(&spec.name, &spec.size)?;
    let default = spec
        .default
        .as_ref()
        .map(|raw| {
            let size_hint = match &spec.size {
                SizeSpec::Bytes(n) => i64::try_from(*n).unwrap_or(-1),
                _ => -1,
            };
            bytes::compile_default(raw, size_hint)
        })
        .transpose()?;
    let check = spec.check.as_ref().map(|e| compile_expr(&spec.name, e)).transpose()?;
    let crc = spec
        .crc
        .as_ref()
        .map(|c| {
            let algorithm = crc::lookup(&c.name, &spec.name)?;
            let start = compile_expr(&spec.name, &c.start)?;
            let end = compile_expr(&spec.name, &c.end)?;
            Ok::<_, SchemaError>(BytesCrc { algorithm, start, end })
        })
        .transpose()?;
    Ok(BytesNode::new(
        spec.name.clone(),
        spec.wire_type.clone(),
        size,
        spec.byte_order,
        spec.pad_byte,
        spec.pad_position,
        default,
        check,
        crc,
        spec.round,
        compile_flow(spec.flow),
        spec.track_offset,
    ))
}

fn compile_calc(spec: &CalcSpec) -> Result<CalcNode, SchemaError> {
    let formula = compile_expr(&spec.name, &spec.formula)?;
    Ok(CalcNode::new(
        spec.name.clone(),
        compile_flow(spec.flow),
        spec.round,
        spec.size,
        spec.byte_order,
        formula,
        spec.track_offset,
    ))
}

fn compile_if(spec: &IfSpec, data_structures: &DataStructures) -> Result<IfNode, SchemaError> {
    let condition = compile_expr(&spec.name, &spec.condition)?;
    let then = compile_fields(&spec.then, data_structures)?;
    Ok(IfNode::new(spec.name.clone(), compile_flow(spec.flow), condition, then, spec.track_offset))
}

fn compile_switch(spec: &SwitchSpec, data_structures: &DataStructures) -> Result<SwitchNode, SchemaError> {
    let discriminator = compile_expr(&spec.name, &spec.discriminator)?;
    let mut cases = IndexMap::new();
    for (key, fields) in &spec.cases {
        let key: u64 = key.parse().map_err(|_| SchemaError::ExpressionCompile {
            field: spec.name.clone(),
            expr: key.clone(),
            reason: "switch case keys must be decimal u64 literals".to_string(),
        })?;
        cases.insert(key, compile_fields(fields, data_structures)?);
    }
    let default = spec.default.as_ref().map(|fields| compile_fields(fields, data_structures)).transpose()?;
    Ok(SwitchNode::new(
        spec.name.clone(),
        compile_flow(spec.flow),
        discriminator,
        cases,
        default,
        spec.track_offset,
    ))
}

fn compile_array(spec: &ArraySpec, data_structures: &DataStructures) -> Result<ArrayNode, SchemaError> {
    let length = match &spec.length {
        LengthSpec::Fixed(n) => LengthKind::Fixed(*n),
        LengthSpec::Expr(e) => LengthKind::Expr(compile_expr(&spec.name, e)?),
        LengthSpec::UntilEof => LengthKind::UntilEof,
    };
    let item = compile_field(&spec.item, data_structures)?;
    Ok(ArrayNode::new(spec.name.clone(), compile_flow(spec.flow), length, item, spec.track_offset))
}

fn compile_struct(
    spec: &StructSpec,
    data_structures: &DataStructures,
    inline: bool,
) -> Result<StructNode, SchemaError> {
    let fields = match &spec.reference {
        Some(name) => {
            let referenced = data_structures.get(name).ok_or_else(|| SchemaError::UnresolvedRef {
                field: spec.name.clone(),
                name: name.clone(),
            })?;
            compile_fields(referenced, data_structures)?
        },
        None => compile_fields(&spec.fields, data_structures)?,
    };
    Ok(StructNode::new(spec.name.clone(), compile_flow(spec.flow), fields, inline, spec.track_offset))
}

/// Compile a protocol body's top-level field list as an inline struct: its
/// fields write directly into the packet's root dictionary rather than a
/// nested sub-map.
pub fn compile_root(
    fields: &[FieldSpec],
    data_structures: &DataStructures,
) -> Result<StructNode, SchemaError> {
    let compiled = compile_fields(fields, data_structures)?;
    Ok(StructNode::new("root".to_string(), Flow::Both, compiled, true, false))
}

/// The highest `calc` round declared anywhere in a field list (including
/// nested `if`/`switch`/`array`/`struct` children and `ref` expansions),
/// used to size the multi-round encode loop. Round `0` if no `calc` field
/// declares a later round.
#[must_use]
pub fn max_round(fields: &[FieldSpec], data_structures: &DataStructures) -> u32 {
    fields.iter().map(|f| field_max_round(f, data_structures)).max().unwrap_or(0)
}

fn field_max_round(field: &FieldSpec, data_structures: &DataStructures) -> u32 {
    match field {
        FieldSpec::Bytes(b) => b.round,
        FieldSpec::Calc(c) => c.round,
        FieldSpec::If(i) => max_round(&i.then, data_structures),
        FieldSpec::Switch(s) => {
            let cases = s.cases.values().map(|fields| max_round(fields, data_structures)).max().unwrap_or(0);
            let default = s.default.as_ref().map_or(0, |fields| max_round(fields, data_structures));
            cases.max(default)
        },
        FieldSpec::Array(a) => field_max_round(&a.item, data_structures),
        FieldSpec::Struct(s) => match &s.reference {
            Some(name) => {
                data_structures.get(name).map_or(0, |fields| max_round(fields, data_structures))
            },
            None => max_round(&s.fields, data_structures),
        },
    }
}
