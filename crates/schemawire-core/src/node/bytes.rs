//! `bytes` node: a leaf scalar converted to/from
//! `hex`/`string`/`int`/`uint`/`float`, optionally carrying a CRC over a
//! declared byte range.

use crate::{
    context::{Context, Flow},
    convert::{self, ByteOrder, PadPosition},
    crc::CrcAlgorithm,
    error::{DecodeError, EncodeError},
    expr::{CompiledExpr, ExprBindings, ExprEvaluator},
    literal,
    node::Node,
    value::Value,
};

/// How this node's size is determined at decode/encode time.
#[derive(Debug)]
pub enum SizeSource {
    /// A fixed byte count.
    Bytes(usize),
    /// A fixed bit count.
    Bits(u32),
    /// An expression evaluated against `vars`/`fields`/`offsets`.
    Expr(CompiledExpr),
}

/// A CRC carried by a [`BytesNode`]: the algorithm plus the byte range
/// (evaluated against `Context::offsets`) it covers.
#[derive(Debug)]
pub struct BytesCrc {
    /// The resolved algorithm.
    pub algorithm: CrcAlgorithm,
    /// Start-of-range expression.
    pub start: CompiledExpr,
    /// End-of-range expression.
    pub end: CompiledExpr,
}

/// A compiled `bytes` node.
#[derive(Debug)]
pub struct BytesNode {
    name: String,
    flow: Flow,
    round: u32,
    wire_type: String,
    size: SizeSource,
    byte_order: ByteOrder,
    pad_byte: u8,
    pad_position: PadPosition,
    default: Option<Vec<u8>>,
    check: Option<CompiledExpr>,
    crc: Option<BytesCrc>,
    track_offset: bool,
}

impl BytesNode {
    /// Build a node directly from its compiled parts (used by
    /// `crate::compiler`).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        wire_type: String,
        size: SizeSource,
        byte_order: ByteOrder,
        pad_byte: u8,
        pad_position: PadPosition,
        default: Option<Vec<u8>>,
        check: Option<CompiledExpr>,
        crc: Option<BytesCrc>,
        round: u32,
        flow: Flow,
        track_offset: bool,
    ) -> Self {
        Self {
            name,
            flow,
            round,
            wire_type,
            size,
            byte_order,
            pad_byte,
            pad_position,
            default,
            check,
            crc,
            track_offset,
        }
    }

    /// `ctx.offsets` widened with `packet_len`, the substrate CRC range
    /// expressions use to express "everything written/read so far".
    fn offset_bindings(ctx: &Context) -> std::collections::HashMap<String, usize> {
        let mut offsets: std::collections::HashMap<String, usize> =
            ctx.offsets.iter().map(|(k, v)| (k.clone(), *v)).collect();
        offsets.insert("packet_len".to_string(), ctx.byte_pos());
        offsets
    }

    fn crc_range(&self, crc: &BytesCrc, ctx: &Context) -> Result<(usize, usize), String> {
        let offsets = Self::offset_bindings(ctx);
        let bindings = ExprBindings { vars: ctx.vars.as_map(), fields: None, offsets: Some(&offsets), val: None };
        let start = crc.start.eval(&bindings).map_err(|e| e.to_string())?.as_i64().unwrap_or(0).max(0) as usize;
        let end = crc.end.eval(&bindings).map_err(|e| e.to_string())?.as_i64().unwrap_or(0).max(0) as usize;
        Ok((start, end))
    }

    fn resolve_size(&self, ctx: &Context) -> Result<i64, DecodeError> {
        match &self.size {
            SizeSource::Bytes(n) => Ok(i64::try_from(*n).unwrap_or(i64::MAX)),
            SizeSource::Bits(n) => Ok(i64::from(*n)),
            SizeSource::Expr(expr) => {
                let bindings = ExprBindings {
                    vars: ctx.vars.as_map(),
                    fields: ctx.fields.as_map(),
                    offsets: None,
                    val: None,
                };
                let value = expr
                    .eval(&bindings)
                    .map_err(|source| DecodeError::Expression { field: self.name.clone(), source })?;
                value.as_i64().ok_or_else(|| DecodeError::NegativeSize { field: self.name.clone(), size: -1 })
            },
        }
    }

    fn is_bit_field(&self) -> bool {
        matches!(self.size, SizeSource::Bits(_))
    }
}

impl Node for BytesNode {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        let size = self.resolve_size(ctx)?;
        if size < 0 {
            return Err(DecodeError::NegativeSize { field: self.name.clone(), size });
        }

        let value = if self.is_bit_field() {
            let bits = u32::try_from(size).unwrap_or(0);
            let raw = ctx.read_bits(&self.name, bits)?;
            Value::UInt(raw)
        } else {
            let size = size as usize;
            let raw = ctx.read_bytes(&self.name, size)?;
            match self.wire_type.as_str() {
                "string" => Value::Str(String::from_utf8_lossy(&raw).into_owned()),
                "int" => Value::Int(convert::bytes_to_int(&raw, self.byte_order)),
                "uint" => Value::UInt(convert::bytes_to_uint(&raw, self.byte_order)),
                "float" => Value::Float(convert::bytes_to_float(&raw, self.byte_order)?),
                _ => Value::Str(convert::bytes_to_hex(&raw)),
            }
        };

        if let Some(crc) = &self.crc {
            let (start, end) = self.crc_range(crc, ctx).map_err(|reason| DecodeError::Expression {
                field: self.name.clone(),
                source: crate::error::ExpressionError::Eval(reason),
            })?;
            let data = ctx.snapshot();
            if start > end || end > data.len() {
                return Err(DecodeError::InvalidCrcRange { field: self.name.clone(), start, end, len: data.len() });
            }
            let computed = crc.algorithm.checksum(&data[start..end]);
            let read = value.as_u64().ok_or_else(|| DecodeError::UnsupportedType {
                field: self.name.clone(),
                ty: self.wire_type.clone(),
            })?;
            if read != computed {
                return Err(DecodeError::CrcMismatch { field: self.name.clone(), expected: read, computed });
            }
        }

        if let Some(check) = &self.check {
            let bindings = ExprBindings {
                vars: ctx.vars.as_map(),
                fields: ctx.fields.as_map(),
                offsets: None,
                val: Some(&value),
            };
            let result = check
                .eval(&bindings)
                .map_err(|source| DecodeError::Expression { field: self.name.clone(), source })?;
            if !result.as_bool().unwrap_or(false) {
                return Err(DecodeError::CheckFailed { field: self.name.clone() });
            }
        }

        ctx.fields.set_path(&self.name, value);
        Ok(())
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        if self.round == 0 {
            if ctx.round != 0 {
                return Ok(());
            }
            return self.write_value(ctx);
        }

        if ctx.round == 0 {
            let size = self.resolve_size_encode(ctx)?;
            let size = usize::try_from(size)
                .map_err(|_| EncodeError::SizeNegative { field: self.name.clone(), size })?;
            return ctx.write_bytes(&vec![0u8; size]);
        }
        if ctx.round != self.round {
            return Ok(());
        }

        let bytes = self.compute_patch_bytes(ctx)?;
        let offset = ctx.current_node_offset().ok_or_else(|| EncodeError::FormulaError {
            field: self.name.clone(),
            reason: "no recorded placeholder offset for this round".to_string(),
        })?;
        ctx.patch_bytes(offset, &bytes);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn flow(&self) -> Flow {
        self.flow
    }

    fn round(&self) -> u32 {
        self.round
    }

    fn track_offset(&self) -> bool {
        self.track_offset
    }
}

impl BytesNode {
    /// Round-0 write path for a field whose own `round` is `0`: look up the
    /// field (or schema default) and write it in place, no placeholder.
    fn write_value(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        let value = match ctx.fields.get_path(&self.name) {
            Some(v) => v.clone(),
            None => match &self.default {
                Some(bytes) => Value::Bytes(bytes.clone()),
                None => {
                    return Err(EncodeError::TypeMismatch {
                        field: self.name.clone(),
                        expected: "present field or schema default",
                        got: "missing".to_string(),
                    });
                },
            },
        };

        if self.is_bit_field() {
            let size = self.resolve_size_encode(ctx)?;
            let bits = u32::try_from(size).unwrap_or(0);
            let raw = value.as_u64().ok_or_else(|| EncodeError::TypeMismatch {
                field: self.name.clone(),
                expected: "uint",
                got: "non-integer".to_string(),
            })?;
            ctx.write_bits(raw, bits);
            return Ok(());
        }

        let size = self.resolve_size_encode(ctx)?;
        let size = usize::try_from(size).map_err(|_| EncodeError::SizeNegative {
            field: self.name.clone(),
            size,
        })?;

        let bytes = if let Value::Bytes(raw) = &value {
            convert::resize_bytes(raw, size, self.pad_byte, self.pad_position)
        } else {
            convert::value_to_wire_bytes(
                &value,
                &self.wire_type,
                size,
                self.byte_order,
                self.pad_byte,
                self.pad_position,
                &self.name,
            )?
        };
        ctx.write_bytes(&bytes)
    }

    /// This node's own round's patch value: the CRC checksum over its
    /// declared range when it carries one, else the looked-up field/default
    /// value, both sized per `resolve_size_encode`.
    fn compute_patch_bytes(&self, ctx: &Context) -> Result<Vec<u8>, EncodeError> {
        let size = self.resolve_size_encode(ctx)?;
        let size =
            usize::try_from(size).map_err(|_| EncodeError::SizeNegative { field: self.name.clone(), size })?;

        if let Some(crc) = &self.crc {
            let (start, end) = self.crc_range(crc, ctx).map_err(|reason| EncodeError::FormulaError {
                field: self.name.clone(),
                reason,
            })?;
            let data = ctx.snapshot();
            if start > end || end > data.len() {
                return Err(EncodeError::FormulaError {
                    field: self.name.clone(),
                    reason: format!("invalid crc range [{start}, {end}) over {} bytes", data.len()),
                });
            }
            let checksum = crc.algorithm.checksum(&data[start..end]);
            return Ok(convert::uint_to_bytes(checksum, size, self.byte_order));
        }

        let value = match ctx.fields.get_path(&self.name) {
            Some(v) => v.clone(),
            None => match &self.default {
                Some(bytes) => Value::Bytes(bytes.clone()),
                None => {
                    return Err(EncodeError::TypeMismatch {
                        field: self.name.clone(),
                        expected: "present field or schema default",
                        got: "missing".to_string(),
                    });
                },
            },
        };
        if let Value::Bytes(raw) = &value {
            return Ok(convert::resize_bytes(raw, size, self.pad_byte, self.pad_position));
        }
        convert::value_to_wire_bytes(&value, &self.wire_type, size, self.byte_order, self.pad_byte, self.pad_position, &self.name)
    }

    fn resolve_size_encode(&self, ctx: &Context) -> Result<i64, EncodeError> {
        match &self.size {
            SizeSource::Bytes(n) => Ok(i64::try_from(*n).unwrap_or(i64::MAX)),
            SizeSource::Bits(n) => Ok(i64::from(*n)),
            SizeSource::Expr(expr) => {
                let bindings = ExprBindings {
                    vars: ctx.vars.as_map(),
                    fields: ctx.fields.as_map(),
                    offsets: None,
                    val: None,
                };
                let value = expr
                    .eval(&bindings)
                    .map_err(|source| EncodeError::Expression { field: self.name.clone(), source })?;
                value
                    .as_i64()
                    .ok_or_else(|| EncodeError::SizeNegative { field: self.name.clone(), size: -1 })
            },
        }
    }
}

/// Parse a schema `default` literal into bytes, for schema compilation.
pub fn compile_default(raw: &str, size: i64) -> Result<Vec<u8>, crate::error::SchemaError> {
    literal::parse_typed_literal(raw, size, literal::Endian::Big)
}
