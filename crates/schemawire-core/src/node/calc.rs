//! `calc` node: a formula-computed scalar (typically a
//! length back-reference) with placeholder-then-patch multi-round encode
//! semantics.

use crate::{
    context::{Context, Flow},
    convert::{self, ByteOrder},
    error::{DecodeError, EncodeError},
    expr::{CompiledExpr, ExprBindings, ExprEvaluator},
    value::Value,
};

use super::Node;

/// A compiled `calc` node: a formula, re-evaluated every round it's asked
/// for, placeholder-then-patched into place.
#[derive(Debug)]
pub struct CalcNode {
    name: String,
    flow: Flow,
    round: u32,
    size: usize,
    byte_order: ByteOrder,
    formula: CompiledExpr,
    track_offset: bool,
}

impl CalcNode {
    /// Build a node directly from its compiled parts.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        flow: Flow,
        round: u32,
        size: usize,
        byte_order: ByteOrder,
        formula: CompiledExpr,
        track_offset: bool,
    ) -> Self {
        Self { name, flow, round, size, byte_order, formula, track_offset }
    }

    fn compute(&self, ctx: &Context) -> Result<u64, EncodeError> {
        let offsets = offset_bindings(ctx);
        let bindings = ExprBindings {
            vars: ctx.vars.as_map(),
            fields: ctx.fields.as_map(),
            offsets: Some(&offsets),
            val: None,
        };
        let value = self
            .formula
            .eval(&bindings)
            .map_err(|source| EncodeError::Expression { field: self.name.clone(), source })?;
        value.as_u64().ok_or_else(|| EncodeError::FormulaError {
            field: self.name.clone(),
            reason: "calc expression did not evaluate to a non-negative integer".to_string(),
        })
    }
}

/// `ctx.offsets` widened with `packet_len`, the number of bytes written (or,
/// during decode, read) so far — the substrate `calc` formulas use to
/// express "everything between these two points" without a `len(packet)`
/// builtin in the expression host.
fn offset_bindings(ctx: &Context) -> std::collections::HashMap<String, usize> {
    let mut offsets: std::collections::HashMap<String, usize> =
        ctx.offsets.iter().map(|(k, v)| (k.clone(), *v)).collect();
    offsets.insert("packet_len".to_string(), ctx.byte_pos());
    offsets
}

impl Node for CalcNode {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        let raw = ctx.read_bytes(&self.name, self.size)?;
        let read = convert::bytes_to_uint(&raw, self.byte_order);
        ctx.fields.set_path(&self.name, Value::UInt(read));
        Ok(())
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        if ctx.round == 0 {
            ctx.write_bytes(&vec![0u8; self.size])?;
            return Ok(());
        }
        if ctx.round != self.round {
            return Ok(());
        }
        let value = self.compute(ctx)?;
        let bytes = convert::uint_to_bytes(value, self.size, self.byte_order);
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
