//! `if` node: runs a child field list when a condition
//! expression is truthy, otherwise a no-op. A control construct, not a
//! nesting level — the `then` branch writes directly into the enclosing
//! dictionary.

use crate::{
    context::{Context, Flow},
    error::{DecodeError, EncodeError},
    expr::{CompiledExpr, ExprBindings, ExprEvaluator},
    node::{decode_node, encode_node, Node},
};

/// A compiled `if` node.
#[derive(Debug)]
pub struct IfNode {
    name: String,
    flow: Flow,
    condition: CompiledExpr,
    then: Vec<Box<dyn Node>>,
    track_offset: bool,
}

impl IfNode {
    /// Build a node directly from its compiled parts.
    #[must_use]
    pub fn new(
        name: String,
        flow: Flow,
        condition: CompiledExpr,
        then: Vec<Box<dyn Node>>,
        track_offset: bool,
    ) -> Self {
        Self { name, flow, condition, then, track_offset }
    }

    fn branch_is_then(&self, ctx: &Context) -> Result<bool, String> {
        let bindings =
            ExprBindings { vars: ctx.vars.as_map(), fields: ctx.fields.as_map(), offsets: None, val: None };
        let result = self.condition.eval(&bindings).map_err(|e| e.to_string())?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

impl Node for IfNode {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        let is_then = self
            .branch_is_then(ctx)
            .map_err(|reason| DecodeError::Expression {
                field: self.name.clone(),
                source: crate::error::ExpressionError::Eval(reason),
            })?;
        if is_then {
            for child in &self.then {
                decode_node(child.as_ref(), ctx)?;
            }
        }
        Ok(())
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        let is_then = self
            .branch_is_then(ctx)
            .map_err(|reason| EncodeError::Expression {
                field: self.name.clone(),
                source: crate::error::ExpressionError::Eval(reason),
            })?;
        if is_then {
            for child in &self.then {
                encode_node(child.as_ref(), ctx)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn flow(&self) -> Flow {
        self.flow
    }

    fn round(&self) -> u32 {
        0
    }

    fn track_offset(&self) -> bool {
        self.track_offset
    }
}
