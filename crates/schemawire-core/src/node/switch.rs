//! `switch` node: discriminates between field lists by an
//! expression coerced to `u64`.

use indexmap::IndexMap;

use crate::{
    context::{Context, Flow},
    error::{DecodeError, EncodeError},
    expr::{CompiledExpr, ExprBindings, ExprEvaluator},
    node::{decode_node, encode_node, Node},
};

/// A compiled `switch` node.
#[derive(Debug)]
pub struct SwitchNode {
    name: String,
    flow: Flow,
    discriminator: CompiledExpr,
    cases: IndexMap<u64, Vec<Box<dyn Node>>>,
    default: Option<Vec<Box<dyn Node>>>,
    track_offset: bool,
}

impl SwitchNode {
    /// Build a node directly from its compiled parts.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        flow: Flow,
        discriminator: CompiledExpr,
        cases: IndexMap<u64, Vec<Box<dyn Node>>>,
        default: Option<Vec<Box<dyn Node>>>,
        track_offset: bool,
    ) -> Self {
        Self { name, flow, discriminator, cases, default, track_offset }
    }

    fn discriminate(&self, ctx: &Context) -> Result<u64, String> {
        let bindings =
            ExprBindings { vars: ctx.vars.as_map(), fields: ctx.fields.as_map(), offsets: None, val: None };
        let result = self.discriminator.eval(&bindings).map_err(|e| e.to_string())?;
        result.as_u64().ok_or_else(|| "discriminator did not evaluate to an unsigned integer".to_string())
    }

    fn branch(&self, key: u64) -> Option<&[Box<dyn Node>]> {
        self.cases.get(&key).map(Vec::as_slice).or(self.default.as_deref())
    }
}

impl Node for SwitchNode {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        let key = self.discriminate(ctx).map_err(|reason| DecodeError::Expression {
            field: self.name.clone(),
            source: crate::error::ExpressionError::Eval(reason),
        })?;
        let branch = self
            .branch(key)
            .ok_or_else(|| DecodeError::NoSwitchCase { field: self.name.clone(), value: key.to_string() })?;
        for child in branch {
            decode_node(child.as_ref(), ctx)?;
        }
        Ok(())
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        let key = self.discriminate(ctx).map_err(|reason| EncodeError::Expression {
            field: self.name.clone(),
            source: crate::error::ExpressionError::Eval(reason),
        })?;
        let branch = self.branch(key).ok_or_else(|| EncodeError::FormulaError {
            field: self.name.clone(),
            reason: format!("no switch case matches discriminator value {key}"),
        })?;
        for child in branch {
            encode_node(child.as_ref(), ctx)?;
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
