//! `array` node: a homogeneous, repeated field compiled
//! once and replayed for each element.

use crate::{
    context::{Context, Flow},
    error::{DecodeError, EncodeError},
    expr::{CompiledExpr, ExprBindings, ExprEvaluator},
    node::{decode_node, encode_node, Node},
    value::Value,
};

/// How many elements an [`ArrayNode`] decodes.
#[derive(Debug)]
pub enum LengthKind {
    /// A fixed element count.
    Fixed(usize),
    /// An expression evaluated once, yielding an element count.
    Expr(CompiledExpr),
    /// Decode elements until the data is exhausted.
    UntilEof,
}

/// A compiled `array` node.
#[derive(Debug)]
pub struct ArrayNode {
    name: String,
    flow: Flow,
    length: LengthKind,
    item: Box<dyn Node>,
    track_offset: bool,
}

impl ArrayNode {
    /// Build a node directly from its compiled parts.
    #[must_use]
    pub fn new(
        name: String,
        flow: Flow,
        length: LengthKind,
        item: Box<dyn Node>,
        track_offset: bool,
    ) -> Self {
        Self { name, flow, length, item, track_offset }
    }

    fn resolve_count(&self, ctx: &Context) -> Result<Option<usize>, String> {
        match &self.length {
            LengthKind::Fixed(n) => Ok(Some(*n)),
            LengthKind::Expr(expr) => {
                let bindings = ExprBindings {
                    vars: ctx.vars.as_map(),
                    fields: ctx.fields.as_map(),
                    offsets: None,
                    val: None,
                };
                let value = expr.eval(&bindings).map_err(|e| e.to_string())?;
                let n = value.as_i64().ok_or_else(|| "array length expression did not evaluate to an integer".to_string())?;
                Ok(Some(n.max(0) as usize))
            },
            LengthKind::UntilEof => Ok(None),
        }
    }
}

impl Node for ArrayNode {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        let count = self.resolve_count(ctx).map_err(|reason| DecodeError::Expression {
            field: self.name.clone(),
            source: crate::error::ExpressionError::Eval(reason),
        })?;

        let mut items = Vec::new();
        let mut decoded = 0usize;
        loop {
            match count {
                Some(n) if decoded >= n => break,
                None if ctx.remaining() == 0 => break,
                _ => {},
            }
            let saved = std::mem::replace(&mut ctx.fields, Value::empty_map());
            let result = decode_node(self.item.as_ref(), ctx);
            let scope = std::mem::replace(&mut ctx.fields, saved);
            result?;
            let item_value = scope.get_path(self.item.name()).cloned().unwrap_or(Value::Null);
            items.push(item_value);
            decoded += 1;
        }
        ctx.fields.set_path(&self.name, Value::List(items));
        Ok(())
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        // The element count is fixed by the list itself, the same on every
        // round; later rounds only patch nested `calc` placeholders, so
        // each element still needs its own isolated field scope.
        let elements: Vec<Value> = ctx
            .fields
            .get_path(&self.name)
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();

        for element in elements {
            let saved = std::mem::replace(&mut ctx.fields, Value::empty_map());
            ctx.fields.set_path(self.item.name(), element);
            let result = encode_node(self.item.as_ref(), ctx);
            ctx.fields = saved;
            result?;
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
