//! Expression evaluator contract and its `evalexpr`-backed implementation
//!.
//!
//! A schema expression is compiled once, at schema-compile time, and
//! evaluated once per node visit against four bindings: `vars` and `fields`
//! (the in-progress dictionaries), `offsets` (byte offsets recorded for
//! earlier nodes), and `val` (the node's own just-decoded value, where
//! applicable). The evaluator itself — arithmetic, comparisons, boolean
//! logic — is not something this crate implements; `evalexpr` supplies it.

use std::collections::HashMap;

use evalexpr::{ContextWithMutableVariables, EvalexprError, HashMapContext, Node};

use crate::{
    error::ExpressionError,
    value::{Value, ValueMap},
};

/// The four bindings an expression may reference.
#[derive(Debug, Default)]
pub struct ExprBindings<'a> {
    /// The in-progress `vars` dictionary.
    pub vars: Option<&'a ValueMap>,
    /// The in-progress `fields` dictionary.
    pub fields: Option<&'a ValueMap>,
    /// Recorded byte offsets of earlier, offset-tracking nodes.
    pub offsets: Option<&'a HashMap<String, usize>>,
    /// The current node's own value, for `check`/size-of-self expressions.
    pub val: Option<&'a Value>,
}

/// A compiled, reusable expression handle.
///
/// Implementors must support being compiled once and evaluated many times
/// with different bindings, and must be safe to share across threads
/// (the compiled `Scheme` that owns these is `Send + Sync`).
pub trait ExprEvaluator: std::fmt::Debug + Send + Sync {
    /// Evaluate the expression against the given bindings.
    fn eval(&self, bindings: &ExprBindings<'_>) -> Result<Value, ExpressionError>;
}

/// An expression compiled by [`compile`], backed by `evalexpr`.
#[derive(Debug)]
pub struct CompiledExpr {
    node: Node,
    source: String,
}

/// Compile `source` into a reusable expression handle.
pub fn compile(source: &str) -> Result<CompiledExpr, ExpressionError> {
    let node = evalexpr::build_operator_tree(source)
        .map_err(|e: EvalexprError| ExpressionError::Compile(e.to_string()))?;
    Ok(CompiledExpr { node, source: source.to_string() })
}

impl ExprEvaluator for CompiledExpr {
    fn eval(&self, bindings: &ExprBindings<'_>) -> Result<Value, ExpressionError> {
        let mut ctx = HashMapContext::new();
        bind_map(&mut ctx, "vars", bindings.vars)?;
        bind_map(&mut ctx, "fields", bindings.fields)?;
        if let Some(offsets) = bindings.offsets {
            for (name, offset) in offsets {
                ctx.set_value(
                    format!("offsets.{name}"),
                    evalexpr::Value::Int(i64::try_from(*offset).unwrap_or(i64::MAX)),
                )
                .map_err(|e| ExpressionError::Eval(e.to_string()))?;
            }
        }
        if let Some(val) = bindings.val {
            ctx.set_value("val".to_string(), to_evalexpr_value(val))
                .map_err(|e| ExpressionError::Eval(e.to_string()))?;
        }

        let result = self
            .node
            .eval_with_context(&ctx)
            .map_err(|e| ExpressionError::Eval(format!("{}: {e}", self.source)))?;
        from_evalexpr_value(&result)
    }
}

fn bind_map(
    ctx: &mut HashMapContext,
    prefix: &str,
    map: Option<&ValueMap>,
) -> Result<(), ExpressionError> {
    let Some(map) = map else { return Ok(()) };
    for (name, value) in map {
        ctx.set_value(format!("{prefix}.{name}"), to_evalexpr_value(value))
            .map_err(|e| ExpressionError::Eval(e.to_string()))?;
    }
    Ok(())
}

fn to_evalexpr_value(value: &Value) -> evalexpr::Value {
    match value {
        Value::Int(v) => evalexpr::Value::Int(*v),
        Value::UInt(v) => evalexpr::Value::Int(i64::try_from(*v).unwrap_or(i64::MAX)),
        Value::Float(v) => evalexpr::Value::Float(*v),
        Value::Str(v) => evalexpr::Value::String(v.clone()),
        Value::Bool(v) => evalexpr::Value::Boolean(*v),
        Value::Bytes(v) => {
            evalexpr::Value::Tuple(v.iter().map(|b| evalexpr::Value::Int(i64::from(*b))).collect())
        },
        Value::List(v) => evalexpr::Value::Tuple(v.iter().map(to_evalexpr_value).collect()),
        Value::Map(_) | Value::Null => evalexpr::Value::Empty,
    }
}

fn from_evalexpr_value(value: &evalexpr::Value) -> Result<Value, ExpressionError> {
    Ok(match value {
        evalexpr::Value::Int(v) => Value::Int(*v),
        evalexpr::Value::Float(v) => Value::Float(*v),
        evalexpr::Value::Boolean(v) => Value::Bool(*v),
        evalexpr::Value::String(v) => Value::Str(v.clone()),
        evalexpr::Value::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_evalexpr_value(item)?);
            }
            Value::List(out)
        },
        evalexpr::Value::Empty => Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    #[test]
    fn arithmetic_over_fields() {
        let expr = compile("fields.header_len + fields.payload_len").unwrap();
        let mut fields = IndexMap::new();
        fields.insert("header_len".to_string(), Value::Int(4));
        fields.insert("payload_len".to_string(), Value::Int(10));
        let bindings = ExprBindings { fields: Some(&fields), ..Default::default() };
        assert_eq!(expr.eval(&bindings).unwrap(), Value::Int(14));
    }

    #[test]
    fn comparison_over_val() {
        let expr = compile("val > 0").unwrap();
        let val = Value::Int(5);
        let bindings = ExprBindings { val: Some(&val), ..Default::default() };
        assert_eq!(expr.eval(&bindings).unwrap(), Value::Bool(true));
    }

    #[test]
    fn offsets_binding_resolves() {
        let expr = compile("offsets.crc_start").unwrap();
        let mut offsets = HashMap::new();
        offsets.insert("crc_start".to_string(), 6usize);
        let bindings = ExprBindings { offsets: Some(&offsets), ..Default::default() };
        assert_eq!(expr.eval(&bindings).unwrap(), Value::Int(6));
    }

    #[test]
    fn compile_error_is_reported() {
        assert!(compile("fields. +").is_err());
    }
}
