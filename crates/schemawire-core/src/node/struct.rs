//! `struct` node: a nested, named group of fields,
//! written as a sub-map under its own key.

use crate::{
    context::{Context, Flow},
    error::{DecodeError, EncodeError},
    node::{decode_node, encode_node, Node},
    value::Value,
};

/// A compiled `struct` node.
#[derive(Debug)]
pub struct StructNode {
    name: String,
    flow: Flow,
    fields: Vec<Box<dyn Node>>,
    /// When `true`, this struct's fields are written directly into the
    /// enclosing dictionary instead of a sub-map — the shape a `ref`
    /// expansion and a protocol's root struct both need.
    inline: bool,
    track_offset: bool,
}

impl StructNode {
    /// Build a node directly from its compiled parts.
    #[must_use]
    pub fn new(
        name: String,
        flow: Flow,
        fields: Vec<Box<dyn Node>>,
        inline: bool,
        track_offset: bool,
    ) -> Self {
        Self { name, flow, fields, inline, track_offset }
    }
}

impl Node for StructNode {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        if self.inline {
            for child in &self.fields {
                decode_node(child.as_ref(), ctx)?;
            }
            return Ok(());
        }

        let saved = std::mem::replace(&mut ctx.fields, Value::empty_map());
        let result = (|| {
            for child in &self.fields {
                decode_node(child.as_ref(), ctx)?;
            }
            Ok(())
        })();
        let scope = std::mem::replace(&mut ctx.fields, saved);
        result?;
        ctx.fields.set_path(&self.name, scope);
        Ok(())
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        if self.inline {
            for child in &self.fields {
                encode_node(child.as_ref(), ctx)?;
            }
            return Ok(());
        }

        let scope = ctx.fields.get_path(&self.name).cloned().unwrap_or_else(Value::empty_map);
        let saved = std::mem::replace(&mut ctx.fields, scope);
        let result = (|| {
            for child in &self.fields {
                encode_node(child.as_ref(), ctx)?;
            }
            Ok(())
        })();
        ctx.fields = saved;
        result
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
