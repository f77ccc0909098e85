//! The compiled node tree: one `Node` implementation per
//! schema field kind, composed into `Vec<Box<dyn Node>>` rather than a
//! class hierarchy.

pub mod array;
pub mod bytes;
pub mod calc;
mod if_node;
mod r#struct;
mod switch;

pub use array::ArrayNode;
pub use bytes::BytesNode;
pub use calc::CalcNode;
pub use if_node::IfNode;
pub use r#struct::StructNode;
pub use switch::SwitchNode;

use crate::{
    context::{Context, Flow},
    error::{DecodeError, EncodeError},
};

/// A compiled schema field, able to decode itself from a `Context`'s
/// cursor into `Context::fields`, or encode itself from `Context::fields`
/// into the cursor.
///
/// Implementations must tolerate being driven every encode round; only
/// [`CalcNode`] and a CRC-bearing [`BytesNode`] change behavior across
/// rounds; everything else should early-return once its round-0 work is
/// done while still recursing into any children (so a nested round-gated
/// node keeps seeing accurate node indices).
pub trait Node: std::fmt::Debug + Send + Sync {
    /// Decode this field (and any children) from the cursor.
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError>;
    /// Encode this field (and any children) onto the cursor.
    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError>;
    /// This field's own name.
    fn name(&self) -> &str;
    /// Which pass (`decode`, `encode`, or both) this node is visited on.
    fn flow(&self) -> Flow;
    /// The round this node's final value is committed in encode.
    fn round(&self) -> u32;
    /// Whether this node records its starting offset in
    /// `Context::offsets`.
    fn track_offset(&self) -> bool;
}

/// A compiled node of any kind, used where `Box<dyn Node>` would otherwise
/// be needed but a concrete, matchable type is more convenient (schema
/// compilation diagnostics, tests).
#[derive(Debug)]
pub enum NodeKind {
    /// See [`BytesNode`].
    Bytes(BytesNode),
    /// See [`CalcNode`].
    Calc(CalcNode),
    /// See [`IfNode`].
    If(IfNode),
    /// See [`SwitchNode`].
    Switch(SwitchNode),
    /// See [`ArrayNode`].
    Array(ArrayNode),
    /// See [`StructNode`].
    Struct(StructNode),
}

impl Node for NodeKind {
    fn decode(&self, ctx: &mut Context) -> Result<(), DecodeError> {
        match self {
            Self::Bytes(n) => n.decode(ctx),
            Self::Calc(n) => n.decode(ctx),
            Self::If(n) => n.decode(ctx),
            Self::Switch(n) => n.decode(ctx),
            Self::Array(n) => n.decode(ctx),
            Self::Struct(n) => n.decode(ctx),
        }
    }

    fn encode(&self, ctx: &mut Context) -> Result<(), EncodeError> {
        match self {
            Self::Bytes(n) => n.encode(ctx),
            Self::Calc(n) => n.encode(ctx),
            Self::If(n) => n.encode(ctx),
            Self::Switch(n) => n.encode(ctx),
            Self::Array(n) => n.encode(ctx),
            Self::Struct(n) => n.encode(ctx),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Bytes(n) => n.name(),
            Self::Calc(n) => n.name(),
            Self::If(n) => n.name(),
            Self::Switch(n) => n.name(),
            Self::Array(n) => n.name(),
            Self::Struct(n) => n.name(),
        }
    }

    fn flow(&self) -> Flow {
        match self {
            Self::Bytes(n) => n.flow(),
            Self::Calc(n) => n.flow(),
            Self::If(n) => n.flow(),
            Self::Switch(n) => n.flow(),
            Self::Array(n) => n.flow(),
            Self::Struct(n) => n.flow(),
        }
    }

    fn round(&self) -> u32 {
        match self {
            Self::Bytes(n) => n.round(),
            Self::Calc(n) => n.round(),
            Self::If(n) => n.round(),
            Self::Switch(n) => n.round(),
            Self::Array(n) => n.round(),
            Self::Struct(n) => n.round(),
        }
    }

    fn track_offset(&self) -> bool {
        match self {
            Self::Bytes(n) => n.track_offset(),
            Self::Calc(n) => n.track_offset(),
            Self::If(n) => n.track_offset(),
            Self::Switch(n) => n.track_offset(),
            Self::Array(n) => n.track_offset(),
            Self::Struct(n) => n.track_offset(),
        }
    }
}

/// Decode `node`, handling the shared offset-tracking and visit-order
/// bookkeeping every node kind needs.
pub fn decode_node(node: &dyn Node, ctx: &mut Context) -> Result<(), DecodeError> {
    if !node.flow().matches(ctx.flow) {
        return Ok(());
    }
    if node.track_offset() {
        ctx.record_offset(node.name().to_string());
    }
    ctx.record_node_offset();
    node.decode(ctx)?;
    ctx.advance_node();
    Ok(())
}

/// Encode `node`, handling the shared offset-tracking and visit-order
/// bookkeeping every node kind needs.
///
/// The node offset is recorded before `node.encode` runs, so a `calc` node
/// patching itself on a later round sees the byte position it originally
/// started writing its placeholder at, not the position after.
pub fn encode_node(node: &dyn Node, ctx: &mut Context) -> Result<(), EncodeError> {
    if !node.flow().matches(ctx.flow) {
        return Ok(());
    }
    if ctx.round == 0 {
        if node.track_offset() {
            ctx.record_offset(node.name().to_string());
        }
        ctx.record_node_offset();
    }
    node.encode(ctx)?;
    ctx.advance_node();
    Ok(())
}
