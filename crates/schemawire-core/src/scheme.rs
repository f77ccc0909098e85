//! The compiled schema: protocols, each with a framing rule and a root
//! node tree, ready to decode/encode packets.

use crate::{
    compiler::{self, DataStructures},
    error::SchemaError,
    framing::{binary::BinaryFraming, text::TextFraming, FramingRule},
    literal::{self, Endian},
    node::StructNode,
    schema::{FramingSpec, SchemeSpec},
};

/// One compiled protocol: how to recognize its packets in a byte stream,
/// and how to decode/encode their body once framed.
#[derive(Debug)]
pub struct Protocol {
    name: String,
    framing: Box<dyn FramingRule>,
    root: StructNode,
    max_round: u32,
}

impl Protocol {
    /// This protocol's configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled framing rule.
    #[must_use]
    pub fn framing(&self) -> &dyn FramingRule {
        self.framing.as_ref()
    }

    /// The compiled root node tree.
    #[must_use]
    pub fn root(&self) -> &StructNode {
        &self.root
    }

    /// The highest encode round this protocol's `calc` fields declare;
    /// `0` if it has none, meaning a single-pass encode suffices.
    #[must_use]
    pub fn max_round(&self) -> u32 {
        self.max_round
    }
}

/// A fully compiled schema: every protocol's framing rule and node tree,
/// ready to be shared read-only across threads via `Arc<Scheme>`.
#[derive(Debug)]
pub struct Scheme {
    protocols: Vec<Protocol>,
}

impl Scheme {
    /// Compile a [`SchemeSpec`] into an executable [`Scheme`].
    pub fn compile(spec: &SchemeSpec) -> Result<Self, SchemaError> {
        let protocols =
            spec.protocols.iter().map(|p| compile_protocol(p, &spec.data_structures)).collect::<Result<_, _>>()?;
        Ok(Self { protocols })
    }

    /// All compiled protocols, in schema declaration order.
    #[must_use]
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    /// Look up a protocol by name.
    #[must_use]
    pub fn protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols.iter().find(|p| p.name == name)
    }
}

fn compile_protocol(
    spec: &crate::schema::ProtocolSpec,
    data_structures: &DataStructures,
) -> Result<Protocol, SchemaError> {
    let framing = compile_framing(&spec.name, &spec.framing)?;
    let root = compiler::compile_root(&spec.fields, data_structures)?;
    let max_round = compiler::max_round(&spec.fields, data_structures);
    Ok(Protocol { name: spec.name.clone(), framing, root, max_round })
}

fn compile_framing(protocol: &str, spec: &FramingSpec) -> Result<Box<dyn FramingRule>, SchemaError> {
    Ok(match spec {
        FramingSpec::Binary(b) => {
            let marker = literal::parse_typed_literal(&b.header_marker, -1, Endian::Big)?;
            if b.length_field_offset + b.length_field_size < marker.len() {
                return Err(SchemaError::BadFraming {
                    protocol: protocol.to_string(),
                    reason: "length field must not precede the end of the header marker".to_string(),
                });
            }
            Box::new(BinaryFraming::new(
                marker,
                b.length_field_offset,
                b.length_field_size,
                b.length_byte_order,
                b.length_includes_header,
                b.max_len,
            ))
        },
        FramingSpec::Text(t) => {
            let start = literal::parse_typed_literal(&t.start_delimiter, -1, Endian::Big)?;
            let end = literal::parse_typed_literal(&t.end_delimiter, -1, Endian::Big)?;
            Box::new(TextFraming::new(start, end, t.contain_delimiter, t.max_len))
        },
    })
}
