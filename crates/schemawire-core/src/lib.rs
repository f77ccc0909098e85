//! A declarative, schema-driven codec engine for framed binary and text
//! protocols.
//!
//! A [`schema::SchemeSpec`] compiles (via [`scheme::Scheme::compile`]) into
//! an executable node tree. [`codec::Codec`] then decodes bytes into a
//! [`value::Value`] field dictionary, encodes a field dictionary back into
//! bytes across however many rounds its `calc` fields need, and scans a
//! byte stream for frame boundaries across however many protocols the
//! scheme declares.

pub mod compiler;
pub mod context;
pub mod convert;
pub mod crc;
pub mod codec;
pub mod error;
pub mod expr;
pub mod framing;
pub mod history;
pub mod literal;
pub mod node;
pub mod schema;
pub mod scheme;
pub mod value;

pub use codec::{Codec, ScanOutcome};
pub use context::Context;
pub use error::CodecError;
pub use scheme::{Protocol, Scheme};
pub use value::{Value, ValueMap};
