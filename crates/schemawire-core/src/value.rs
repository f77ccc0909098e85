//! Dynamic value type for the field dictionary, `vars`, and expression
//! results.
//!
//! The schema's values range over a small, closed set of shapes: integers,
//! unsigned integers, floats, strings, raw bytes, booleans, ordered lists and
//! nested maps. We keep
//! field order on decode (array items, struct members) using `IndexMap`
//! rather than `HashMap`, so snapshot tests and re-encoding see the same
//! order the wire did.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered, string-keyed map of [`Value`]s.
///
/// This is the concrete type backing `Context::fields`, `Context::vars`, and
/// any `struct`/`array` sub-dictionary.
pub type ValueMap = IndexMap<String, Value>;

/// A dynamically-typed value produced by decode, consumed by encode, or
/// returned from a compiled expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A signed integer (the `int` field type, or an expression result).
    Int(i64),
    /// An unsigned integer (the `uint` field type, CRC results, sizes).
    UInt(u64),
    /// A floating point number (the `float` field type).
    Float(f64),
    /// A UTF-8 string (the `string` field type, or hex digits for `hex`).
    Str(String),
    /// Raw bytes (the `bytes`/default field shape, or a `default` literal).
    Bytes(Vec<u8>),
    /// A boolean (`check` / `condition` expression results).
    Bool(bool),
    /// An ordered list (the decoded items of an `array` node).
    List(Vec<Value>),
    /// A nested, ordered map (the decoded children of `struct`/`switch`/`if`).
    Map(ValueMap),
    /// The absence of a value (an unset optional field).
    Null,
}

impl Value {
    /// Construct an empty map value, the root shape of `Context::fields`.
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(ValueMap::new())
    }

    /// View this value as `i64`, widening `UInt` when it fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// View this value as `u64`, the type switch-case discrimination and
    /// sizes are coerced to.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Float(v) if *v >= 0.0 => Some(*v as u64),
            Self::Bool(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    /// View this value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// View this value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// View this value as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// View this value as a bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// View this value as a nested map.
    #[must_use]
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable view of this value as a nested map, if it is one.
    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// View this value as an ordered list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Set `name` (a dot-separated path) to `value` inside this map,
    /// creating intermediate maps as needed.
    ///
    /// An empty `name` is a no-op.
    /// An intermediate path segment whose existing value isn't a map is
    /// overwritten with a fresh map so the descent can continue.
    pub fn set_path(&mut self, name: &str, value: Value) {
        if name.is_empty() {
            return;
        }
        let Some(map) = self.as_map_mut() else { return };
        set_path_in(map, name, value);
    }

    /// Get the value at a dot-separated path, if the whole path resolves.
    #[must_use]
    pub fn get_path(&self, name: &str) -> Option<&Value> {
        if name.is_empty() {
            return Some(self);
        }
        let mut current = self.as_map()?;
        let mut parts = name.split('.').peekable();
        while let Some(part) = parts.next() {
            let next = current.get(part)?;
            if parts.peek().is_none() {
                return Some(next);
            }
            current = next.as_map()?;
        }
        None
    }
}

fn set_path_in(map: &mut ValueMap, name: &str, value: Value) {
    let mut parts = name.split('.').peekable();
    let mut current = map;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current.entry(part.to_string()).or_insert_with(Value::empty_map);
        if entry.as_map().is_none() {
            *entry = Value::empty_map();
        }
        #[allow(clippy::expect_used)]
        {
            current = entry.as_map_mut().expect("invariant: entry was just normalized to Map above");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_path_creates_intermediate_maps() {
        let mut root = Value::empty_map();
        root.set_path("a.b.c", Value::UInt(42));
        assert_eq!(root.get_path("a.b.c"), Some(&Value::UInt(42)));
    }

    #[test]
    fn set_path_overwrites_non_map_intermediate() {
        let mut root = Value::empty_map();
        root.set_path("a", Value::Int(1));
        root.set_path("a.b", Value::Int(2));
        assert_eq!(root.get_path("a.b"), Some(&Value::Int(2)));
    }

    #[test]
    fn set_path_empty_name_is_noop() {
        let mut root = Value::empty_map();
        root.set_path("", Value::Int(1));
        assert_eq!(root.as_map().map(IndexMap::len), Some(0));
    }

    #[test]
    fn get_path_missing_returns_none() {
        let root = Value::empty_map();
        assert_eq!(root.get_path("missing"), None);
    }

    #[test]
    fn as_u64_coerces_bool_and_int() {
        assert_eq!(Value::Bool(true).as_u64(), Some(1));
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Int(5).as_u64(), Some(5));
    }
}
