//! Byte ↔ value converters shared by `bytes`/`calc` node encode and decode
//!.

use serde::{Deserialize, Serialize};

use crate::{
    error::{DecodeError, EncodeError},
    value::Value,
};

/// Byte order for a `bytes`/`calc` field's integer or float encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Most significant byte first (the schema default).
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

/// Which side of a buffer gets padded when resizing (`pad_position`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadPosition {
    /// Pad bytes go before the value (the value is right-aligned).
    Left,
    /// Pad bytes go after the value (the value is left-aligned). Default.
    #[default]
    Right,
}

/// Read up to 8 bytes as an unsigned integer in the given byte order
///.
pub fn bytes_to_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    debug_assert!(bytes.len() <= 8, "caller must pre-validate size <= 8");
    let mut buf = [0u8; 8];
    match order {
        ByteOrder::Big => buf[8 - bytes.len()..].copy_from_slice(bytes),
        ByteOrder::Little => buf[..bytes.len()].copy_from_slice(bytes),
    }
    match order {
        ByteOrder::Big => u64::from_be_bytes(buf),
        ByteOrder::Little => u64::from_le_bytes(buf),
    }
}

/// Read up to 8 bytes as a sign-extended signed integer.
pub fn bytes_to_int(bytes: &[u8], order: ByteOrder) -> i64 {
    let unsigned = bytes_to_uint(bytes, order);
    let bits = u32::try_from(bytes.len() * 8).unwrap_or(64);
    if bits == 0 || bits >= 64 {
        return unsigned as i64;
    }
    let shift = 64 - bits;
    ((unsigned << shift) as i64) >> shift
}

/// Write a `u64` into exactly `size` bytes in the given byte order.
pub fn uint_to_bytes(value: u64, size: usize, order: ByteOrder) -> Vec<u8> {
    let buf = value.to_be_bytes();
    match order {
        ByteOrder::Big => buf[8 - size..].to_vec(),
        ByteOrder::Little => {
            let mut little = buf[8 - size..].to_vec();
            little.reverse();
            little
        },
    }
}

/// Parse a float from exactly 4 or 8 bytes.
pub fn bytes_to_float(bytes: &[u8], order: ByteOrder) -> Result<f64, DecodeError> {
    match bytes.len() {
        4 => {
            #[allow(clippy::expect_used)]
            let arr: [u8; 4] = bytes.try_into().expect("invariant: match arm guarantees len == 4");
            Ok(f64::from(match order {
                ByteOrder::Big => f32::from_be_bytes(arr),
                ByteOrder::Little => f32::from_le_bytes(arr),
            }))
        },
        8 => {
            #[allow(clippy::expect_used)]
            let arr: [u8; 8] = bytes.try_into().expect("invariant: match arm guarantees len == 8");
            Ok(match order {
                ByteOrder::Big => f64::from_be_bytes(arr),
                ByteOrder::Little => f64::from_le_bytes(arr),
            })
        },
        other => Err(DecodeError::UnsupportedType {
            field: String::new(),
            ty: format!("float(size={other})"),
        }),
    }
}

/// Write a float (4 or 8 bytes) in the given byte order.
pub fn float_to_bytes(value: f64, size: usize, order: ByteOrder) -> Result<Vec<u8>, EncodeError> {
    match size {
        4 => {
            let v = value as f32;
            Ok(match order {
                ByteOrder::Big => v.to_be_bytes().to_vec(),
                ByteOrder::Little => v.to_le_bytes().to_vec(),
            })
        },
        8 => Ok(match order {
            ByteOrder::Big => value.to_be_bytes().to_vec(),
            ByteOrder::Little => value.to_le_bytes().to_vec(),
        }),
        other => Err(EncodeError::TypeMismatch {
            field: String::new(),
            expected: "float(size=4|8)",
            got: format!("size={other}"),
        }),
    }
}

/// Render bytes as uppercase hex (the `hex` wire type's decode shape).
#[must_use]
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}

/// Parse a hex string (case-insensitive) back into bytes.
pub fn hex_to_bytes(s: &str, field: &str) -> Result<Vec<u8>, EncodeError> {
    let s = if s.len() % 2 == 1 { format!("0{s}") } else { s.to_string() };
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "hex",
                got: s.clone(),
            })
        })
        .collect()
}

/// Pad or truncate `buf` to exactly `size` bytes. Truncation always removes from the right; padding is
/// placed per `position`.
#[must_use]
pub fn resize_bytes(buf: &[u8], size: usize, pad_byte: u8, position: PadPosition) -> Vec<u8> {
    if buf.len() >= size {
        return buf[..size].to_vec();
    }
    let pad = vec![pad_byte; size - buf.len()];
    match position {
        PadPosition::Left => {
            let mut out = pad;
            out.extend_from_slice(buf);
            out
        },
        PadPosition::Right => {
            let mut out = buf.to_vec();
            out.extend_from_slice(&pad);
            out
        },
    }
}

/// Coerce a decoded [`Value`] to the raw bytes a `bytes` node should write
/// for its declared `type`, applying padding rules.
pub fn value_to_wire_bytes(
    value: &Value,
    ty: &str,
    size: usize,
    order: ByteOrder,
    pad_byte: u8,
    pad_position: PadPosition,
    field: &str,
) -> Result<Vec<u8>, EncodeError> {
    let raw = match ty {
        "" | "hex" => {
            let s = value.as_str().ok_or_else(|| EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "hex",
                got: describe(value),
            })?;
            hex_to_bytes(s, field)?
        },
        "string" => value
            .as_str()
            .ok_or_else(|| EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "string",
                got: describe(value),
            })?
            .as_bytes()
            .to_vec(),
        "int" | "uint" => {
            let v = value.as_u64().ok_or_else(|| EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: ty,
                got: describe(value),
            })?;
            return Ok(uint_to_bytes(v, size, order));
        },
        "float" => {
            let v = value.as_f64().ok_or_else(|| EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "float",
                got: describe(value),
            })?;
            return float_to_bytes(v, size, order);
        },
        other => {
            return Err(EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "hex|string|int|uint|float",
                got: other.to_string(),
            });
        },
    };
    Ok(resize_bytes(&raw, size, pad_byte, pad_position))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Int(_) => "int".to_string(),
        Value::UInt(_) => "uint".to_string(),
        Value::Float(_) => "float".to_string(),
        Value::Str(_) => "string".to_string(),
        Value::Bytes(_) => "bytes".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::List(_) => "list".to_string(),
        Value::Map(_) => "map".to_string(),
        Value::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_round_trip_big_endian() {
        let bytes = uint_to_bytes(0x1234, 2, ByteOrder::Big);
        assert_eq!(bytes, vec![0x12, 0x34]);
        assert_eq!(bytes_to_uint(&bytes, ByteOrder::Big), 0x1234);
    }

    #[test]
    fn uint_round_trip_little_endian() {
        let bytes = uint_to_bytes(0x1234, 2, ByteOrder::Little);
        assert_eq!(bytes, vec![0x34, 0x12]);
        assert_eq!(bytes_to_uint(&bytes, ByteOrder::Little), 0x1234);
    }

    #[test]
    fn int_sign_extends_from_declared_size() {
        // 0xFF as a 1-byte signed int is -1, not 255.
        assert_eq!(bytes_to_int(&[0xFF], ByteOrder::Big), -1);
        assert_eq!(bytes_to_int(&[0x00, 0xFF], ByteOrder::Big), 255);
    }

    #[test]
    fn hex_round_trip_uppercase() {
        assert_eq!(bytes_to_hex(&[0xAB, 0x01]), "AB01");
        assert_eq!(hex_to_bytes("ab01", "f").unwrap(), vec![0xAB, 0x01]);
    }

    #[test]
    fn resize_pads_right_by_default() {
        assert_eq!(resize_bytes(&[1, 2], 4, 0, PadPosition::Right), vec![1, 2, 0, 0]);
    }

    #[test]
    fn resize_pads_left() {
        assert_eq!(resize_bytes(&[1, 2], 4, 0xFF, PadPosition::Left), vec![0xFF, 0xFF, 1, 2]);
    }

    #[test]
    fn resize_truncates_from_right() {
        assert_eq!(resize_bytes(&[1, 2, 3, 4], 2, 0, PadPosition::Right), vec![1, 2]);
    }

    #[test]
    fn float_rejects_bad_size() {
        assert!(bytes_to_float(&[0, 0, 0], ByteOrder::Big).is_err());
    }

    proptest::proptest! {
        /// `uint_to_bytes`/`bytes_to_uint` round-trip for any value that
        /// fits in the declared byte size, in either byte order.
        #[test]
        fn uint_round_trips_for_any_fitting_value(
            raw: u64,
            size in 1usize..=8,
            big_endian in proptest::prelude::any::<bool>(),
        ) {
            let value = if size >= 8 { raw } else { raw & ((1u64 << (size * 8)) - 1) };
            let order = if big_endian { ByteOrder::Big } else { ByteOrder::Little };
            let bytes = uint_to_bytes(value, size, order);
            proptest::prop_assert_eq!(bytes.len(), size);
            proptest::prop_assert_eq!(bytes_to_uint(&bytes, order), value);
        }
    }
}
