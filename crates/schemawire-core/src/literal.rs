//! Typed literal parser for schema scalars (`header_marker`, `pad_byte`,
//! `default`, ...).
//!
//! A scalar is written `T'DATA'` where `T` selects the radix/encoding of
//! `DATA`; anything not matching that shape is treated as plain hex. The result is always a byte sequence, padded/truncated to `size`
//! when `size >= 0`, or left at its natural length when `size < 0`.

use crate::error::SchemaError;

/// Byte order used to lay out a `d'...'` signed-integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Most significant byte first (the schema default).
    Big,
    /// Least significant byte first.
    Little,
}

/// Parse a typed literal (`h'7273'`, `d'42'`, `s'abc'`, `b'10110'`,
/// `o'17'`, `x'7273'`) into bytes, or fall back to treating `raw` as plain
/// hex if it doesn't match the `T'DATA'` shape.
///
/// `size >= 0` pads (with `0`, on the right) or truncates the result to
/// exactly `size` bytes; `size < 0` keeps the natural length.
pub fn parse_typed_literal(raw: &str, size: i64, endian: Endian) -> Result<Vec<u8>, SchemaError> {
    let bytes = parse_untrimmed(raw, endian)?;
    Ok(resize_literal(bytes, size))
}

fn parse_untrimmed(raw: &str, endian: Endian) -> Result<Vec<u8>, SchemaError> {
    if let Some((tag, data)) = split_tagged(raw) {
        return match tag {
            'b' => parse_radix(data, 2, raw),
            'o' => parse_radix(data, 8, raw),
            'd' => parse_signed_decimal(data, raw, endian),
            'x' | 'h' => parse_hex(data, raw),
            's' => Ok(data.as_bytes().to_vec()),
            _ => parse_hex(raw, raw),
        };
    }
    parse_hex(raw, raw)
}

/// Split `T'DATA'` into its tag and data, if `raw` matches that shape.
fn split_tagged(raw: &str) -> Option<(char, &str)> {
    let mut chars = raw.chars();
    let tag = chars.next()?;
    if !matches!(tag, 'b' | 'o' | 'd' | 'x' | 'h' | 's') {
        return None;
    }
    let rest = chars.as_str();
    let data = rest.strip_prefix('\'')?.strip_suffix('\'')?;
    Some((tag, data))
}

fn parse_radix(data: &str, radix: u32, raw: &str) -> Result<Vec<u8>, SchemaError> {
    let value = u64::from_str_radix(data, radix)
        .map_err(|e| SchemaError::BadLiteral { raw: raw.to_string(), reason: e.to_string() })?;
    Ok(minimal_be_bytes(value))
}

fn parse_signed_decimal(data: &str, raw: &str, endian: Endian) -> Result<Vec<u8>, SchemaError> {
    let value: i64 = data.parse().map_err(|_| SchemaError::BadLiteral {
        raw: raw.to_string(),
        reason: format!("invalid decimal literal {data:?}"),
    })?;
    Ok(match endian {
        Endian::Big => value.to_be_bytes().to_vec(),
        Endian::Little => value.to_le_bytes().to_vec(),
    })
}

fn parse_hex(data: &str, raw: &str) -> Result<Vec<u8>, SchemaError> {
    let data = if data.len() % 2 == 1 { format!("0{data}") } else { data.to_string() };
    (0..data.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&data[i..i + 2], 16)
                .map_err(|e| SchemaError::BadLiteral { raw: raw.to_string(), reason: e.to_string() })
        })
        .collect()
}

fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[first_nonzero..].to_vec()
}

fn resize_literal(mut bytes: Vec<u8>, size: i64) -> Vec<u8> {
    if size < 0 {
        return bytes;
    }
    let size = size as usize;
    if bytes.len() > size {
        bytes.truncate(size);
    } else {
        bytes.resize(size, 0);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_default_no_tag() {
        assert_eq!(parse_typed_literal("7273", -1, Endian::Big).unwrap(), vec![0x72, 0x73]);
    }

    #[test]
    fn explicit_hex_tag() {
        assert_eq!(parse_typed_literal("h'7273'", -1, Endian::Big).unwrap(), vec![0x72, 0x73]);
    }

    #[test]
    fn string_literal() {
        assert_eq!(parse_typed_literal("s'abc'", -1, Endian::Big).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn binary_literal() {
        assert_eq!(parse_typed_literal("b'10110'", -1, Endian::Big).unwrap(), vec![0x16]);
    }

    #[test]
    fn octal_literal() {
        assert_eq!(parse_typed_literal("o'17'", -1, Endian::Big).unwrap(), vec![0x0F]);
    }

    #[test]
    fn decimal_signed_literal() {
        let bytes = parse_typed_literal("d'42'", -1, Endian::Big).unwrap();
        assert_eq!(i64::from_be_bytes(bytes.try_into().unwrap()), 42);
    }

    #[test]
    fn size_pads_on_right() {
        assert_eq!(
            parse_typed_literal("h'72'", 2, Endian::Big).unwrap(),
            vec![0x72, 0x00]
        );
    }

    #[test]
    fn size_truncates() {
        assert_eq!(parse_typed_literal("h'727374'", 2, Endian::Big).unwrap(), vec![0x72, 0x73]);
    }

    #[test]
    fn odd_length_hex_is_left_padded() {
        assert_eq!(parse_typed_literal("7", -1, Endian::Big).unwrap(), vec![0x07]);
    }
}
