//! Binary framing: a fixed header marker followed by a
//! length-prefixed body.

use crate::{
    convert::{self, ByteOrder},
    error::FramingError,
};

use super::{FramingResult, FramingRule};

/// A compiled binary framing rule.
#[derive(Debug)]
pub struct BinaryFraming {
    marker: Vec<u8>,
    length_field_offset: usize,
    length_field_size: usize,
    length_byte_order: ByteOrder,
    length_includes_header: bool,
    max_len: usize,
}

impl BinaryFraming {
    /// Build a rule directly from its compiled parts.
    #[must_use]
    pub fn new(
        marker: Vec<u8>,
        length_field_offset: usize,
        length_field_size: usize,
        length_byte_order: ByteOrder,
        length_includes_header: bool,
        max_len: usize,
    ) -> Self {
        Self { marker, length_field_offset, length_field_size, length_byte_order, length_includes_header, max_len }
    }

    fn length_field_end(&self) -> usize {
        self.length_field_offset + self.length_field_size
    }
}

impl FramingRule for BinaryFraming {
    fn scan(&self, buf: &[u8]) -> Result<FramingResult, FramingError> {
        let length_end = self.length_field_end();
        if buf.len() < length_end {
            return Ok(FramingResult::NeedMore { hint: length_end - buf.len() });
        }

        let length_bytes = &buf[self.length_field_offset..length_end];
        let declared = convert::bytes_to_uint(length_bytes, self.length_byte_order);
        let declared = usize::try_from(declared).map_err(|_| FramingError::MalformedLength {
            reason: format!("length field {declared} does not fit in usize"),
        })?;

        let frame_len =
            if self.length_includes_header { declared } else { length_end + declared };

        if frame_len > self.max_len {
            return Err(FramingError::MaxLenExceeded { max_len: self.max_len });
        }
        if frame_len < length_end {
            return Err(FramingError::MalformedLength {
                reason: format!("declared frame length {frame_len} is shorter than the header itself"),
            });
        }

        if buf.len() < frame_len {
            return Ok(FramingResult::NeedMore { hint: frame_len - buf.len() });
        }

        Ok(FramingResult::Token { frame_len, body: 0..frame_len })
    }

    fn header_marker(&self) -> &[u8] {
        &self.marker
    }
}
