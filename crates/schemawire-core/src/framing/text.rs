//! Text framing: delimiter-bounded packets.

use crate::error::FramingError;

use super::{FramingResult, FramingRule};

/// A compiled text framing rule.
#[derive(Debug)]
pub struct TextFraming {
    start_delimiter: Vec<u8>,
    end_delimiter: Vec<u8>,
    contain_delimiter: bool,
    max_len: usize,
}

impl TextFraming {
    /// Build a rule directly from its compiled parts.
    #[must_use]
    pub fn new(
        start_delimiter: Vec<u8>,
        end_delimiter: Vec<u8>,
        contain_delimiter: bool,
        max_len: usize,
    ) -> Self {
        Self { start_delimiter, end_delimiter, contain_delimiter, max_len }
    }
}

impl FramingRule for TextFraming {
    fn scan(&self, buf: &[u8]) -> Result<FramingResult, FramingError> {
        let search_from = self.start_delimiter.len();
        let Some(end_at) = find_subslice(&buf[search_from.min(buf.len())..], &self.end_delimiter) else {
            return Ok(if buf.len() > self.max_len {
                FramingResult::Abandon { count: 1 }
            } else {
                FramingResult::NeedMore { hint: 0 }
            });
        };
        let end_at = search_from + end_at;
        let frame_len = end_at + self.end_delimiter.len();

        if frame_len > self.max_len {
            return Err(FramingError::MaxLenExceeded { max_len: self.max_len });
        }

        // When `contain_delimiter` is false, the body is re-anchored past
        // the start delimiter rather than including it, so callers that
        // exclude delimiters from their node tree still see correct
        // offsets on repeated scans of the same buffer.
        let body = if self.contain_delimiter { 0..frame_len } else { search_from..frame_len };

        Ok(FramingResult::Token { frame_len, body })
    }

    fn header_marker(&self) -> &[u8] {
        &self.start_delimiter
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(contain: bool) -> TextFraming {
        TextFraming::new(b"<<".to_vec(), b">>".to_vec(), contain, 256)
    }

    #[test]
    fn waits_for_end_delimiter() {
        let r = rule(true);
        assert_eq!(r.scan(b"<<hello").unwrap(), FramingResult::NeedMore { hint: 0 });
    }

    #[test]
    fn returns_full_frame_when_contain_delimiter() {
        let r = rule(true);
        let buf = b"<<hi>>";
        assert_eq!(r.scan(buf).unwrap(), FramingResult::Token { frame_len: 6, body: 0..6 });
    }

    #[test]
    fn re_anchors_without_trimming_end_when_contain_delimiter_false() {
        let r = rule(false);
        let buf = b"<<hi>>";
        assert_eq!(r.scan(buf).unwrap(), FramingResult::Token { frame_len: 6, body: 2..6 });
    }

    #[test]
    fn header_marker_matches_start_delimiter() {
        let r = rule(true);
        assert_eq!(r.header_marker(), b"<<");
    }

    #[test]
    fn abandons_one_byte_when_no_end_delimiter_fits_before_max_len() {
        let r = TextFraming::new(b"<<".to_vec(), b">>".to_vec(), true, 3);
        let buf = b"<<hi";
        assert_eq!(r.scan(buf).unwrap(), FramingResult::Abandon { count: 1 });
    }
}
