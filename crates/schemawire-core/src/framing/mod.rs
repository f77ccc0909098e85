//! Stream framing rules: recognize packet boundaries in an
//! accumulating byte buffer, independent of the node tree that later
//! decodes the framed bytes.

pub mod binary;
pub mod text;

use std::ops::Range;

use crate::error::FramingError;

/// The outcome of scanning an accumulated buffer for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingResult {
    /// Not enough bytes buffered yet to tell. `hint` is a best-effort
    /// estimate of how many more bytes would help, `0` if unknown.
    NeedMore {
        /// Estimated additional bytes needed.
        hint: usize,
    },
    /// A complete frame was found. `frame_len` is how many bytes to
    /// consume from the buffer; `body` is the sub-range the caller should
    /// hand to the node tree (which may differ from `0..frame_len`, see
    /// [`text::TextFraming`]'s `contain_delimiter` behavior).
    Token {
        /// Total bytes this frame consumes from the stream.
        frame_len: usize,
        /// The byte range within the buffer representing the frame body.
        body: Range<usize>,
    },
    /// `count` leading bytes are garbage (no valid frame can start there)
    /// and should be dropped before scanning again.
    Abandon {
        /// Leading byte count to discard.
        count: usize,
    },
}

/// A protocol's packet-boundary recognizer, shared across threads via the
/// compiled `Scheme`.
pub trait FramingRule: std::fmt::Debug + Send + Sync {
    /// Scan `buf` for the next frame. The `Codec`'s splitter only calls
    /// this once `buf` already starts with `header_marker()`; a rule never
    /// has to search for its own marker.
    fn scan(&self, buf: &[u8]) -> Result<FramingResult, FramingError>;

    /// The bytes identifying this protocol's packets, checked by the
    /// `Codec` before dispatching to `scan`.
    fn header_marker(&self) -> &[u8];
}
