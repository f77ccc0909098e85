//! Per-call decode/encode state: the bit/byte cursor, the field and variable
//! dictionaries, recorded offsets, and the multi-round encode bookkeeping
//!.

use bytes::{Bytes, BytesMut};
use indexmap::IndexMap;

use crate::{
    error::{DecodeError, EncodeError},
    value::Value,
};

/// Which pass a node is visited on. A `Context` is always `Decode` or
/// `Encode`; a node's own declared flow (`Node::flow`) may additionally be
/// `Both`, matching either context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visited on both decode and encode.
    Both,
    /// Visited on decode only.
    Decode,
    /// Visited on encode only.
    Encode,
}

impl Flow {
    /// Whether a node declaring `self` as its own flow should run in a
    /// context whose flow is `ctx_flow`.
    #[must_use]
    pub fn matches(self, ctx_flow: Flow) -> bool {
        self == Flow::Both || self == ctx_flow
    }
}

/// Mutable state threaded through one decode or encode call.
///
/// A `Context` is built fresh per packet and is not `Sync` — the compiled
/// [`crate::scheme::Scheme`] it walks is what gets shared across threads.
#[derive(Debug)]
pub struct Context {
    data: Option<Bytes>,
    writer: BytesMut,
    byte_pos: usize,
    bit_pos: u8,
    pending_byte: u8,
    pending_bits: u8,

    /// The decoded (or to-be-encoded) field dictionary. Always a
    /// [`Value::Map`].
    pub fields: Value,
    /// Schema-scoped scratch variables, separate from `fields`.
    pub vars: Value,
    /// Named byte offsets recorded by `track_offset` nodes, for CRC ranges
    /// and other position-relative expressions.
    pub offsets: IndexMap<String, usize>,
    /// Which pass this context is driving; `decode_node`/`encode_node`
    /// skip any node whose own declared flow doesn't match.
    pub flow: Flow,
    /// The current encode round (always `0` during decode).
    pub round: u32,
    /// Per-node recorded byte offsets, indexed by visit order within a
    /// round. Populated on round 0, read back by later rounds to locate a
    /// `calc`/CRC field's placeholder for patching.
    pub node_offsets: Vec<usize>,
    /// The visit-order index of the node currently being decoded/encoded,
    /// reset to `0` at the start of every round.
    pub node_index: usize,
}

impl Context {
    /// Build a context over a packet's bytes for decoding.
    #[must_use]
    pub fn for_decode(data: Bytes) -> Self {
        Self {
            data: Some(data),
            writer: BytesMut::new(),
            byte_pos: 0,
            bit_pos: 0,
            pending_byte: 0,
            pending_bits: 0,
            fields: Value::empty_map(),
            vars: Value::empty_map(),
            offsets: IndexMap::new(),
            flow: Flow::Decode,
            round: 0,
            node_offsets: Vec::new(),
            node_index: 0,
        }
    }

    /// Build a context for encoding, starting with an empty output buffer.
    #[must_use]
    pub fn for_encode(fields: Value) -> Self {
        Self {
            data: None,
            writer: BytesMut::new(),
            byte_pos: 0,
            bit_pos: 0,
            pending_byte: 0,
            pending_bits: 0,
            fields,
            vars: Value::empty_map(),
            offsets: IndexMap::new(),
            flow: Flow::Encode,
            round: 0,
            node_offsets: Vec::new(),
            node_index: 0,
        }
    }

    /// Current byte offset of the cursor.
    #[must_use]
    pub fn byte_pos(&self) -> usize {
        self.byte_pos
    }

    /// Bytes available to read past the current cursor (decode mode only).
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len().saturating_sub(self.byte_pos))
    }

    /// The bytes written so far, or decoded so far: after encode round 0
    /// this is the full placeholder-populated packet, available for later
    /// rounds to read back (a `calc` field covering an earlier range, for
    /// instance) before it's patched in place.
    #[must_use]
    pub fn snapshot(&self) -> Bytes {
        match &self.data {
            Some(d) => d.clone(),
            None => Bytes::copy_from_slice(&self.writer),
        }
    }

    /// Read exactly `n` bytes and advance the cursor. Requires `bit_pos` to
    /// be byte-aligned.
    pub fn read_bytes(&mut self, field: &str, n: usize) -> Result<Bytes, DecodeError> {
        if self.bit_pos != 0 {
            return Err(DecodeError::MisalignedRead { field: field.to_string() });
        }
        let data = self.data.as_ref().ok_or_else(|| DecodeError::UnexpectedEof {
            field: field.to_string(),
            need: n,
            have: 0,
        })?;
        if self.byte_pos + n > data.len() {
            return Err(DecodeError::UnexpectedEof {
                field: field.to_string(),
                need: n,
                have: data.len() - self.byte_pos,
            });
        }
        let slice = data.slice(self.byte_pos..self.byte_pos + n);
        self.byte_pos += n;
        Ok(slice)
    }

    /// Read `bits` bits (at most 64), MSB-first, advancing across byte
    /// boundaries as needed.
    pub fn read_bits(&mut self, field: &str, bits: u32) -> Result<u64, DecodeError> {
        if bits > 64 {
            return Err(DecodeError::BitFieldTooLarge { field: field.to_string(), bits });
        }
        let data = self.data.as_ref().ok_or_else(|| DecodeError::UnexpectedEof {
            field: field.to_string(),
            need: 1,
            have: 0,
        })?;
        let mut result: u64 = 0;
        let mut remaining = bits;
        while remaining > 0 {
            if self.byte_pos >= data.len() {
                return Err(DecodeError::UnexpectedEof { field: field.to_string(), need: 1, have: 0 });
            }
            let byte = data[self.byte_pos];
            let bits_left_in_byte = 8 - self.bit_pos;
            let take = remaining.min(u32::from(bits_left_in_byte));
            let shift = bits_left_in_byte - take as u8;
            let mask: u8 = if take == 8 { 0xFF } else { ((1u16 << take) - 1) as u8 };
            let chunk = (byte >> shift) & mask;
            result = (result << take) | u64::from(chunk);
            remaining -= take;
            self.bit_pos += take as u8;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }
        Ok(result)
    }

    /// Append bytes to the output buffer. Requires the bit writer to be
    /// flushed (byte-aligned) — schema compilation rejects bit fields that
    /// straddle a structured node boundary, so this
    /// never fires on a well-formed compiled tree.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        debug_assert_eq!(self.pending_bits, 0, "bit writer must be flushed before a byte write");
        self.writer.extend_from_slice(bytes);
        self.byte_pos += bytes.len();
        Ok(())
    }

    /// Append `bits` bits (at most 64) of `value`, MSB-first, buffering a
    /// partial byte until it fills.
    pub fn write_bits(&mut self, value: u64, bits: u32) {
        for i in (0..bits).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.pending_byte = (self.pending_byte << 1) | bit;
            self.pending_bits += 1;
            if self.pending_bits == 8 {
                self.writer.extend_from_slice(&[self.pending_byte]);
                self.byte_pos += 1;
                self.pending_byte = 0;
                self.pending_bits = 0;
            }
        }
    }

    /// Overwrite `bytes.len()` bytes at an already-written offset, the
    /// round `>0` patch path for `calc`/CRC placeholders.
    pub fn patch_bytes(&mut self, at: usize, bytes: &[u8]) {
        self.writer[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// Record that the node at `node_index` starts at the current byte
    /// offset, growing `node_offsets` if this is its first visit (round 0).
    pub fn record_node_offset(&mut self) {
        let idx = self.node_index;
        if idx == self.node_offsets.len() {
            self.node_offsets.push(self.byte_pos);
        } else {
            self.node_offsets[idx] = self.byte_pos;
        }
    }

    /// The offset recorded for the node at `node_index`, if any round has
    /// visited it yet.
    #[must_use]
    pub fn current_node_offset(&self) -> Option<usize> {
        self.node_offsets.get(self.node_index).copied()
    }

    /// Advance to the next node in visit order.
    pub fn advance_node(&mut self) {
        self.node_index += 1;
    }

    /// Reset the visit-order cursor at the start of a new round, keeping
    /// the recorded offsets from round 0.
    pub fn begin_round(&mut self, round: u32) {
        self.round = round;
        self.node_index = 0;
        if round > 0 && self.data.is_none() {
            self.data = Some(Bytes::copy_from_slice(&self.writer));
        }
    }

    /// Record a named offset (CRC ranges, length back-references).
    pub fn record_offset(&mut self, name: impl Into<String>) {
        self.offsets.insert(name.into(), self.byte_pos);
    }

    /// The output buffer accumulated so far, consumed once encoding is
    /// complete.
    #[must_use]
    pub fn into_output(self) -> Bytes {
        self.writer.freeze()
    }
}
