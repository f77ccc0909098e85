//! The protocol-agnostic entry point: encode a field dictionary into bytes
//! for a chosen protocol, or scan an incoming byte stream and dispatch
//! each recognized frame to its protocol's node tree.

use std::{io::Read, sync::Arc};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{
    context::Context,
    error::{CodecError, DecodeError},
    framing::{FramingResult, FramingRule},
    history::{History, HistoryEntry},
    node::Node,
    scheme::{Protocol, Scheme},
    value::Value,
};

const READ_CHUNK: usize = 4096;

/// One outcome of scanning a byte stream, delivered per recognized frame
/// or per dropped garbage run.
#[derive(Debug)]
pub enum ScanOutcome {
    /// A frame was recognized and decoded successfully.
    Packet {
        /// Which protocol matched.
        protocol: String,
        /// The decoded field dictionary.
        fields: Value,
    },
    /// A frame was recognized but its body failed to decode (a CRC
    /// mismatch, a failed `check`, ...). Scanning continues past it.
    DecodeFailed {
        /// Which protocol matched the framing.
        protocol: String,
        /// Why decoding failed.
        error: DecodeError,
    },
    /// Leading bytes were dropped because no protocol's framing rule
    /// could start a frame there.
    Abandoned {
        /// How many bytes were dropped.
        count: usize,
    },
}

/// Encodes field dictionaries and scans byte streams against a compiled
/// [`Scheme`].
#[derive(Debug)]
pub struct Codec {
    scheme: Arc<Scheme>,
    history: History,
}

impl Codec {
    /// Build a codec over a compiled, shareable scheme.
    #[must_use]
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self { scheme, history: History::new() }
    }

    /// The debug history ring of recent decode/encode outcomes. Lossy and not linearizable; for inspection only.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Encode `fields` for `protocol` (or the scheme's first protocol when
    /// `None`), running the full multi-round placeholder-then-patch
    /// sequence.
    pub fn encode(&self, fields: &Value, protocol: Option<&str>) -> Result<Bytes, CodecError> {
        let protocol = match protocol {
            Some(name) => {
                self.scheme.protocol(name).ok_or_else(|| CodecError::UnknownProtocol(name.to_string()))?
            },
            None => self.scheme.protocols().first().ok_or(CodecError::NoProtocols)?,
        };

        let mut ctx = Context::for_encode(fields.clone());
        ctx.begin_round(0);
        protocol.root().encode(&mut ctx)?;
        trace!(protocol = protocol.name(), bytes = ctx.byte_pos(), "encode round 0 complete");

        for round in 1..=protocol.max_round() {
            ctx.begin_round(round);
            protocol.root().encode(&mut ctx)?;
            trace!(protocol = protocol.name(), round, "encode round complete");
        }

        let output = ctx.into_output();
        self.history.push(HistoryEntry {
            protocol: Some(protocol.name().to_string()),
            ok: true,
            summary: format!("encoded {} bytes", output.len()),
            fields: Some(fields.clone()),
        });
        Ok(output)
    }

    /// Scan `reader` for frames, invoking `handler` once per recognized
    /// frame or dropped garbage run. I/O errors from `reader` stop the
    /// scan and propagate; a single frame's decode failure does not.
    pub fn scan<R: Read>(
        &self,
        mut reader: R,
        mut handler: impl FnMut(ScanOutcome),
    ) -> Result<(), CodecError> {
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            loop {
                match self.scan_once(&buf) {
                    ScanStep::Token { protocol, frame_len, body } => {
                        let frame = Bytes::copy_from_slice(&buf[body]);
                        self.dispatch(protocol, frame, &mut handler);
                        buf.drain(..frame_len);
                    },
                    ScanStep::Abandon { count } => {
                        warn!(count, "abandoning unrecognized bytes");
                        handler(ScanOutcome::Abandoned { count });
                        buf.drain(..count);
                    },
                    ScanStep::NeedMore => break,
                }
            }

            let read = reader.read(&mut chunk)?;
            if read == 0 {
                debug!(remaining = buf.len(), "stream ended");
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// The splitter: find the first protocol (in scheme order) whose
    /// header marker prefixes `buf` and hand the buffer to its framing
    /// rule. If none matches, exactly one dirty byte is abandoned — never
    /// a whole run at once, so garbage in front of a valid marker is
    /// dropped one byte at a time.
    fn scan_once(&self, buf: &[u8]) -> ScanStep<'_> {
        if buf.is_empty() {
            return ScanStep::NeedMore;
        }

        for protocol in self.scheme.protocols() {
            let marker = protocol.framing().header_marker();
            if marker.is_empty() || !buf.starts_with(marker) {
                continue;
            }
            return match protocol.framing().scan(buf) {
                Ok(FramingResult::Token { frame_len, body }) => ScanStep::Token { protocol, frame_len, body },
                Ok(FramingResult::NeedMore { .. }) => ScanStep::NeedMore,
                Ok(FramingResult::Abandon { count }) => ScanStep::Abandon { count: count.max(1) },
                Err(error) => {
                    warn!(protocol = protocol.name(), %error, "framing rule rejected buffered bytes");
                    ScanStep::Abandon { count: 1 }
                },
            };
        }

        ScanStep::Abandon { count: 1 }
    }

    fn dispatch(&self, protocol: &Protocol, frame: Bytes, handler: &mut impl FnMut(ScanOutcome)) {
        let mut ctx = Context::for_decode(frame);
        match protocol.root().decode(&mut ctx) {
            Ok(()) => {
                debug!(protocol = protocol.name(), "decoded frame");
                self.history.push(HistoryEntry {
                    protocol: Some(protocol.name().to_string()),
                    ok: true,
                    summary: "decoded".to_string(),
                    fields: Some(ctx.fields.clone()),
                });
                handler(ScanOutcome::Packet { protocol: protocol.name().to_string(), fields: ctx.fields });
            },
            Err(error) => {
                warn!(protocol = protocol.name(), %error, "frame failed to decode");
                self.history.push(HistoryEntry {
                    protocol: Some(protocol.name().to_string()),
                    ok: false,
                    summary: error.to_string(),
                    fields: None,
                });
                handler(ScanOutcome::DecodeFailed { protocol: protocol.name().to_string(), error });
            },
        }
    }
}

enum ScanStep<'p> {
    Token { protocol: &'p Protocol, frame_len: usize, body: std::ops::Range<usize> },
    Abandon { count: usize },
    NeedMore,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use indexmap::IndexMap;

    use super::*;
    use crate::{
        convert::PadPosition,
        schema::{BytesSpec, FieldSpec, FlowSpec, ProtocolSpec, SchemeSpec, SizeSpec, TextFramingSpec},
        value::ValueMap,
    };

    fn hex_default(name: &str, default: &str) -> FieldSpec {
        FieldSpec::Bytes(BytesSpec {
            name: name.to_string(),
            flow: FlowSpec::Both,
            round: 0,
            track_offset: false,
            wire_type: "hex".to_string(),
            size: SizeSpec::Bytes(1),
            byte_order: crate::convert::ByteOrder::Big,
            pad_byte: 0,
            pad_position: PadPosition::Right,
            default: Some(default.to_string()),
            check: None,
            crc: None,
        })
    }

    /// A single-byte-delimited, single-field text protocol, just large
    /// enough to exercise `Codec::encode`/`Codec::scan` without any of the
    /// multi-round `calc` machinery the `schemawire-harness` fixtures cover.
    fn ping_codec() -> Codec {
        let fields = vec![
            hex_default("start", "3c"),
            FieldSpec::Bytes(BytesSpec {
                name: "value".to_string(),
                flow: FlowSpec::Both,
                round: 0,
                track_offset: false,
                wire_type: "uint".to_string(),
                size: SizeSpec::Bytes(1),
                byte_order: crate::convert::ByteOrder::Big,
                pad_byte: 0,
                pad_position: PadPosition::Right,
                default: None,
                check: None,
                crc: None,
            }),
            hex_default("end", "3e"),
        ];
        let framing = crate::schema::FramingSpec::Text(TextFramingSpec {
            start_delimiter: "s'<'".to_string(),
            end_delimiter: "s'>'".to_string(),
            contain_delimiter: true,
            max_len: 64,
        });
        let spec = SchemeSpec {
            data_structures: IndexMap::new(),
            protocols: vec![ProtocolSpec { name: "ping".to_string(), framing, fields }],
        };
        let scheme = Scheme::compile(&spec).expect("ping schema compiles");
        Codec::new(Arc::new(scheme))
    }

    #[test]
    fn encodes_and_scans_a_minimal_text_frame() {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();

        let mut fields = ValueMap::new();
        fields.insert("value".to_string(), Value::UInt(7));
        let codec = ping_codec();
        let packet = codec.encode(&Value::Map(fields), Some("ping")).expect("encodes");
        assert_eq!(packet.as_ref(), b"<\x07>");

        let mut outcomes = Vec::new();
        codec.scan(Cursor::new(packet.to_vec()), |o| outcomes.push(o)).expect("scan succeeds");
        assert_eq!(outcomes.len(), 1);
        let ScanOutcome::Packet { fields, .. } = &outcomes[0] else {
            panic!("expected a decoded packet, got {:?}", outcomes[0]);
        };
        assert_eq!(fields.get_path("value"), Some(&Value::UInt(7)));

        let snapshot = codec.history().snapshot();
        assert_eq!(snapshot.len(), 2, "one encode entry, one decode entry");
    }

    proptest::proptest! {
        /// Any one-byte value round-trips through encode, then scan+decode,
        /// unchanged.
        #[test]
        fn any_byte_value_round_trips(value in 0u64..=255) {
            let mut fields = ValueMap::new();
            fields.insert("value".to_string(), Value::UInt(value));
            let codec = ping_codec();
            let packet = codec.encode(&Value::Map(fields), Some("ping")).expect("encodes");

            let mut outcomes = Vec::new();
            codec.scan(Cursor::new(packet.to_vec()), |o| outcomes.push(o)).expect("scan succeeds");
            proptest::prop_assert_eq!(outcomes.len(), 1);
            let ScanOutcome::Packet { fields: decoded, .. } = &outcomes[0] else {
                panic!("expected a decoded packet, got {:?}", outcomes[0]);
            };
            proptest::prop_assert_eq!(decoded.get_path("value"), Some(&Value::UInt(value)));
        }
    }

    #[test]
    fn decoded_ping_packet_matches_snapshot() {
        let mut fields = ValueMap::new();
        fields.insert("value".to_string(), Value::UInt(42));
        let codec = ping_codec();
        let packet = codec.encode(&Value::Map(fields), Some("ping")).expect("encodes");

        let mut outcomes = Vec::new();
        codec.scan(Cursor::new(packet.to_vec()), |o| outcomes.push(o)).expect("scan succeeds");
        let ScanOutcome::Packet { fields: decoded, .. } = outcomes.into_iter().next().expect("one packet")
        else {
            panic!("expected a decoded packet");
        };
        insta::assert_json_snapshot!(decoded, @r#"
        {
          "start": "3C",
          "value": 42,
          "end": "3E"
        }
        "#);
    }
}
