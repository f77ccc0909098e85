//! End-to-end scenario tests over the `dtu` fixture protocol: decoding a
//! single packet, encoding one with a multi-round CRC/length
//! back-reference, demultiplexing a mixed stream, and the three failure
//! scenarios (dirty bytes, a tampered CRC, a truncated buffer).

use std::{io::Cursor, sync::Arc};

use schemawire_core::{Codec, ScanOutcome, Scheme, Value};
use schemawire_harness::{card_request_fields, dtu_scheme, set_time_request_fields};

fn codec() -> Codec {
    let scheme = Scheme::compile(&dtu_scheme()).expect("fixture schema compiles");
    Codec::new(Arc::new(scheme))
}

fn card_packet() -> Vec<u8> {
    let codec = codec();
    let fields = card_request_fields("AABBCCDDEEFF", 66, 10_000);
    codec.encode(&fields, Some("dtu")).expect("card packet encodes").to_vec()
}

fn set_time_packet() -> Vec<u8> {
    let codec = codec();
    let fields = set_time_request_fields("AABBCCDDEEFF", 1_700_000_000);
    codec.encode(&fields, Some("dtu")).expect("set_time packet encodes").to_vec()
}

#[test]
fn encodes_the_exact_card_packet_bytes() {
    let packet = card_packet();
    // magic(2) sn(6) productCode(2) version(1) command(1) dataLen(2) cardId(4) balance(4) dataCrc(2)
    assert_eq!(packet.len(), 24);
    assert_eq!(&packet[..], hex::decode("7273aabbccddeeff00010101000a00000042000027109ca4").as_slice());
}

#[test]
fn encodes_the_exact_set_time_packet_bytes() {
    let packet = set_time_packet();
    assert_eq!(packet.len(), 20);
    assert_eq!(&packet[..], hex::decode("7273aabbccddeeff0001010200066553f100ff6e").as_slice());
}

#[test]
fn scans_and_decodes_a_card_packet() {
    let codec = codec();
    let packet = card_packet();
    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(packet), |o| outcomes.push(o)).expect("scan succeeds");

    assert_eq!(outcomes.len(), 1);
    let ScanOutcome::Packet { protocol, fields } = &outcomes[0] else {
        panic!("expected a decoded packet, got {:?}", outcomes[0]);
    };
    assert_eq!(protocol, "dtu");
    assert_eq!(fields.get_path("command"), Some(&Value::UInt(1)));
    assert_eq!(fields.get_path("dataLen"), Some(&Value::UInt(10)));
    assert_eq!(fields.get_path("data.cardId"), Some(&Value::UInt(66)));
    assert_eq!(fields.get_path("data.balance"), Some(&Value::UInt(10_000)));
}

#[test]
fn scans_a_mixed_stream_of_both_commands_in_order() {
    let codec = codec();
    let mut stream = card_packet();
    stream.extend(set_time_packet());

    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(stream), |o| outcomes.push(o)).expect("scan succeeds");

    assert_eq!(outcomes.len(), 2);
    let (ScanOutcome::Packet { protocol: p0, fields: f0 }, ScanOutcome::Packet { protocol: p1, fields: f1 }) =
        (&outcomes[0], &outcomes[1])
    else {
        panic!("expected two decoded packets, got {outcomes:?}");
    };
    assert_eq!(p0, "dtu");
    assert_eq!(f0.get_path("command"), Some(&Value::UInt(1)));
    assert_eq!(p1, "dtu");
    assert_eq!(f1.get_path("data.timestamp"), Some(&Value::UInt(1_700_000_000)));
}

#[test]
fn abandons_garbage_before_the_header_marker_and_still_recovers() {
    let codec = codec();
    let mut stream = vec![0xDE, 0xAD, 0xBE, 0xEF];
    stream.extend(card_packet());

    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(stream), |o| outcomes.push(o)).expect("scan succeeds");

    assert_eq!(outcomes.len(), 5);
    for outcome in &outcomes[..4] {
        assert!(matches!(outcome, ScanOutcome::Abandoned { count: 1 }));
    }
    assert!(matches!(outcomes[4], ScanOutcome::Packet { .. }));
}

#[test]
fn flags_a_tampered_crc_without_stopping_the_scan() {
    let codec = codec();
    let mut packet = card_packet();
    let last = packet.len() - 1;
    packet[last] ^= 0xFF;

    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(packet), |o| outcomes.push(o)).expect("scan succeeds");

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(&outcomes[0], ScanOutcome::DecodeFailed { protocol, .. } if protocol == "dtu"));
}

#[test]
fn waits_for_the_rest_of_the_frame_before_decoding() {
    let codec = codec();
    let packet = card_packet();
    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(&packet[..packet.len() - 1]), |o| outcomes.push(o)).expect("scan succeeds");

    // No complete frame yet: the partial tail is neither decoded nor abandoned.
    assert!(outcomes.is_empty());
}

#[test]
fn unknown_command_has_no_matching_switch_case() {
    let codec = codec();
    let fields = {
        let mut f = card_request_fields("AABBCCDDEEFF", 1, 1);
        f.as_map_mut().expect("root is a map").insert("command".to_string(), Value::UInt(99));
        f
    };
    let err = codec.encode(&fields, Some("dtu")).unwrap_err();
    assert!(err.to_string().contains("no switch case"));
}

/// Minimal hex decoder so the scenario fixtures above don't need a `hex`
/// crate dependency just for test literals.
mod hex {
    pub fn decode(s: &str) -> Vec<u8> {
        (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
    }
}
