//! Snapshot tests for decoded field dictionaries on the `dtu` fixture:
//! pin the exact shape a consumer sees out of `Codec::scan`, independent
//! of the byte-level assertions in `dtu_scenarios.rs`.

use std::{io::Cursor, sync::Arc};

use schemawire_core::{Codec, ScanOutcome, Scheme};
use schemawire_harness::{card_request_fields, dtu_scheme, set_time_request_fields};

fn decode_one(codec: &Codec, packet: &[u8]) -> schemawire_core::Value {
    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(packet.to_vec()), |o| outcomes.push(o)).expect("scan succeeds");
    match outcomes.into_iter().next().expect("one packet decoded") {
        ScanOutcome::Packet { fields, .. } => fields,
        other => panic!("expected a decoded packet, got {other:?}"),
    }
}

#[test]
fn card_packet_decodes_to_the_expected_dictionary() {
    let scheme = Scheme::compile(&dtu_scheme()).expect("fixture schema compiles");
    let codec = Codec::new(Arc::new(scheme));
    let fields = card_request_fields("AABBCCDDEEFF", 66, 10_000);
    let packet = codec.encode(&fields, Some("dtu")).expect("card packet encodes");

    let decoded = decode_one(&codec, &packet);
    insta::assert_json_snapshot!(decoded, @r#"
    {
      "magic": "7273",
      "sn": "AABBCCDDEEFF",
      "productCode": "0001",
      "version": "01",
      "command": 1,
      "dataLen": 10,
      "data": {
        "cardId": 66,
        "balance": 10000
      },
      "dataCrc": 40100
    }
    "#);
}

#[test]
fn set_time_packet_decodes_to_the_expected_dictionary() {
    let scheme = Scheme::compile(&dtu_scheme()).expect("fixture schema compiles");
    let codec = Codec::new(Arc::new(scheme));
    let fields = set_time_request_fields("AABBCCDDEEFF", 1_700_000_000);
    let packet = codec.encode(&fields, Some("dtu")).expect("set_time packet encodes");

    let decoded = decode_one(&codec, &packet);
    insta::assert_json_snapshot!(decoded, @r#"
    {
      "magic": "7273",
      "sn": "AABBCCDDEEFF",
      "productCode": "0001",
      "version": "01",
      "command": 2,
      "dataLen": 6,
      "data": {
        "timestamp": 1700000000
      },
      "dataCrc": 65390
    }
    "#);
}
