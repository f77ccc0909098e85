//! Exercises `if` and `array` nodes in isolation on the text-framed
//! `flags` fixture protocol, independent of the `dtu` fixture's CRC and
//! switch machinery.

use std::{io::Cursor, sync::Arc};

use schemawire_core::{Codec, ScanOutcome, Scheme, Value, ValueMap};
use schemawire_harness::text_array_scheme;

fn codec() -> Codec {
    let scheme = Scheme::compile(&text_array_scheme()).expect("fixture schema compiles");
    Codec::new(Arc::new(scheme))
}

fn fields(flag: u64, extra: Option<u64>, items: &[u64]) -> Value {
    let mut map = ValueMap::new();
    map.insert("flag".to_string(), Value::UInt(flag));
    if let Some(extra) = extra {
        map.insert("extra".to_string(), Value::UInt(extra));
    }
    map.insert("count".to_string(), Value::UInt(items.len() as u64));
    map.insert("items".to_string(), Value::List(items.iter().map(|v| Value::UInt(*v)).collect()));
    Value::Map(map)
}

#[test]
fn flag_unset_omits_the_extra_field_on_the_wire() {
    let codec = codec();
    let packet = codec.encode(&fields(0, None, &[1, 2, 3]), Some("flags")).expect("encodes");

    // start(2) flag(1) count(1) items(3) end(2), no extra field
    assert_eq!(packet.len(), 9);
    assert_eq!(&packet[..2], b"<<");
    assert_eq!(&packet[packet.len() - 2..], b">>");
}

#[test]
fn flag_set_includes_the_extra_field_and_round_trips() {
    let codec = codec();
    let packet = codec.encode(&fields(1, Some(0xBEEF), &[9, 8]), Some("flags")).expect("encodes");

    // start(2) flag(1) extra(2) count(1) items(2) end(2)
    assert_eq!(packet.len(), 10);

    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(packet), |o| outcomes.push(o)).expect("scan succeeds");
    assert_eq!(outcomes.len(), 1);
    let ScanOutcome::Packet { fields: decoded, .. } = &outcomes[0] else {
        panic!("expected a decoded packet, got {:?}", outcomes[0]);
    };
    assert_eq!(decoded.get_path("flag"), Some(&Value::UInt(1)));
    assert_eq!(decoded.get_path("extra"), Some(&Value::UInt(0xBEEF)));
    assert_eq!(decoded.get_path("count"), Some(&Value::UInt(2)));
    assert_eq!(
        decoded.get_path("items"),
        Some(&Value::List(vec![Value::UInt(9), Value::UInt(8)]))
    );
}

#[test]
fn empty_array_round_trips_to_an_empty_list() {
    let codec = codec();
    let packet = codec.encode(&fields(0, None, &[]), Some("flags")).expect("encodes");

    let mut outcomes = Vec::new();
    codec.scan(Cursor::new(packet), |o| outcomes.push(o)).expect("scan succeeds");
    assert_eq!(outcomes.len(), 1);
    let ScanOutcome::Packet { fields: decoded, .. } = &outcomes[0] else {
        panic!("expected a decoded packet, got {:?}", outcomes[0]);
    };
    assert_eq!(decoded.get_path("items"), Some(&Value::List(Vec::new())));
}
