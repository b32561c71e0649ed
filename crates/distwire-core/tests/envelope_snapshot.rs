//! Locks down the fixed on-wire shape of a minimal envelope and of a
//! single-payload placeholder, so an accidental rename of a header field or
//! a sentinel key shows up as a diff in review (§8 expansion).

use bytes::Bytes;
use distwire_core::{DistwireCodec, OnError};
use distwire_proto::{Item, PayloadMarker, Value};
use indexmap::IndexMap;

#[test]
fn scalar_message_header_and_placeholder_are_stable() {
    let codec = DistwireCodec::default();
    let mut map = IndexMap::new();
    map.insert("a".to_owned(), Item::unserialized(Bytes::from_static(b"hello"), false));
    let value = Item::Map(map);

    let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).expect("dumps");
    assert_eq!(frames.len(), 3, "uncompressed envelope header + payload + one body frame");
    assert!(frames[0].as_bytes().is_empty(), "no compression applied means an empty header frame");

    let decoded = codec.loads(frames, false, None).expect("loads");
    let Item::Map(back) = decoded else { panic!("expected a map") };
    let Some(Item::Marker(PayloadMarker::PreSerialized { header, .. })) = back.get("a") else {
        panic!("expected a pre-serialized marker")
    };

    insta::assert_debug_snapshot!(header.as_map(), @r###"
    {
        "serializer": Str(
            "raw",
        ),
        "lengths": Seq(
            [
                Int(
                    5,
                ),
            ],
        ),
        "compression": Seq(
            [
                Null,
            ],
        ),
        "count": Int(
            1,
        ),
        "deserialize": Bool(
            false,
        ),
    }
    "###);
}
