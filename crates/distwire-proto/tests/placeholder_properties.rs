//! Property-based tests for placeholder round-tripping and the telltale
//! that separates a placeholder from ordinary user data shaped like one.

use distwire_proto::{Header, Placeholder, Value};
use proptest::prelude::*;

fn arbitrary_header() -> impl Strategy<Value = Header> {
    (
        "[a-z]{1,12}",
        prop::collection::vec(0usize..1 << 20, 0..4),
        prop::collection::vec(prop::option::of("[a-z]{1,8}"), 0..4),
        any::<bool>(),
    )
        .prop_map(|(serializer, lengths, compression, deserialize)| {
            let mut header = Header::new(serializer);
            header.set_lengths(&lengths);
            header.set_compression(&compression);
            header.set_count(lengths.len());
            header.set_deserialize(deserialize);
            header
        })
}

fn arbitrary_placeholder() -> impl Strategy<Value = Placeholder> {
    (arbitrary_header(), 0usize..1 << 16, 0usize..64)
        .prop_map(|(header, frame_index, frame_count)| {
            Placeholder::new(header, frame_index, frame_count)
        })
}

proptest! {
    #[test]
    fn placeholder_round_trips_through_value(placeholder in arbitrary_placeholder()) {
        let value = placeholder.to_value();
        let back = Placeholder::from_value(&value).expect("a placeholder's own encoding must parse back");
        prop_assert_eq!(placeholder, back);
    }

    /// A user map that happens to have three keys, none of which are the
    /// sentinel names, must never be mistaken for a placeholder.
    #[test]
    fn three_key_user_maps_without_sentinels_are_not_placeholders(
        keys in prop::collection::hash_set("[a-z]{1,6}", 3),
    ) {
        let mut map = indexmap::IndexMap::new();
        for k in keys {
            map.insert(k, Value::Int(0));
        }
        prop_assert!(Placeholder::from_value(&Value::Map(map)).is_none());
    }
}

#[test]
fn placeholder_frame_index_can_be_nonzero_while_count_is_zero() {
    let header = Header::new("raw");
    let placeholder = Placeholder::new(header, 3, 0);
    let value = placeholder.to_value();
    let back = Placeholder::from_value(&value).expect("should parse");
    assert_eq!(back.frame_index, 3);
    assert_eq!(back.frame_count, 0);
}
