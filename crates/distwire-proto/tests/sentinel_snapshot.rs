//! Snapshot of the placeholder's on-wire shape: three sentinel keys, in a
//! fixed order, so an accidental rename shows up as a diff in review rather
//! than as a silent interop break with an older peer.

use distwire_proto::{Header, Placeholder};

#[test]
fn placeholder_shape_is_stable() {
    let mut header = Header::new("bincode");
    header.set_lengths(&[12, 34]);
    header.set_compression(&[None, Some("zstd".to_owned())]);
    header.set_count(2);
    header.set_deserialize(true);

    let placeholder = Placeholder::new(header, 4, 2);
    insta::assert_debug_snapshot!(placeholder.to_value(), @r###"
    Map(
        {
            "_$header": Map(
                {
                    "serializer": Str(
                        "bincode",
                    ),
                    "lengths": Seq(
                        [
                            Int(
                                12,
                            ),
                            Int(
                                34,
                            ),
                        ],
                    ),
                    "compression": Seq(
                        [
                            Null,
                            Str(
                                "zstd",
                            ),
                        ],
                    ),
                    "count": Int(
                        2,
                    ),
                    "deserialize": Bool(
                        true,
                    ),
                },
            ),
            "_$findex": Int(
                4,
            ),
            "_$fcount": Int(
                2,
            ),
        },
    )
    "###);
}
