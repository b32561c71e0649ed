//! Shared test-only helpers: structural equality for [`Item`] trees.
//!
//! Not a `PartialEq` impl on `Item` itself — `Item::Marker` and
//! `Item::Materialized` hold a `Box<dyn Payload>`, which has no general
//! notion of equality, so comparison stays confined to test code that
//! knows what concrete type to expect.

use distwire_proto::Item;

/// Structural equality over the variants that matter for round-trip tests:
/// scalars, sequences, and maps compare recursively; anything else (a
/// marker or a materialized payload) is left to the caller to inspect by
/// downcasting.
#[must_use]
pub fn items_equal(a: &Item, b: &Item) -> bool {
    match (a, b) {
        (Item::Null, Item::Null) => true,
        (Item::Bool(x), Item::Bool(y)) => x == y,
        (Item::Int(x), Item::Int(y)) => x == y,
        (Item::Float(x), Item::Float(y)) => x == y,
        (Item::Str(x), Item::Str(y)) => x == y,
        (Item::Bytes(x), Item::Bytes(y)) => x == y,
        (Item::Seq(x), Item::Seq(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| items_equal(a, b))
        },
        (Item::Map(x), Item::Map(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| items_equal(v, w)))
        },
        _ => false,
    }
}
