//! The recursive structural value type.
//!
//! A single tagged-variant data type covering every shape the envelope
//! format needs: scalars, ordered sequences, string-keyed mappings (order
//! preserved, per Design Notes §9's "avoid per-element dynamic dispatch").
//! Converts losslessly to and from [`ciborium::value::Value`], which is the
//! on-wire binary format (§4.5.3).

use indexmap::IndexMap;

use crate::error::ValueError;

/// A structural value: the recursive shape that flows through `dumps`/
/// `loads` before and after placeholder substitution.
///
/// Payload markers ([`crate::PayloadMarker`]) and placeholders
/// ([`crate::Placeholder`]) are *not* variants of `Value` — a marker lives
/// alongside a `Value` tree during `dumps` (tracked by path, per §9), and a
/// placeholder is just an ordinary three-key [`Value::Map`] recognized by
/// its sentinel keys. This keeps `Value` itself a plain wire-shaped type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A unicode string, distinct from [`Value::Bytes`].
    Str(String),
    /// An opaque byte buffer, distinct from [`Value::Str`].
    Bytes(bytes::Bytes),
    /// An ordered sequence of values.
    Seq(Vec<Value>),
    /// A string-keyed mapping, insertion order preserved.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Shorthand for an empty map, the common root of an envelope message.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(IndexMap::new())
    }

    /// The map this value holds, if it is a [`Value::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The sequence this value holds, if it is a [`Value::Seq`].
    #[must_use]
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the CBOR value tree used for on-wire encoding.
    #[must_use]
    pub fn to_cbor(&self) -> ciborium::value::Value {
        use ciborium::value::Value as Cbor;
        match self {
            Self::Null => Cbor::Null,
            Self::Bool(b) => Cbor::Bool(*b),
            Self::Int(i) => Cbor::Integer((*i).into()),
            Self::Float(f) => Cbor::Float(*f),
            Self::Str(s) => Cbor::Text(s.clone()),
            Self::Bytes(b) => Cbor::Bytes(b.to_vec()),
            Self::Seq(items) => Cbor::Array(items.iter().map(Value::to_cbor).collect()),
            Self::Map(entries) => Cbor::Map(
                entries.iter().map(|(k, v)| (Cbor::Text(k.clone()), v.to_cbor())).collect(),
            ),
        }
    }

    /// Parse from the CBOR value tree produced by decoding a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NonStringKey`] if a map uses a non-string key,
    /// [`ValueError::IntegerOutOfRange`] if an integer does not fit in
    /// `i64`, or [`ValueError::UnsupportedKind`] for CBOR tags, which this
    /// format does not use.
    pub fn from_cbor(value: ciborium::value::Value) -> Result<Self, ValueError> {
        use ciborium::value::Value as Cbor;
        match value {
            Cbor::Null => Ok(Self::Null),
            Cbor::Bool(b) => Ok(Self::Bool(b)),
            Cbor::Integer(i) => {
                let i: i64 =
                    i.try_into().map_err(|_| ValueError::IntegerOutOfRange(format!("{i:?}")))?;
                Ok(Self::Int(i))
            },
            Cbor::Float(f) => Ok(Self::Float(f)),
            Cbor::Text(s) => Ok(Self::Str(s)),
            Cbor::Bytes(b) => Ok(Self::Bytes(bytes::Bytes::from(b))),
            Cbor::Array(items) => {
                let items =
                    items.into_iter().map(Value::from_cbor).collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Seq(items))
            },
            Cbor::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (k, v) in entries {
                    let Cbor::Text(key) = k else {
                        return Err(ValueError::NonStringKey);
                    };
                    map.insert(key, Value::from_cbor(v)?);
                }
                Ok(Self::Map(map))
            },
            Cbor::Tag(_, _) => Err(ValueError::UnsupportedKind("tag")),
            _ => Err(ValueError::UnsupportedKind("unknown")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1e30..1e30f64).prop_map(Value::Float),
            "[a-z]{0,8}".prop_map(Value::Str),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(|v| Value::Bytes(Bytes::from(v))),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Seq),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..6).prop_map(|entries| {
                    let mut map = IndexMap::new();
                    for (k, v) in entries {
                        map.insert(k, v);
                    }
                    Value::Map(map)
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn cbor_round_trip_preserves_value(v in arbitrary_value()) {
            let cbor = v.to_cbor();
            let back = Value::from_cbor(cbor).expect("round trip should decode");
            prop_assert_eq!(v, back);
        }
    }

    #[test]
    fn bytes_and_str_are_distinct_after_round_trip() {
        let s = Value::Str("hi".to_owned());
        let b = Value::Bytes(Bytes::from_static(b"hi"));
        assert_ne!(s, b);
        assert_eq!(Value::from_cbor(s.to_cbor()).unwrap(), s);
        assert_eq!(Value::from_cbor(b.to_cbor()).unwrap(), b);
    }

    #[test]
    fn map_preserves_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("z".to_owned(), Value::Int(1));
        map.insert("a".to_owned(), Value::Int(2));
        let v = Value::Map(map);
        let back = Value::from_cbor(v.to_cbor()).unwrap();
        let Value::Map(back_map) = back else { panic!("expected map") };
        assert_eq!(back_map.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn non_string_map_key_is_rejected() {
        use ciborium::value::Value as Cbor;
        let bad = Cbor::Map(vec![(Cbor::Integer(1.into()), Cbor::Null)]);
        assert_eq!(Value::from_cbor(bad), Err(ValueError::NonStringKey));
    }
}
