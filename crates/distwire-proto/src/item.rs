//! [`Item`]: the structural value of §3, as it exists *before* `dumps` has
//! run (carrying [`PayloadMarker`]s) and *after* `loads` has run (carrying
//! either a passthrough [`PayloadMarker::PreSerialized`] or a materialized
//! [`Payload`]).
//!
//! This is distinct from [`crate::Value`], the purely scalar/sequence/map
//! wire type used to encode the two envelope frames once every marker has
//! been replaced by a placeholder (§4.5.1 step 4d).

use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::marker::{Payload, PayloadMarker};
use crate::value::Value;

/// The structural value flowing into `dumps` and out of `loads`.
pub enum Item {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A unicode string.
    Str(String),
    /// An opaque byte buffer that is *not* a payload marker — it is simply
    /// scalar data and stays inline in the envelope (§4.5.1 step 1: "scalars
    /// that are themselves already raw byte-buffers do not get extracted").
    Bytes(Bytes),
    /// An ordered sequence.
    Seq(Vec<Item>),
    /// A string-keyed mapping, insertion order preserved.
    Map(IndexMap<String, Item>),
    /// A large payload, to be (or having been) handled out-of-band from the
    /// envelope proper.
    Marker(PayloadMarker),
    /// A payload `loads` has re-materialized via serializer dispatch.
    Materialized(Box<dyn Payload>),
}

impl Item {
    /// Shorthand for an empty map, the common root of a message.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(IndexMap::new())
    }

    /// Wrap a user payload as an unserialized marker.
    #[must_use]
    pub fn unserialized(payload: impl Payload, bytes_only: bool) -> Self {
        Self::Marker(PayloadMarker::Unserialized { payload: Box::new(payload), bytes_only })
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Seq(items) => f.debug_list().entries(items).finish(),
            Self::Map(map) => f.debug_map().entries(map.iter()).finish(),
            Self::Marker(m) => fmt::Debug::fmt(m, f),
            Self::Materialized(p) => fmt::Debug::fmt(p.as_ref() as &dyn Payload, f),
        }
    }
}

impl From<Value> for Item {
    /// Lift a placeholder-free wire value back into the structural shape
    /// `loads` returns: every scalar/seq/map variant maps across directly,
    /// with no markers (a bare `Value` never carries one).
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::Int(i),
            Value::Float(f) => Self::Float(f),
            Value::Str(s) => Self::Str(s),
            Value::Bytes(b) => Self::Bytes(b),
            Value::Seq(items) => Self::Seq(items.into_iter().map(Item::from).collect()),
            Value::Map(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Item::from(v))).collect())
            },
        }
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<i64> for Item {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Item {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
