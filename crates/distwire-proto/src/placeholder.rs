//! The three-key placeholder mapping that replaces an extracted payload
//! marker in the envelope, and locates its frames in the body (§3, §6).

use crate::header::Header;
use crate::value::Value;

/// Sentinel key naming a placeholder's header, chosen to be improbable in
/// user data (§6). Part of the wire contract — do not rename without a
/// protocol version bump.
pub const SENTINEL_HEADER: &str = "_$header";
/// Sentinel key naming a placeholder's frame-index (§6).
pub const SENTINEL_FINDEX: &str = "_$findex";
/// Sentinel key naming a placeholder's frame-count (§6).
pub const SENTINEL_FCOUNT: &str = "_$fcount";

/// A placeholder: what an extracted payload marker becomes inside the
/// envelope, locating its frames in the body sequence.
///
/// Retains `frame_count` on the wire as its own field rather than deriving
/// it from `header.count` on every read — a defensive-decoding choice
/// (Design Notes §9's first resolved open question) that costs eight bytes
/// per placeholder and lets `loads` catch a corrupt header before trusting
/// it for a slice bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// The payload's header (lengths, compression, serializer, ...).
    pub header: Header,
    /// Offset of this payload's first frame within the body sequence.
    pub frame_index: usize,
    /// Number of frames this payload occupies.
    pub frame_count: usize,
}

impl Placeholder {
    /// Build a placeholder from its constituent parts.
    #[must_use]
    pub fn new(header: Header, frame_index: usize, frame_count: usize) -> Self {
        Self { header, frame_index, frame_count }
    }

    /// Encode this placeholder as the three-key envelope mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = indexmap::IndexMap::with_capacity(3);
        map.insert(
            SENTINEL_HEADER.to_owned(),
            Value::Map(self.header.as_map().clone()),
        );
        map.insert(SENTINEL_FINDEX.to_owned(), Value::Int(self.frame_index as i64));
        map.insert(SENTINEL_FCOUNT.to_owned(), Value::Int(self.frame_count as i64));
        Value::Map(map)
    }

    /// Recognize and parse a placeholder mapping.
    ///
    /// Returns `None` for anything that is not a map, or a map that is not
    /// exactly the three sentinel keys — which is also how ordinary user
    /// data is told apart from a placeholder (§3, §8 "placeholder-lookalike
    /// user data").
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        if map.len() != 3 {
            return None;
        }
        let header = map.get(SENTINEL_HEADER)?.as_map()?.clone();
        let Value::Int(frame_index) = map.get(SENTINEL_FINDEX)? else {
            return None;
        };
        let Value::Int(frame_count) = map.get(SENTINEL_FCOUNT)? else {
            return None;
        };
        if *frame_index < 0 || *frame_count < 0 {
            return None;
        }
        Some(Self {
            header: Header::from_map(header),
            frame_index: *frame_index as usize,
            frame_count: *frame_count as usize,
        })
    }
}
