//! The per-payload header: a small mapping carrying `count`, `lengths`,
//! `compression`, `serializer`, `deserialize`, and any serializer-specific
//! extra keys, carried through verbatim (§3).

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// Well-known header field names, part of the wire contract (§6).
mod keys {
    pub const COUNT: &str = "count";
    pub const LENGTHS: &str = "lengths";
    pub const COMPRESSION: &str = "compression";
    pub const SERIALIZER: &str = "serializer";
    pub const DESERIALIZE: &str = "deserialize";
}

/// A malformed or incomplete header, encountered while reading one back
/// from the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// A required field was absent.
    #[error("header is missing required field {0:?}")]
    MissingField(&'static str),
    /// A field was present but had the wrong shape.
    #[error("header field {0:?} has the wrong type")]
    WrongType(&'static str),
}

/// Typed view over a payload header, backed by an order-preserving mapping.
///
/// A header is constructed incrementally during `dumps` (serializer
/// dispatch fills in `serializer`; the envelope codec fills in `lengths`,
/// `compression`, `count`, `deserialize`) and read back field-by-field
/// during `loads`. Extra, serializer-specific keys ride along unexamined.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    fields: IndexMap<String, Value>,
}

impl Header {
    /// A fresh header naming the serializer family that produced it.
    #[must_use]
    pub fn new(serializer: impl Into<String>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(keys::SERIALIZER.to_owned(), Value::Str(serializer.into()));
        Self { fields }
    }

    /// Wrap an already-assembled mapping as a header (e.g. one just decoded
    /// off the wire as part of a placeholder).
    #[must_use]
    pub fn from_map(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Consume the header, yielding its backing mapping.
    #[must_use]
    pub fn into_map(self) -> IndexMap<String, Value> {
        self.fields
    }

    /// Borrow the header's backing mapping.
    #[must_use]
    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// Set `lengths`, the per-frame byte length (§3).
    pub fn set_lengths(&mut self, lengths: &[usize]) {
        let seq = lengths.iter().map(|&n| Value::Int(n as i64)).collect();
        self.fields.insert(keys::LENGTHS.to_owned(), Value::Seq(seq));
    }

    /// Set `compression`, one codec name (or none) per frame (§3).
    pub fn set_compression(&mut self, compression: &[Option<String>]) {
        let seq = compression
            .iter()
            .map(|c| c.clone().map_or(Value::Null, Value::Str))
            .collect();
        self.fields.insert(keys::COMPRESSION.to_owned(), Value::Seq(seq));
    }

    /// Set `count`, the number of frames this payload occupies (§3).
    pub fn set_count(&mut self, count: usize) {
        self.fields.insert(keys::COUNT.to_owned(), Value::Int(count as i64));
    }

    /// Set `deserialize`, whether loads should re-materialize this payload
    /// (§3, §4.5.1 step 4e).
    pub fn set_deserialize(&mut self, deserialize: bool) {
        self.fields.insert(keys::DESERIALIZE.to_owned(), Value::Bool(deserialize));
    }

    /// Carry a serializer-specific extra key through verbatim.
    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Whether `compression` has already been populated.
    ///
    /// A pre-serialized payload that already carries `compression` skips
    /// re-splitting and re-compression (§4.5.1 step 4b; Design Notes §9's
    /// resolved stability-guarantee question).
    #[must_use]
    pub fn has_compression(&self) -> bool {
        self.fields.contains_key(keys::COMPRESSION)
    }

    /// Whether `lengths` has already been populated.
    #[must_use]
    pub fn has_lengths(&self) -> bool {
        self.fields.contains_key(keys::LENGTHS)
    }

    /// The serializer family that produced this payload.
    pub fn serializer(&self) -> Result<&str, HeaderError> {
        match self.fields.get(keys::SERIALIZER) {
            Some(Value::Str(s)) => Ok(s),
            Some(_) => Err(HeaderError::WrongType(keys::SERIALIZER)),
            None => Err(HeaderError::MissingField(keys::SERIALIZER)),
        }
    }

    /// The number of frames this payload occupies.
    pub fn count(&self) -> Result<usize, HeaderError> {
        match self.fields.get(keys::COUNT) {
            Some(Value::Int(n)) if *n >= 0 => Ok(*n as usize),
            Some(_) => Err(HeaderError::WrongType(keys::COUNT)),
            None => Err(HeaderError::MissingField(keys::COUNT)),
        }
    }

    /// Per-frame byte lengths.
    pub fn lengths(&self) -> Result<Vec<usize>, HeaderError> {
        match self.fields.get(keys::LENGTHS) {
            Some(Value::Seq(items)) => items
                .iter()
                .map(|v| match v {
                    Value::Int(n) if *n >= 0 => Ok(*n as usize),
                    _ => Err(HeaderError::WrongType(keys::LENGTHS)),
                })
                .collect(),
            Some(_) => Err(HeaderError::WrongType(keys::LENGTHS)),
            None => Err(HeaderError::MissingField(keys::LENGTHS)),
        }
    }

    /// Per-frame compression codec name, or `None` for an uncompressed
    /// frame.
    pub fn compression(&self) -> Result<Vec<Option<String>>, HeaderError> {
        match self.fields.get(keys::COMPRESSION) {
            Some(Value::Seq(items)) => items
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Str(s) => Ok(Some(s.clone())),
                    _ => Err(HeaderError::WrongType(keys::COMPRESSION)),
                })
                .collect(),
            Some(_) => Err(HeaderError::WrongType(keys::COMPRESSION)),
            None => Err(HeaderError::MissingField(keys::COMPRESSION)),
        }
    }

    /// Whether loads should re-materialize this payload.
    pub fn deserialize_flag(&self) -> Result<bool, HeaderError> {
        match self.fields.get(keys::DESERIALIZE) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(HeaderError::WrongType(keys::DESERIALIZE)),
            None => Err(HeaderError::MissingField(keys::DESERIALIZE)),
        }
    }

    /// A serializer-specific extra field, if present.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_header_carries_serializer_name() {
        let header = Header::new("bincode");
        assert_eq!(header.serializer().unwrap(), "bincode");
    }

    #[test]
    fn missing_field_is_reported() {
        let header = Header::new("raw");
        assert_eq!(header.count(), Err(HeaderError::MissingField("count")));
    }

    #[test]
    fn wrong_type_is_reported() {
        let mut header = Header::new("raw");
        header.set_extra("count", Value::Str("not a number".into()));
        assert_eq!(header.count(), Err(HeaderError::WrongType("count")));
    }

    #[test]
    fn lengths_and_compression_round_trip() {
        let mut header = Header::new("raw");
        header.set_lengths(&[10, 20, 30]);
        header.set_compression(&[None, Some("zstd".into()), None]);
        header.set_count(3);
        header.set_deserialize(true);

        assert_eq!(header.lengths().unwrap(), vec![10, 20, 30]);
        assert_eq!(
            header.compression().unwrap(),
            vec![None, Some("zstd".to_owned()), None]
        );
        assert_eq!(header.count().unwrap(), 3);
        assert!(header.deserialize_flag().unwrap());
    }

    #[test]
    fn has_compression_reflects_presence() {
        let mut header = Header::new("raw");
        assert!(!header.has_compression());
        header.set_compression(&[None]);
        assert!(header.has_compression());
    }

    #[test]
    fn extra_fields_survive_round_trip_through_map() {
        let mut header = Header::new("raw");
        header.set_extra("checksum", Value::Str("deadbeef".into()));
        let map = header.into_map();
        let header = Header::from_map(map);
        assert_eq!(header.extra("checksum"), Some(&Value::Str("deadbeef".into())));
    }
}
