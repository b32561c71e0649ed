//! Serializer dispatch (§4.4): a name-keyed registry of serializer
//! families, each able to turn an opaque [`Payload`] into `(Header,
//! Vec<Frame>)` and back, tried in a caller-supplied order.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use distwire_proto::{Frame, Header, Payload, Value};

use crate::error::{fail, EnvelopeError};

/// A named strategy for converting an opaque [`Payload`] to `(Header,
/// Vec<Frame>)` and back (§4.4, §9 "capability set {serialize, deserialize,
/// accepts}").
///
/// Object-safe so families of different concrete types can share one
/// registry; `accepts` is a separate method (rather than `serialize`
/// returning `Option`) so dispatch can try the next family without having
/// moved the payload out of the caller's hands.
pub trait SerializerFamily: Send + Sync {
    /// This family's name, written into the header's `serializer` field.
    fn name(&self) -> &'static str;
    /// Whether this family can handle `payload`.
    fn accepts(&self, payload: &dyn Payload) -> bool;
    /// Convert `payload` to `(header, frames)`. Only called after `accepts`
    /// returned `true` for the same payload.
    fn serialize(
        &self,
        payload: Box<dyn Payload>,
        context: &Value,
    ) -> Result<(Header, Vec<Frame>), EnvelopeError>;
    /// Reconstruct a payload from `(header, frames)` this family produced.
    fn deserialize(
        &self,
        header: &Header,
        frames: Vec<Frame>,
    ) -> Result<Box<dyn Payload>, EnvelopeError>;
}

/// An ordered, name-keyed table of [`SerializerFamily`] implementations.
pub struct SerializerRegistry {
    families: IndexMap<&'static str, Arc<dyn SerializerFamily>>,
}

impl SerializerRegistry {
    /// An empty registry with no families.
    #[must_use]
    pub fn empty() -> Self {
        Self { families: IndexMap::new() }
    }

    /// A registry carrying the three built-in families, in the order named
    /// by §4.4's expansion: `"error"`, `"raw"`, `"bincode"`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ErrorFamily));
        registry.register(Arc::new(RawFamily));
        registry.register(Arc::new(BincodeFamily));
        registry
    }

    /// Add or replace a family by name.
    pub fn register(&mut self, family: Arc<dyn SerializerFamily>) {
        self.families.insert(family.name(), family);
    }

    /// Look up a family by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SerializerFamily>> {
        self.families.get(name)
    }

    /// Try each name in `order`, in turn, returning the first family that
    /// accepts `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::SerializationFailed`] if every family in
    /// `order` either is unregistered or declines the payload.
    pub fn dispatch(
        &self,
        order: &[&str],
        payload: Box<dyn Payload>,
        context: &Value,
    ) -> Result<(Header, Vec<Frame>), EnvelopeError> {
        for name in order {
            if let Some(family) = self.families.get(*name) {
                if family.accepts(payload.as_ref()) {
                    return family.serialize(payload, context);
                }
            }
        }
        Err(fail(EnvelopeError::SerializationFailed))
    }

    /// Deserialize `(header, frames)` via the family named `name`.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::DisallowedSerializer`] if `allowed` is `Some` and
    /// does not list `name`; [`EnvelopeError::MalformedEnvelope`] if no
    /// family by that name is registered.
    pub fn deserialize(
        &self,
        name: &str,
        allowed: Option<&[&str]>,
        header: &Header,
        frames: Vec<Frame>,
    ) -> Result<Box<dyn Payload>, EnvelopeError> {
        if let Some(allowed) = allowed {
            if !allowed.contains(&name) {
                return Err(fail(EnvelopeError::DisallowedSerializer { name: name.to_owned() }));
            }
        }
        let family = self.families.get(name).ok_or_else(|| {
            fail(EnvelopeError::MalformedEnvelope {
                reason: format!("unknown serializer family {name:?}"),
            })
        })?;
        family.deserialize(header, frames)
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn concat(frames: &[Frame]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frames.iter().map(|f| f.as_bytes().len()).sum());
    for frame in frames {
        out.extend_from_slice(frame.as_bytes());
    }
    out
}

/// The internal diagnostic record dumps synthesizes in place of a payload
/// whose serialization failed, under `on_error = "message"` (§7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// The `EnvelopeError` variant name that triggered this record.
    pub kind: String,
    /// A human-readable description, safe to forward to the peer.
    pub message: String,
}

impl DiagnosticRecord {
    /// Build a diagnostic record for a serialization failure at `path`.
    #[must_use]
    pub fn serialization_failed(path: &str) -> Self {
        Self {
            kind: "SerializationFailed".to_owned(),
            message: format!("no serializer family accepted the payload at {path}"),
        }
    }
}

/// The `"error"` family: carries a [`DiagnosticRecord`] and nothing else.
/// Never chosen for ordinary user data, since `accepts` only matches that
/// one internal type.
pub struct ErrorFamily;

impl SerializerFamily for ErrorFamily {
    fn name(&self) -> &'static str {
        "error"
    }

    fn accepts(&self, payload: &dyn Payload) -> bool {
        payload.as_any().downcast_ref::<DiagnosticRecord>().is_some()
    }

    fn serialize(
        &self,
        payload: Box<dyn Payload>,
        _context: &Value,
    ) -> Result<(Header, Vec<Frame>), EnvelopeError> {
        let record = payload
            .as_any()
            .downcast_ref::<DiagnosticRecord>()
            .ok_or_else(|| fail(EnvelopeError::SerializationFailed))?;
        let bytes = bincode::serialize(record)
            .map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))?;
        Ok((Header::new(self.name()), vec![Frame::new(bytes)]))
    }

    fn deserialize(
        &self,
        _header: &Header,
        frames: Vec<Frame>,
    ) -> Result<Box<dyn Payload>, EnvelopeError> {
        let bytes = concat(&frames);
        let record: DiagnosticRecord = bincode::deserialize(&bytes).map_err(|e| {
            fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() })
        })?;
        Ok(Box::new(record))
    }
}

/// The `"raw"` family: passes a payload already expressed as owned bytes
/// (`bytes::Bytes` or `Vec<u8>`) through as a single frame, unchanged.
pub struct RawFamily;

impl RawFamily {
    fn as_bytes(payload: &dyn Payload) -> Option<bytes::Bytes> {
        if let Some(b) = payload.as_any().downcast_ref::<bytes::Bytes>() {
            return Some(b.clone());
        }
        payload.as_any().downcast_ref::<Vec<u8>>().map(|v| bytes::Bytes::copy_from_slice(v))
    }
}

impl SerializerFamily for RawFamily {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn accepts(&self, payload: &dyn Payload) -> bool {
        Self::as_bytes(payload).is_some()
    }

    fn serialize(
        &self,
        payload: Box<dyn Payload>,
        _context: &Value,
    ) -> Result<(Header, Vec<Frame>), EnvelopeError> {
        let bytes = Self::as_bytes(payload.as_ref())
            .ok_or_else(|| fail(EnvelopeError::SerializationFailed))?;
        Ok((Header::new(self.name()), vec![Frame::new(bytes)]))
    }

    fn deserialize(
        &self,
        _header: &Header,
        frames: Vec<Frame>,
    ) -> Result<Box<dyn Payload>, EnvelopeError> {
        Ok(Box::new(bytes::Bytes::from(concat(&frames))))
    }
}

/// A payload wrapper the `"bincode"` family knows how to serialize: any
/// owned `T: Serialize` closed over by a small erasure closure, the same
/// "named thing with a compress/decompress closure" shape §4.2 uses for
/// codecs.
pub struct SerdeValue {
    encode: Arc<dyn Fn() -> Result<Vec<u8>, String> + Send + Sync>,
}

impl SerdeValue {
    /// Wrap `value` for the `"bincode"` family to pick up.
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self { encode: Arc::new(move || bincode::serialize(&value).map_err(|e| e.to_string())) }
    }
}

/// The bytes a [`BincodeFamily::deserialize`] call decoded. Since the
/// family has no static knowledge of the original Rust type (bincode has no
/// self-describing schema), callers decode to a concrete type themselves
/// via [`DecodedBincode::decode`].
pub struct DecodedBincode(pub bytes::Bytes);

impl DecodedBincode {
    /// Decode the stored bytes as `T`.
    ///
    /// # Errors
    ///
    /// Returns `bincode`'s error if the bytes do not decode as `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, bincode::Error> {
        bincode::deserialize(&self.0)
    }
}

/// The `"bincode"` family: the general-purpose fallback for any payload
/// wrapped in [`SerdeValue`], encoded with `bincode` 1.x.
pub struct BincodeFamily;

impl SerializerFamily for BincodeFamily {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn accepts(&self, payload: &dyn Payload) -> bool {
        payload.as_any().downcast_ref::<SerdeValue>().is_some()
    }

    fn serialize(
        &self,
        payload: Box<dyn Payload>,
        _context: &Value,
    ) -> Result<(Header, Vec<Frame>), EnvelopeError> {
        let value = payload
            .as_any()
            .downcast_ref::<SerdeValue>()
            .ok_or_else(|| fail(EnvelopeError::SerializationFailed))?;
        let bytes = (value.encode)()
            .map_err(|reason| fail(EnvelopeError::MalformedEnvelope { reason }))?;
        Ok((Header::new(self.name()), vec![Frame::new(bytes)]))
    }

    fn deserialize(
        &self,
        _header: &Header,
        frames: Vec<Frame>,
    ) -> Result<Box<dyn Payload>, EnvelopeError> {
        Ok(Box::new(DecodedBincode(bytes::Bytes::from(concat(&frames)))))
    }
}
