//! The envelope codec (§4.5): `dumps`/`loads`, the dominant component of
//! this crate. Walks a structural [`Item`], extracts payload markers into
//! a placeholder-bearing [`Value`] skeleton plus a flat body-frame
//! sequence, and performs the inverse on receive.

use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;

use distwire_proto::{
    ByteSized, Frame, Header, Item, Path, PathStep, Payload, PayloadMarker, Placeholder, Value,
};

use crate::compression::{select_compression, CompressionRegistry};
use crate::config::Config;
use crate::dispatch::{DiagnosticRecord, SerializerRegistry};
use crate::error::{fail, EnvelopeError};
use crate::split::{merge_frames, split_frame};

/// How `dumps` should react to a [`EnvelopeError::SerializationFailed`]
/// (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    /// Fail the whole call.
    #[default]
    Raise,
    /// Replace the offending payload with a synthetic `"error"` payload
    /// and continue encoding the rest of the message.
    Message,
}

/// The envelope codec: bundles the process-wide config, compression
/// registry, and serializer registry that `dumps`/`loads` read.
///
/// Per §5, these registries are populated once (here, at construction) and
/// read-only thereafter; a `DistwireCodec` itself carries no per-call
/// state, matching §4.5.4.
pub struct DistwireCodec {
    config: Config,
    compression: Arc<CompressionRegistry>,
    dispatch: Arc<SerializerRegistry>,
}

/// The process-wide default compression registry (§5): built once, on first
/// use, behind a lock-free read path thereafter.
static DEFAULT_COMPRESSION_REGISTRY: LazyLock<Arc<CompressionRegistry>> =
    LazyLock::new(|| Arc::new(CompressionRegistry::with_builtins()));

/// The process-wide default serializer registry (§5), same init discipline
/// as [`DEFAULT_COMPRESSION_REGISTRY`].
static DEFAULT_SERIALIZER_REGISTRY: LazyLock<Arc<SerializerRegistry>> =
    LazyLock::new(|| Arc::new(SerializerRegistry::with_builtins()));

impl DistwireCodec {
    /// Build a codec from explicit config and registries.
    #[must_use]
    pub fn new(config: Config, compression: CompressionRegistry, dispatch: SerializerRegistry) -> Self {
        Self { config, compression: Arc::new(compression), dispatch: Arc::new(dispatch) }
    }

    /// The codec's tunable configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The codec's compression registry.
    #[must_use]
    pub fn compression_registry(&self) -> &CompressionRegistry {
        &self.compression
    }

    /// The codec's serializer dispatch registry.
    #[must_use]
    pub fn serializer_registry(&self) -> &SerializerRegistry {
        &self.dispatch
    }

    /// Encode `value` as a frame sequence (§4.5.1).
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::SerializationFailed`] (under
    /// `on_error = OnError::Raise`) if no family in `serializer_order`
    /// accepts some payload, or [`EnvelopeError::MalformedEnvelope`] if the
    /// envelope itself cannot be encoded.
    pub fn dumps(
        &self,
        value: Item,
        serializer_order: &[&str],
        on_error: OnError,
        context: &Value,
    ) -> Result<Vec<Frame>, EnvelopeError> {
        tracing::debug!(?on_error, "dumps: walking structural value");

        let mut path: Path = Vec::new();
        let mut markers = Vec::new();
        let mut skeleton = walk(value, &mut path, &mut markers);

        let mut body: Vec<Frame> = Vec::new();
        for (marker_path, marker) in markers {
            let bytes_only =
                matches!(&marker, ExtractedMarker::Unserialized { bytes_only, .. } if *bytes_only);

            let (mut header, frames) = match marker {
                ExtractedMarker::Unserialized { payload, .. } => {
                    match self.dispatch.dispatch(serializer_order, payload, context) {
                        Ok(pair) => pair,
                        Err(err) if on_error == OnError::Message
                            && err == EnvelopeError::SerializationFailed =>
                        {
                            let record =
                                DiagnosticRecord::serialization_failed(&format_path(&marker_path));
                            let error_family = self
                                .dispatch
                                .get("error")
                                .ok_or_else(|| err.clone())?;
                            error_family.serialize(Box::new(record), context)?
                        },
                        Err(err) => return Err(err),
                    }
                },
                ExtractedMarker::PreSerialized { header, frames } => (header, frames),
            };

            let final_frames = finalize_payload(&mut header, frames, &self.config, &self.compression);
            header.set_deserialize(bytes_only);
            let placeholder = Placeholder::new(header, body.len(), final_frames.len());
            apply_patch(&mut skeleton, &marker_path, placeholder.to_value());
            body.extend(final_frames);
        }

        self.encode_envelope(skeleton, body)
    }

    /// Decode a frame sequence back into a structural value (§4.5.2).
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedEnvelope`] if the frame sequence
    /// or its envelope cannot be decoded, [`EnvelopeError::UnknownCompression`]
    /// if a referenced codec is unregistered, [`EnvelopeError::DisallowedSerializer`]
    /// if `allowed_serializers` rejects a header's family, or
    /// [`EnvelopeError::FrameMergeMismatch`] if received frames don't merge
    /// to a header's declared lengths.
    pub fn loads(
        &self,
        mut frames: Vec<Frame>,
        deserialize: bool,
        allowed_serializers: Option<&[&str]>,
    ) -> Result<Item, EnvelopeError> {
        tracing::debug!(frame_count = frames.len(), deserialize, "loads: decoding envelope");

        if frames.len() < 2 {
            return Err(fail(EnvelopeError::MalformedEnvelope {
                reason: "message has fewer than the mandatory 2 envelope frames".to_owned(),
            }));
        }
        let body_frames = frames.split_off(2);
        let payload_frame = frames.pop().ok_or_else(|| {
            fail(EnvelopeError::MalformedEnvelope { reason: "missing envelope payload frame".to_owned() })
        })?;
        let header_frame = frames.pop().ok_or_else(|| {
            fail(EnvelopeError::MalformedEnvelope { reason: "missing envelope header frame".to_owned() })
        })?;

        let compression_name = decode_envelope_header(&header_frame)?;
        let payload_bytes = match &compression_name {
            Some(name) => self.compression.decompress(name, payload_frame.as_bytes())?,
            None => payload_frame.as_bytes().to_vec(),
        };
        let skeleton = decode_cbor_value(&payload_bytes)?;

        if body_frames.is_empty() {
            return Ok(Item::from(skeleton));
        }

        let mut body: Vec<Option<Frame>> = body_frames.into_iter().map(Some).collect();
        let item = substitute(
            skeleton,
            &mut body,
            deserialize,
            allowed_serializers,
            &self.compression,
            &self.dispatch,
        )?;

        if body.iter().any(Option::is_some) {
            return Err(fail(EnvelopeError::MalformedEnvelope {
                reason: "body frames were left unconsumed after decoding".to_owned(),
            }));
        }

        Ok(item)
    }

    fn encode_envelope(&self, skeleton: Value, body: Vec<Frame>) -> Result<Vec<Frame>, EnvelopeError> {
        let payload_bytes = encode_cbor_value(&skeleton)?;
        let payload_frame = Frame::new(payload_bytes);
        let (payload_frame, codec) = select_compression(&payload_frame, &self.config, &self.compression);

        let header_frame = match codec {
            Some(name) => {
                let mut header_map = IndexMap::with_capacity(1);
                header_map.insert("compression".to_owned(), Value::Str(name));
                Frame::new(encode_cbor_value(&Value::Map(header_map))?)
            },
            None => Frame::empty(),
        };

        let mut frames = Vec::with_capacity(2 + body.len());
        frames.push(header_frame);
        frames.push(payload_frame);
        frames.extend(body);
        Ok(frames)
    }
}

impl Default for DistwireCodec {
    /// Builds against the process-wide default registries (§5), shared
    /// (via `Arc`) rather than rebuilt on every call.
    fn default() -> Self {
        Self {
            config: Config::default(),
            compression: Arc::clone(&DEFAULT_COMPRESSION_REGISTRY),
            dispatch: Arc::clone(&DEFAULT_SERIALIZER_REGISTRY),
        }
    }
}

/// The payload-extraction record walk-and-extract collects per path
/// (§4.5.1 step 1), before either has been through serializer dispatch or
/// the finalize pass (split + compress).
enum ExtractedMarker {
    /// Carries a user object still awaiting serializer dispatch.
    Unserialized {
        /// The user object.
        payload: Box<dyn Payload>,
        /// Whether loads should always re-materialize this payload.
        bytes_only: bool,
    },
    /// Already reduced to `(header, frames)`.
    PreSerialized {
        /// The payload's header.
        header: Header,
        /// The payload's frames.
        frames: Vec<Frame>,
    },
}

/// Walk `item`, converting it to a placeholder-free [`Value`] skeleton
/// (markers become `Value::Null` stand-ins) while recording every marker's
/// path for the second, patching pass.
///
/// A [`distwire_proto::Item::Materialized`] node (loads' own output,
/// re-entering dumps for e.g. forwarding) is treated like a fresh
/// [`PayloadMarker::Unserialized`] with no bytes-only hint, so a round
/// trip through dumps re-dispatches it rather than rejecting it.
fn walk(item: Item, path: &mut Path, markers: &mut Vec<(Path, ExtractedMarker)>) -> Value {
    match item {
        Item::Null => Value::Null,
        Item::Bool(b) => Value::Bool(b),
        Item::Int(i) => Value::Int(i),
        Item::Float(f) => Value::Float(f),
        Item::Str(s) => Value::Str(s),
        Item::Bytes(b) => Value::Bytes(b),
        Item::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, child) in items.into_iter().enumerate() {
                path.push(PathStep::SeqIndex(index));
                out.push(walk(child, path, markers));
                path.pop();
            }
            Value::Seq(out)
        },
        Item::Map(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, child) in map {
                path.push(PathStep::MapKey(key.clone()));
                let value = walk(child, path, markers);
                path.pop();
                out.insert(key, value);
            }
            Value::Map(out)
        },
        Item::Marker(PayloadMarker::Unserialized { payload, bytes_only }) => {
            markers.push((path.clone(), ExtractedMarker::Unserialized { payload, bytes_only }));
            Value::Null
        },
        Item::Marker(PayloadMarker::PreSerialized { header, frames }) => {
            markers.push((path.clone(), ExtractedMarker::PreSerialized { header, frames }));
            Value::Null
        },
        Item::Materialized(payload) => {
            markers.push((path.clone(), ExtractedMarker::Unserialized { payload, bytes_only: false }));
            Value::Null
        },
    }
}

/// Apply the second, patching pass: descend `path` into `root` (which must
/// be the very skeleton `walk` produced for the same item tree) and
/// overwrite the node there with `replacement`.
fn apply_patch(root: &mut Value, path: &Path, replacement: Value) {
    let mut node = root;
    for step in path {
        node = match (node, step) {
            (Value::Seq(items), PathStep::SeqIndex(index)) => match items.get_mut(*index) {
                Some(child) => child,
                None => unreachable!("path was recorded against this exact skeleton"),
            },
            (Value::Map(map), PathStep::MapKey(key)) => match map.get_mut(key) {
                Some(child) => child,
                None => unreachable!("path was recorded against this exact skeleton"),
            },
            _ => unreachable!("path step kind does not match the skeleton's shape at this depth"),
        };
    }
    *node = replacement;
}

/// Apply §4.5.1 steps 4a-4c to a serialized payload's `(header, frames)`:
/// split oversize frames, select per-chunk compression, and populate
/// `lengths`/`compression`/`count` — unless the header already carries
/// `compression` (the pre-serialized stability guarantee of Design Notes
/// §9, forwarded opaquely).
fn finalize_payload(
    header: &mut Header,
    frames: Vec<Frame>,
    config: &Config,
    registry: &CompressionRegistry,
) -> Vec<Frame> {
    if header.has_compression() {
        if !header.has_lengths() {
            let lengths: Vec<usize> = frames.iter().map(ByteSized::nbytes).collect();
            header.set_lengths(&lengths);
        }
        header.set_count(frames.len());
        return frames;
    }

    let mut chunks = Vec::new();
    for frame in &frames {
        chunks.extend(split_frame(frame, config.split_threshold));
    }

    let lengths: Vec<usize> = chunks.iter().map(ByteSized::nbytes).collect();
    let mut compression = Vec::with_capacity(chunks.len());
    let mut final_frames = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let (out_frame, codec) = select_compression(chunk, config, registry);
        compression.push(codec);
        final_frames.push(out_frame);
    }

    header.set_lengths(&lengths);
    header.set_compression(&compression);
    header.set_count(final_frames.len());
    final_frames
}

/// Traverse-and-substitute (§4.5.2 step 3): walk the decoded envelope
/// skeleton, replacing every placeholder with its materialized or
/// passed-through payload.
fn substitute(
    value: Value,
    body: &mut [Option<Frame>],
    deserialize: bool,
    allowed: Option<&[&str]>,
    compression: &CompressionRegistry,
    dispatch: &SerializerRegistry,
) -> Result<Item, EnvelopeError> {
    match value {
        Value::Map(map) => {
            let wrapped = Value::Map(map);
            if let Some(placeholder) = Placeholder::from_value(&wrapped) {
                return materialize_placeholder(placeholder, body, deserialize, allowed, compression, dispatch);
            }
            let Value::Map(map) = wrapped else { unreachable!("just constructed as a Map") };
            let mut out = IndexMap::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key, substitute(child, body, deserialize, allowed, compression, dispatch)?);
            }
            Ok(Item::Map(out))
        },
        Value::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for child in items {
                out.push(substitute(child, body, deserialize, allowed, compression, dispatch)?);
            }
            Ok(Item::Seq(out))
        },
        other => Ok(Item::from(other)),
    }
}

fn materialize_placeholder(
    placeholder: Placeholder,
    body: &mut [Option<Frame>],
    deserialize: bool,
    allowed: Option<&[&str]>,
    compression: &CompressionRegistry,
    dispatch: &SerializerRegistry,
) -> Result<Item, EnvelopeError> {
    debug_assert_eq!(
        placeholder.header.count().ok(),
        Some(placeholder.frame_count),
        "a placeholder's fcount must always equal header.count by construction"
    );

    let start = placeholder.frame_index;
    let end = start.checked_add(placeholder.frame_count).ok_or_else(|| {
        fail(EnvelopeError::MalformedEnvelope { reason: "placeholder frame count overflows".to_owned() })
    })?;
    if end > body.len() {
        return Err(fail(EnvelopeError::MalformedEnvelope {
            reason: format!("placeholder references out-of-range frames [{start}, {end})"),
        }));
    }

    let mut raw_frames = Vec::with_capacity(placeholder.frame_count);
    for slot in &mut body[start..end] {
        let frame = slot.take().ok_or_else(|| {
            fail(EnvelopeError::MalformedEnvelope {
                reason: "placeholder references frames already consumed by another placeholder".to_owned(),
            })
        })?;
        raw_frames.push(frame);
    }

    let header = placeholder.header;
    let should_materialize = deserialize || header.deserialize_flag().unwrap_or(false);

    if should_materialize {
        // `lengths` holds pre-compression chunk sizes; wire frames here are
        // still individually compressed, so decompress before merging.
        let compressions = header
            .compression()
            .map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))?;
        if compressions.len() != raw_frames.len() {
            return Err(fail(EnvelopeError::MalformedEnvelope {
                reason: "header's compression list length does not match the frame count".to_owned(),
            }));
        }

        let mut decompressed = Vec::with_capacity(raw_frames.len());
        for (frame, codec) in raw_frames.into_iter().zip(compressions) {
            match codec {
                Some(name) => decompressed.push(Frame::new(compression.decompress(&name, frame.as_bytes())?)),
                None => decompressed.push(frame),
            }
        }

        let lengths = header
            .lengths()
            .map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))?;
        let merged = merge_frames(&decompressed, &lengths)?;

        let serializer = header
            .serializer()
            .map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))?
            .to_owned();
        let payload = dispatch.deserialize(&serializer, allowed, &header, merged)?;
        Ok(Item::Materialized(payload))
    } else {
        // Forward opaquely: keep the raw, still-compressed wire frames
        // exactly as received, unmerged.
        Ok(Item::Marker(PayloadMarker::PreSerialized { header, frames: raw_frames }))
    }
}

fn decode_envelope_header(frame: &Frame) -> Result<Option<String>, EnvelopeError> {
    if frame.as_bytes().is_empty() {
        return Ok(None);
    }
    let value = decode_cbor_value(frame.as_bytes())?;
    match value {
        Value::Map(map) => match map.get("compression") {
            Some(Value::Str(name)) => Ok(Some(name.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(fail(EnvelopeError::MalformedEnvelope {
                reason: "envelope header's \"compression\" field has the wrong type".to_owned(),
            })),
        },
        _ => Err(fail(EnvelopeError::MalformedEnvelope {
            reason: "envelope header frame did not decode to a map".to_owned(),
        })),
    }
}

fn encode_cbor_value(value: &Value) -> Result<Vec<u8>, EnvelopeError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(&value.to_cbor(), &mut bytes)
        .map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))?;
    Ok(bytes)
}

fn decode_cbor_value(bytes: &[u8]) -> Result<Value, EnvelopeError> {
    let cbor: ciborium::value::Value = ciborium::from_reader(bytes)
        .map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))?;
    Value::from_cbor(cbor).map_err(|e| fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() }))
}

fn format_path(path: &Path) -> String {
    let mut out = String::from("$");
    for step in path {
        match step {
            PathStep::MapKey(key) => {
                out.push('.');
                out.push_str(key);
            },
            PathStep::SeqIndex(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use distwire_proto::Payload as _;

    use super::*;
    use crate::dispatch::{DecodedBincode, SerdeValue};

    fn codec() -> DistwireCodec {
        DistwireCodec::default()
    }

    fn map_item(entries: Vec<(&str, Item)>) -> Item {
        let mut map = IndexMap::new();
        for (k, v) in entries {
            map.insert(k.to_owned(), v);
        }
        Item::Map(map)
    }

    #[test]
    fn scalar_only_message_round_trips_in_two_frames() {
        let codec = codec();
        let value = map_item(vec![("x", Item::Int(1)), ("y", Item::Str("hi".to_owned()))]);
        let frames = codec.dumps(value, &["raw", "bincode"], OnError::Raise, &Value::map()).unwrap();
        assert_eq!(frames.len(), 2);

        let Item::Map(back) = codec.loads(frames, true, None).unwrap() else { panic!("expected map") };
        assert!(matches!(back.get("x"), Some(Item::Int(1))));
        assert!(matches!(back.get("y"), Some(Item::Str(s)) if s == "hi"));
    }

    #[test]
    fn small_unserialized_payload_is_not_compressed() {
        let codec = codec();
        let payload = Item::unserialized(Bytes::from_static(&[0u8; 100]), false);
        let value = map_item(vec![("a", payload)]);

        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].as_bytes().len(), 100);

        let Item::Map(back) = codec.loads(frames, true, None).unwrap() else { panic!("expected map") };
        let Some(Item::Materialized(payload)) = back.get("a") else { panic!("expected materialized payload") };
        let bytes = payload.as_any().downcast_ref::<bytes::Bytes>().unwrap();
        assert_eq!(bytes.len(), 100);
    }

    #[test]
    fn large_compressible_payload_is_compressed_with_default_codec() {
        let codec = codec();
        let data = vec![b'A'; 200_000];
        let payload = Item::unserialized(Bytes::from(data.clone()), false);
        let value = map_item(vec![("a", payload)]);

        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[2].as_bytes().len() < data.len());

        let Item::Map(back) = codec.loads(frames, true, None).unwrap() else { panic!("expected map") };
        let Some(Item::Materialized(payload)) = back.get("a") else { panic!("expected materialized payload") };
        let bytes = payload.as_any().downcast_ref::<bytes::Bytes>().unwrap();
        assert_eq!(bytes.as_ref(), data.as_slice());
    }

    #[test]
    fn oversize_payload_is_split_before_compression() {
        let mut config = Config::default();
        config.split_threshold = 64 * 1024 * 1024;
        let codec = DistwireCodec::new(
            config,
            CompressionRegistry::with_builtins(),
            SerializerRegistry::with_builtins(),
        );

        let data: Vec<u8> = (0..100usize * 1024 * 1024).map(|i| (i % 256) as u8).collect();
        let payload = Item::unserialized(Bytes::from(data.clone()), false);
        let value = map_item(vec![("a", payload)]);

        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();
        // 2 envelope frames + ceil(100/64) == 2 body frames.
        assert_eq!(frames.len(), 4);

        let Item::Map(back) = codec.loads(frames, true, None).unwrap() else { panic!("expected map") };
        let Some(Item::Materialized(payload)) = back.get("a") else { panic!("expected materialized payload") };
        let bytes = payload.as_any().downcast_ref::<bytes::Bytes>().unwrap();
        assert_eq!(bytes.as_ref(), data.as_slice());
    }

    #[test]
    fn bytes_only_passthrough_keeps_pre_serialized_marker_when_not_deserializing() {
        let codec = codec();
        let payload = Item::unserialized(Bytes::from_static(b"small"), true);
        let value = map_item(vec![("a", payload)]);

        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();
        // bytes_only forces materialization even with deserialize=false on loads.
        let Item::Map(back) = codec.loads(frames, false, None).unwrap() else { panic!("expected map") };
        assert!(matches!(back.get("a"), Some(Item::Materialized(_))));
    }

    #[test]
    fn ordinary_payload_stays_pre_serialized_when_not_deserializing() {
        let codec = codec();
        let payload = Item::unserialized(Bytes::from_static(b"small"), false);
        let value = map_item(vec![("a", payload)]);

        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();
        let Item::Map(back) = codec.loads(frames, false, None).unwrap() else { panic!("expected map") };
        let Some(Item::Marker(PayloadMarker::PreSerialized { frames, .. })) = back.get("a") else {
            panic!("expected pre-serialized marker")
        };
        assert_eq!(frames[0].as_bytes().as_ref(), b"small");
    }

    #[test]
    fn pre_serialized_forwarding_payload_skips_resplitting() {
        let codec = codec();
        let mut header = Header::new("raw");
        header.set_lengths(&[5]);
        header.set_compression(&[None]);
        header.set_count(1);
        let marker = PayloadMarker::PreSerialized {
            header,
            frames: vec![Frame::new(Bytes::from_static(b"hello"))],
        };
        let value = map_item(vec![("a", Item::Marker(marker))]);

        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].as_bytes().as_ref(), b"hello");
    }

    #[test]
    fn serialization_failure_raises_by_default() {
        let codec = codec();
        let value = map_item(vec![("a", Item::unserialized(42i32, false))]);
        let err = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap_err();
        assert_eq!(err, EnvelopeError::SerializationFailed);
    }

    #[test]
    fn serialization_failure_under_message_mode_emits_diagnostic() {
        let codec = codec();
        let value = map_item(vec![("a", Item::unserialized(42i32, false))]);
        let frames = codec.dumps(value, &["raw"], OnError::Message, &Value::map()).unwrap();

        let Item::Map(back) = codec.loads(frames, true, None).unwrap() else { panic!("expected map") };
        let Some(Item::Materialized(payload)) = back.get("a") else { panic!("expected materialized diagnostic") };
        let record = payload.as_any().downcast_ref::<DiagnosticRecord>().unwrap();
        assert_eq!(record.kind, "SerializationFailed");
    }

    #[test]
    fn unknown_compression_codec_fails_without_partial_value() {
        let codec = codec();
        let mut header_map = IndexMap::new();
        header_map.insert("compression".to_owned(), Value::Str("brotli".to_owned()));
        let header_bytes = encode_cbor_value(&Value::Map(header_map)).unwrap();
        let frames = vec![Frame::new(header_bytes), Frame::new(Bytes::from_static(b"irrelevant"))];

        let err = codec.loads(frames, true, None).unwrap_err();
        assert_eq!(err, EnvelopeError::UnknownCompression { name: "brotli".to_owned() });
    }

    #[test]
    fn disallowed_serializer_is_rejected_on_receive() {
        let codec = codec();
        let value = map_item(vec![("a", Item::unserialized(Bytes::from_static(b"x"), false))]);
        let frames = codec.dumps(value, &["raw"], OnError::Raise, &Value::map()).unwrap();

        let err = codec.loads(frames, true, Some(&["bincode"])).unwrap_err();
        assert_eq!(err, EnvelopeError::DisallowedSerializer { name: "raw".to_owned() });
    }

    #[test]
    fn nested_structure_with_mixed_markers_round_trips() {
        let codec = codec();
        let mut pre_header = Header::new("raw");
        pre_header.set_lengths(&[1, 1]);
        pre_header.set_compression(&[None, None]);
        pre_header.set_count(2);
        let pre = PayloadMarker::PreSerialized {
            header: pre_header,
            frames: vec![Frame::new(Bytes::from_static(b"x")), Frame::new(Bytes::from_static(b"y"))],
        };

        let inner = map_item(vec![("k", Item::unserialized(SerdeValue::new(12345i64), false))]);
        let outer = map_item(vec![("outer", Item::Seq(vec![Item::Marker(pre), inner]))]);

        let frames = codec.dumps(outer, &["raw", "bincode"], OnError::Raise, &Value::map()).unwrap();
        let Item::Map(back) = codec.loads(frames, true, None).unwrap() else { panic!("expected map") };
        let Some(Item::Seq(items)) = back.get("outer") else { panic!("expected seq") };

        let Item::Materialized(pre_payload) = &items[0] else { panic!("expected materialized pre-serialized payload") };
        let pre_bytes = pre_payload.as_any().downcast_ref::<bytes::Bytes>().unwrap();
        assert_eq!(pre_bytes.as_ref(), b"xy");

        let Item::Map(inner_back) = &items[1] else { panic!("expected map") };
        let Some(Item::Materialized(k_payload)) = inner_back.get("k") else { panic!("expected materialized k") };
        let decoded = k_payload.as_any().downcast_ref::<DecodedBincode>().unwrap();
        let n: i64 = decoded.decode().unwrap();
        assert_eq!(n, 12345);
    }

    #[test]
    fn too_few_frames_is_malformed() {
        let codec = codec();
        let err = codec.loads(vec![Frame::empty()], true, None).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedEnvelope { .. }));
    }
}
