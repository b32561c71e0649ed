//! The compression registry: named codecs with compress/decompress closures
//! behind a trait object, a process-wide preference order, and the
//! size/entropy/ratio selection policy of §4.2.

use std::io::{Read, Write};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::config::Config;
use crate::error::{fail, EnvelopeError};
use distwire_proto::{Frame, ToFrame};

/// Preference order used to pick the registry's default codec: the first
/// name in this list that is actually registered wins.
const PREFERENCE_ORDER: [&str; 4] = ["zstd", "lz4", "snappy", "zlib"];

/// Bytes below this, within the default 10 KiB sample-size budget, used for
/// the "does this already look compressed" entropy heuristic.
const ENTROPY_SAMPLE_SIZE: usize = 10 * 1024;

/// A single named compression codec.
///
/// Deliberately a trait rather than a pair of boxed closures: every built-in
/// codec wraps a single third-party crate and needs no captured state, so a
/// zero-sized marker type implementing this trait reads more plainly than a
/// closure pair, while still being exactly the "name -> {compress,
/// decompress}" shape §4.2 describes.
pub trait Codec: Send + Sync {
    /// The codec's on-wire name (e.g. `"zstd"`).
    fn name(&self) -> &'static str;
    /// Compress `data`, returning the compressed bytes.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
    /// Decompress `data`, returning the original bytes.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// A codec failed to compress or decompress its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("codec {codec} failed: {reason}")]
pub struct CompressionError {
    /// The codec that failed.
    pub codec: &'static str,
    /// What went wrong, from the underlying crate.
    pub reason: String,
}

struct ZlibCodec;

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).map_err(|e| codec_error("zlib", &e))?;
        encoder.finish().map_err(|e| codec_error("zlib", &e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|e| codec_error("zlib", &e))?;
        Ok(out)
    }
}

struct Lz4Codec;

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(data).map_err(|e| codec_error("lz4", &e))?;
        encoder.finish().map_err(|e| codec_error("lz4", &e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|e| codec_error("lz4", &e))?;
        Ok(out)
    }
}

struct ZstdCodec;

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        zstd::stream::encode_all(data, 0).map_err(|e| codec_error("zstd", &e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        zstd::stream::decode_all(data).map_err(|e| codec_error("zstd", &e))
    }
}

struct SnappyCodec;

impl Codec for SnappyCodec {
    fn name(&self) -> &'static str {
        "snappy"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut encoder = snap::write::FrameEncoder::new(Vec::new());
        encoder.write_all(data).map_err(|e| codec_error("snappy", &e))?;
        encoder.into_inner().map_err(|e| codec_error("snappy", &e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut decoder = snap::read::FrameDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|e| codec_error("snappy", &e))?;
        Ok(out)
    }
}

fn codec_error(codec: &'static str, source: &impl std::fmt::Display) -> CompressionError {
    CompressionError { codec, reason: source.to_string() }
}

/// A process-wide, name-keyed table of compression codecs (§4.2).
///
/// Built at init (typically once, via [`CompressionRegistry::with_builtins`])
/// and treated as read-only thereafter, matching §5's "no locks on the hot
/// path" resource policy.
pub struct CompressionRegistry {
    codecs: IndexMap<&'static str, Arc<dyn Codec>>,
    default: Option<String>,
}

impl CompressionRegistry {
    /// An empty registry with no codecs and no default.
    #[must_use]
    pub fn empty() -> Self {
        Self { codecs: IndexMap::new(), default: None }
    }

    /// A registry carrying the four built-in codecs (`zlib`, `lz4`, `zstd`,
    /// `snappy`), with the default chosen by preference order (zstd > lz4 >
    /// snappy > zlib).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ZstdCodec));
        registry.register(Arc::new(Lz4Codec));
        registry.register(Arc::new(SnappyCodec));
        registry.register(Arc::new(ZlibCodec));
        registry
    }

    /// Register a codec, recomputing the preferred default if this codec
    /// outranks the current one.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(codec.name(), codec);
        self.default = PREFERENCE_ORDER
            .iter()
            .find(|name| self.codecs.contains_key(*name))
            .map(|name| (*name).to_owned());
    }

    /// The codec this registry would choose absent an explicit override.
    #[must_use]
    pub fn preferred_default(&self) -> Option<String> {
        self.default.clone()
    }

    /// Look up a codec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(name)
    }

    /// Decompress `data` under the named codec, failing with
    /// [`EnvelopeError::UnknownCompression`] if the registry has no codec by
    /// that name.
    pub fn decompress(&self, name: &str, data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let codec = self
            .get(name)
            .ok_or_else(|| fail(EnvelopeError::UnknownCompression { name: name.to_owned() }))?;
        codec.decompress(data).map_err(|e| {
            fail(EnvelopeError::MalformedEnvelope { reason: e.to_string() })
        })
    }
}

impl Default for CompressionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Sample-based entropy heuristic: does the leading `ENTROPY_SAMPLE_SIZE`
/// bytes of `data` already look compressed (high byte-value entropy)?
///
/// Shannon entropy of the sample's byte distribution, normalized to `[0,
/// 1]` by dividing by 8 bits. A ratio above 0.9 is treated as "already
/// compressed" and skipped.
fn looks_compressed(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(ENTROPY_SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }
    let mut counts = [0u32; 256];
    for &byte in sample {
        counts[usize::from(byte)] += 1;
    }
    let len = sample.len() as f64;
    let entropy: f64 = counts
        .iter()
        .copied()
        .filter(|&c| c > 0)
        .map(|c| {
            let p = f64::from(c) / len;
            -p * p.log2()
        })
        .sum();
    entropy / 8.0 > 0.9
}

/// Apply the compression selection policy (§4.2) to a single buffer.
///
/// `buf` is generic over anything with a byte length and a way to reduce
/// to a contiguous buffer (Design Notes §9) — an ordinary [`Frame`] as
/// well as a strided view ([`distwire_proto::StridedBuffer`]).
///
/// Returns the frame to actually transmit (either the input reduced to a
/// contiguous frame, cloned — a cheap `Bytes` refcount bump — or newly
/// compressed bytes) and the codec name to record in the header, or `None`
/// if compression was skipped or discarded.
#[must_use]
pub fn select_compression<T: ToFrame>(
    buf: &T,
    config: &Config,
    registry: &CompressionRegistry,
) -> (Frame, Option<String>) {
    let frame = buf.to_frame();
    let data = frame.as_bytes();

    if data.len() < config.min_compress_size {
        tracing::trace!(bytes = data.len(), "skipping compression: below min_compress_size");
        return (frame.clone(), None);
    }
    if looks_compressed(data) {
        tracing::trace!(bytes = data.len(), "skipping compression: sample already looks compressed");
        return (frame.clone(), None);
    }
    let Some(name) = config.default_compression.as_deref() else {
        tracing::trace!("skipping compression: no default codec configured");
        return (frame.clone(), None);
    };
    let Some(codec) = registry.get(name) else {
        tracing::trace!(codec = name, "skipping compression: default codec not registered");
        return (frame.clone(), None);
    };

    match codec.compress(data) {
        Ok(compressed) => {
            let shrink = 1.0 - (compressed.len() as f64 / data.len() as f64);
            if shrink >= config.compression_ratio_threshold {
                tracing::trace!(codec = name, bytes = data.len(), shrunk_to = compressed.len(), "compressed frame");
                (Frame::new(compressed), Some(name.to_owned()))
            } else {
                tracing::trace!(codec = name, shrink, "discarding compression: below ratio threshold");
                (frame.clone(), None)
            }
        },
        Err(error) => {
            tracing::trace!(codec = name, %error, "discarding compression: codec failed");
            (frame.clone(), None)
        },
    }
}
