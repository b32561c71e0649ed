//! The envelope codec's error hierarchy.

use thiserror::Error;

use crate::config::ConfigError;

/// Everything that can go wrong inside `dumps`/`loads`.
///
/// Each variant carries enough structured context (codec name, frame index,
/// byte counts) to match on in tests without parsing the `Display` string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    /// No serializer family in the caller's order list accepted the payload.
    #[error("no serializer family accepted the payload")]
    SerializationFailed,

    /// A header names a compression codec the registry does not have.
    #[error("unknown compression codec: {name}")]
    UnknownCompression {
        /// The codec name the header asked for.
        name: String,
    },

    /// The receive-side allow-list rejects a serializer family named in a
    /// header.
    #[error("serializer family {name:?} is not in the allow-list")]
    DisallowedSerializer {
        /// The serializer family the header named.
        name: String,
    },

    /// Received frames cannot be merged to the declared `lengths`.
    #[error("frame merge mismatch: expected {expected} bytes, got {actual}")]
    FrameMergeMismatch {
        /// Total bytes the header's `lengths` declared.
        expected: usize,
        /// Total bytes actually present in the frame sequence.
        actual: usize,
    },

    /// The envelope payload cannot be decoded, or references out-of-range
    /// frame indices.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What specifically was wrong.
        reason: String,
    },

    /// A `Config` could not be built from its source (e.g. environment
    /// variables).
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Build an [`EnvelopeError`], emitting a critical-severity log event at the
/// same point, so the two can never happen independently (§7).
pub(crate) fn fail(err: EnvelopeError) -> EnvelopeError {
    tracing::error!(error = %err, "envelope codec error");
    err
}
