//! Payload markers: the two ways a "large blob, not envelope data" shows up
//! inside a structural value before `dumps` has run (§3).

use std::any::Any;
use std::fmt;

use crate::frame::Frame;
use crate::header::Header;

/// An opaque user payload handed to the serializer dispatch.
///
/// Blanket-implemented for any `'static + Send + Sync` type, the same way
/// e.g. `http::Extensions` or `tower`'s per-request state type-maps treat
/// arbitrary caller data: the core never inspects a payload's contents
/// directly, only through a [`crate::Payload`]'s `as_any` downcast inside a
/// serializer family's `accepts`/`serialize`.
pub trait Payload: Any + Send + Sync {
    /// View this payload as `dyn Any`, for a serializer family to downcast.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for dyn Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").finish_non_exhaustive()
    }
}

/// A payload marker: signals "treat this as a large blob, not envelope
/// data" at some position in the structural value (§3).
pub enum PayloadMarker {
    /// An opaque user object, not yet run through serializer dispatch.
    ///
    /// `bytes_only` mirrors the spec's "optional hint of whether it should
    /// be re-materialized on receive": when true, `loads` re-materializes
    /// this payload even if the caller asked for `deserialize = false`
    /// overall (§4.5.1 step 4e, §4.5.2 step 3c).
    Unserialized {
        /// The user object to serialize.
        payload: Box<dyn Payload>,
        /// Whether loads should always re-materialize this payload.
        bytes_only: bool,
    },
    /// A payload already reduced to `(header, frames)` by a prior
    /// serializer dispatch call, e.g. forwarded from another hop.
    PreSerialized {
        /// The payload's header.
        header: Header,
        /// The payload's frames.
        frames: Vec<Frame>,
    },
}

impl fmt::Debug for PayloadMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unserialized { bytes_only, .. } => {
                f.debug_struct("Unserialized").field("bytes_only", bytes_only).finish_non_exhaustive()
            },
            Self::PreSerialized { header, frames } => f
                .debug_struct("PreSerialized")
                .field("header", header)
                .field("frame_count", &frames.len())
                .finish(),
        }
    }
}
