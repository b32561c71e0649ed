//! The envelope codec: payload extraction, compression negotiation, frame
//! splitting, and serializer dispatch (§4), built on the wire data model in
//! `distwire-proto`.
//!
//! The dominant entry points are [`DistwireCodec::dumps`] and
//! [`DistwireCodec::loads`]; [`compression`], [`split`], and [`dispatch`]
//! are the three components it composes, each independently usable and
//! independently extensible (a caller may register additional codecs or
//! serializer families before building a codec).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod compression;
mod config;
mod dispatch;
mod envelope;
mod error;
mod split;

pub use compression::{select_compression, Codec, CompressionError, CompressionRegistry};
pub use config::{Config, ConfigError};
pub use dispatch::{BincodeFamily, DecodedBincode, DiagnosticRecord, ErrorFamily, RawFamily, SerdeValue, SerializerFamily, SerializerRegistry};
pub use envelope::{DistwireCodec, OnError};
pub use error::EnvelopeError;
pub use split::{merge_frames, split_frame, SPLIT_THRESHOLD};
