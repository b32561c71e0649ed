//! Errors raised while converting between [`crate::Value`] and the CBOR wire
//! representation.

use thiserror::Error;

/// Errors that can occur while converting a [`crate::Value`] to or from its
/// CBOR on-wire form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// A CBOR map used a non-string key.
    ///
    /// The envelope format requires unicode-string keys throughout (§6); a
    /// peer sending integer- or byte-string-keyed maps is non-conformant.
    #[error("map key is not a string")]
    NonStringKey,

    /// A CBOR integer did not fit in the range this implementation supports.
    #[error("integer out of range: {0}")]
    IntegerOutOfRange(String),

    /// A CBOR major type this implementation does not represent (e.g. a tag).
    #[error("unsupported CBOR value kind: {0}")]
    UnsupportedKind(&'static str),
}
