//! Wire-level data model for the distwire envelope protocol.
//!
//! This crate holds the types that describe *what* goes on the wire but not
//! the algorithm that puts it there: [`Item`], the recursive structural value
//! a caller hands to `dumps` and gets back from `loads` (carrying
//! [`PayloadMarker`] leaves), the plainer [`Value`] that the two envelope
//! frames actually encode once markers have been replaced by placeholders,
//! [`Path`]/[`PathStep`] for locating a node inside either tree,
//! [`Frame`]/[`ByteSized`] for zero-copy byte buffers, and the
//! [`Placeholder`]/[`Header`] pair that the envelope codec (in
//! `distwire-core`) reads and writes.
//!
//! Mirrors the split in the teacher workspace between a low-level `-proto`
//! crate (plain data, no algorithmic state) and a higher `-core` crate that
//! drives it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod frame;
mod header;
mod item;
mod marker;
mod path;
mod placeholder;
mod value;

pub use error::ValueError;
pub use frame::{ByteSized, Frame, StridedBuffer, ToFrame};
pub use header::Header;
pub use item::Item;
pub use marker::{Payload, PayloadMarker};
pub use path::{Path, PathStep};
pub use placeholder::{Placeholder, SENTINEL_FCOUNT, SENTINEL_FINDEX, SENTINEL_HEADER};
pub use value::Value;
