//! Fuzz target for `DistwireCodec::loads`.
//!
//! Feeds arbitrary byte sequences, assembled into an arbitrary-length frame
//! sequence, directly into envelope decoding.
//!
//! # Invariants
//!
//! - `loads` never panics on malformed input.
//! - Malformed input is rejected with `MalformedEnvelope`,
//!   `UnknownCompression`, `FrameMergeMismatch`, or `DisallowedSerializer`
//!   — never a panic, and never a partial/inconsistent `Ok` value.

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use distwire_core::DistwireCodec;
use distwire_proto::Frame;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct ArbitraryEnvelope {
    header_frame: Vec<u8>,
    payload_frame: Vec<u8>,
    body_frames: Vec<Vec<u8>>,
    deserialize: bool,
}

fuzz_target!(|input: ArbitraryEnvelope| {
    let mut frames = Vec::with_capacity(2 + input.body_frames.len());
    frames.push(Frame::new(Bytes::from(input.header_frame)));
    frames.push(Frame::new(Bytes::from(input.payload_frame)));
    for body in input.body_frames {
        frames.push(Frame::new(Bytes::from(body)));
    }

    let codec = DistwireCodec::default();
    let _ = codec.loads(frames, input.deserialize, None);
});
