//! The frame splitter and merger (§4.3): bound oversize frames to
//! `SPLIT_THRESHOLD`-sized chunks before compression, and rejoin received
//! chunks back to the lengths a header declares.

use bytes::BytesMut;
use distwire_proto::{ByteSized, Frame, ToFrame};

use crate::error::{fail, EnvelopeError};

/// Frames strictly larger than this are split into equal-sized chunks
/// (last chunk smaller) before compression (§4.3, §6).
pub const SPLIT_THRESHOLD: usize = 64 * 1024 * 1024;

/// Split `buf` into `ceil(n / threshold)` chunks if it exceeds `threshold`;
/// otherwise return it unchanged as the sole chunk.
///
/// `buf` is generic over anything with a byte length and a way to reduce
/// to a contiguous buffer (Design Notes §9) — an ordinary [`Frame`] as
/// well as a strided view ([`distwire_proto::StridedBuffer`]). A `Frame`
/// reduces to itself at zero cost; each chunk past that point is a
/// [`Frame::slice`] over the same backing buffer — no bytes are copied.
#[must_use]
pub fn split_frame<T: ToFrame>(buf: &T, threshold: usize) -> Vec<Frame> {
    let frame = buf.to_frame();
    let len = frame.nbytes();
    if threshold == 0 || len <= threshold {
        return vec![frame];
    }

    let mut chunks = Vec::with_capacity(len.div_ceil(threshold));
    let mut offset = 0;
    while offset < len {
        let end = (offset + threshold).min(len);
        chunks.push(frame.slice(offset..end));
        offset = end;
    }
    tracing::trace!(bytes = len, threshold, chunks = chunks.len(), "split oversize frame");
    chunks
}

/// Rejoin a received frame sequence to the lengths a header declared.
///
/// When `frames` already lines up one-to-one with `lengths`, this is a
/// zero-copy no-op (each output frame is a clone, i.e. a refcount bump, of
/// the matching input frame). Otherwise frames are concatenated or
/// re-split across the length boundaries as needed.
///
/// # Errors
///
/// Returns [`EnvelopeError::FrameMergeMismatch`] if the total byte count of
/// `frames` does not equal the total of `lengths`.
pub fn merge_frames(frames: &[Frame], lengths: &[usize]) -> Result<Vec<Frame>, EnvelopeError> {
    let expected: usize = lengths.iter().sum();
    let actual: usize = frames.iter().map(Frame::nbytes).sum();
    if expected != actual {
        return Err(fail(EnvelopeError::FrameMergeMismatch { expected, actual }));
    }

    if frames.len() == lengths.len() && frames.iter().zip(lengths).all(|(f, &l)| f.nbytes() == l) {
        tracing::trace!(count = frames.len(), "merge is a zero-copy no-op: frames already aligned");
        return Ok(frames.to_vec());
    }
    tracing::trace!(
        in_frames = frames.len(),
        out_lengths = lengths.len(),
        "merge requires reshaping across frame boundaries"
    );

    // `pending` holds the not-yet-consumed tail of the input sequence, in
    // reverse so `pop` yields frames in their original order.
    let mut pending: Vec<Frame> = frames.iter().rev().cloned().collect();
    let mut merged = Vec::with_capacity(lengths.len());

    for &target in lengths {
        let mut have = 0usize;
        let mut buf = BytesMut::with_capacity(target);
        while have < target {
            let Some(next) = pending.pop() else {
                return Err(fail(EnvelopeError::FrameMergeMismatch { expected, actual }));
            };
            let remaining = target - have;
            if next.nbytes() <= remaining {
                buf.extend_from_slice(next.as_bytes());
                have += next.nbytes();
            } else {
                buf.extend_from_slice(&next.as_bytes()[..remaining]);
                pending.push(next.slice(remaining..next.nbytes()));
                have += remaining;
            }
        }
        merged.push(Frame::new(buf.freeze()));
    }

    if !pending.is_empty() {
        return Err(fail(EnvelopeError::FrameMergeMismatch { expected, actual }));
    }
    Ok(merged)
}
