//! The wire's unit of transport: a contiguous byte frame, plus the
//! byte-size probe (component 4.1) that reports a frame-like buffer's exact
//! extent without copying it.

use bytes::Bytes;

/// A contiguous, cheaply-cloneable byte frame.
///
/// Frames are transmitted in order and never concatenated across
/// boundaries (§3). Cloning a [`Frame`] is a reference-count bump, not a
/// copy — the same backing allocation can be sliced by the splitter (§4.3)
/// and handed to a compressor without reallocating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame(Bytes);

impl Frame {
    /// Wrap an existing byte buffer as a frame.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// An empty frame (used for e.g. an uncompressed envelope header).
    #[must_use]
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Borrow the frame's bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consume the frame, yielding its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Zero-copy sub-slice of this frame.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds, per [`Bytes::slice`].
    #[must_use]
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self(self.0.slice(range))
    }
}

impl From<Bytes> for Frame {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A view over a multi-dimensional or strided buffer (e.g. an array view)
/// whose byte extent is `product(shape) * item_size`, distinct from its
/// backing allocation's length.
///
/// This is the concrete carrier for the "strided view" case of the
/// byte-size probe (§4.1): the backing `data` may be larger than the
/// logical view (e.g. a sub-array), so the probe must compute the extent
/// from `shape`/`item_size` rather than `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StridedBuffer {
    data: Bytes,
    shape: Vec<usize>,
    item_size: usize,
}

impl StridedBuffer {
    /// Construct a strided view over `data` with the given `shape` (extent
    /// along each dimension) and `item_size` (bytes per element).
    #[must_use]
    pub fn new(data: Bytes, shape: Vec<usize>, item_size: usize) -> Self {
        Self { data, shape, item_size }
    }

    /// The backing buffer this view was constructed over.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Reports the byte extent of a frame-like object without copying it.
///
/// For contiguous buffers this is simply their length; for
/// [`StridedBuffer`] it is `product(shape) * item_size`. Used by the
/// splitter, the compression heuristic, and to populate a header's
/// `lengths` field.
pub trait ByteSized {
    /// The number of bytes this buffer occupies, logically.
    fn nbytes(&self) -> usize;
}

impl ByteSized for Frame {
    fn nbytes(&self) -> usize {
        self.0.len()
    }
}

impl ByteSized for Bytes {
    fn nbytes(&self) -> usize {
        self.len()
    }
}

impl ByteSized for [u8] {
    fn nbytes(&self) -> usize {
        self.len()
    }
}

impl ByteSized for Vec<u8> {
    fn nbytes(&self) -> usize {
        self.len()
    }
}

impl ByteSized for StridedBuffer {
    fn nbytes(&self) -> usize {
        self.shape.iter().product::<usize>() * self.item_size
    }
}

/// Reinterprets a frame-like buffer as a contiguous [`Frame`] (§4.5.1 step
/// 5: "for any frame that is a non-contiguous view, either reinterpret as
/// contiguous bytes or copy to bytes"), so the splitter and the
/// compression heuristic can stay generic over anything with a byte length
/// and read-into capability (Design Notes §9) while still doing their
/// actual slicing against one concrete representation.
pub trait ToFrame: ByteSized {
    /// Produce a contiguous [`Frame`] covering this buffer's logical
    /// extent ([`ByteSized::nbytes`]).
    fn to_frame(&self) -> Frame;
}

impl ToFrame for Frame {
    fn to_frame(&self) -> Frame {
        self.clone()
    }
}

impl ToFrame for StridedBuffer {
    fn to_frame(&self) -> Frame {
        Frame::new(self.data.slice(0..self.nbytes()))
    }
}
