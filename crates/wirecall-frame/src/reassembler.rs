use bytes::BytesMut;

use crate::codec::{decode_frame, Frame};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Incremental frame parser over an arbitrarily-chunked byte stream.
///
/// Feed raw bytes with [`add`](Reassembler::add) as they arrive, then drain
/// complete frames with [`try_read_frame`](Reassembler::try_read_frame)
/// until it returns `Ok(None)`. Chunk boundaries are irrelevant: a frame may
/// be split anywhere, including inside the header.
///
/// Pure state machine — no I/O. The buffer is append-only with a consumed
/// cursor (`BytesMut`), never rebuilt by concatenation, so `add` is O(1)
/// amortized and memory stays bounded by the undecoded tail.
#[derive(Debug, Default)]
pub struct Reassembler {
    buf: BytesMut,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append raw bytes received from the transport.
    pub fn add(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Try to decode one complete frame from the front of the buffer.
    ///
    /// `Ok(None)` means "not enough bytes yet" — never an error. Truncation
    /// is handled by waiting for more input, so a partial frame is
    /// indistinguishable from no frame. Errors are reserved for genuine
    /// protocol violations (unknown frame type), after which the byte stream
    /// offset can no longer be trusted.
    pub fn try_read_frame(&mut self) -> Result<Option<Frame>> {
        decode_frame(&mut self.buf)
    }

    /// Number of buffered, not-yet-decoded bytes.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
