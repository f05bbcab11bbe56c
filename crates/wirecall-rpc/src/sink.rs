use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use wirecall_frame::{Frame, FrameType, FrameWriter};
use wirecall_transport::UdsStream;

use crate::error::{Result, RpcError};

/// Write half of a connection, shared by every in-flight response on it.
/// The mutex serializes whole frames; interleaving below frame granularity
/// would corrupt the stream.
pub(crate) type SharedWriter = Arc<Mutex<FrameWriter<UdsStream>>>;

/// Per-request handle a handler uses to emit response frames.
///
/// Bound to one connection and one request id. Exactly one terminal frame
/// concludes the request: `send_unary`, `send_end`, or `send_error`. Chunks
/// may precede `send_end` any number of times. Frames go out in call order,
/// unbuffered.
pub struct ResponseSink {
    writer: SharedWriter,
    request_id: u32,
    method: String,
    finished: AtomicBool,
}

impl ResponseSink {
    pub(crate) fn new(writer: SharedWriter, request_id: u32, method: String) -> Self {
        Self {
            writer,
            request_id,
            method,
            finished: AtomicBool::new(false),
        }
    }

    /// The request this sink answers.
    pub fn request_id(&self) -> u32 {
        self.request_id
    }

    /// The method the request named.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Send the single response of a unary call. Terminal.
    pub fn send_unary(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.finish()?;
        self.write(FrameType::Unary, payload.into())
    }

    /// Send one stream element. Valid any number of times before the
    /// terminal frame.
    pub fn send_chunk(&self, payload: impl Into<Bytes>) -> Result<()> {
        if self.finished.load(Ordering::Acquire) {
            return Err(RpcError::ResponseFinished);
        }
        self.write(FrameType::StreamChunk, payload.into())
    }

    /// Terminate a stream normally. Terminal.
    pub fn send_end(&self) -> Result<()> {
        self.finish()?;
        self.write(FrameType::StreamEnd, Bytes::new())
    }

    /// Report an application error for this request. Terminal; supersedes
    /// any further chunks.
    pub fn send_error(&self, message: &str) -> Result<()> {
        self.finish()?;
        self.write(FrameType::Error, Bytes::copy_from_slice(message.as_bytes()))
    }

    /// Whether a terminal frame has been sent.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn finish(&self) -> Result<()> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(RpcError::ResponseFinished);
        }
        Ok(())
    }

    fn write(&self, frame_type: FrameType, payload: Bytes) -> Result<()> {
        let frame = Frame::new(self.request_id, frame_type, self.method.clone(), payload);
        self.writer.lock().unwrap().send(&frame)?;
        Ok(())
    }
}

impl std::fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSink")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use wirecall_frame::Reassembler;
    use wirecall_transport::UdsListener;

    use super::*;

    fn socket_sink(tag: &str) -> (ResponseSink, UdsStream) {
        let dir = std::env::temp_dir().join(format!("wirecall-sink-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sink.sock");
        let listener = UdsListener::bind(&path).unwrap();

        let path_clone = path.clone();
        let connector = std::thread::spawn(move || UdsStream::connect(&path_clone).unwrap());
        let server_side = listener.accept().unwrap();
        let client_side = connector.join().unwrap();

        let writer = Arc::new(Mutex::new(FrameWriter::new(server_side)));
        (ResponseSink::new(writer, 7, "Svc/M".to_string()), client_side)
    }

    fn read_frames(reader: &mut UdsStream, count: usize) -> Vec<Frame> {
        let mut asm = Reassembler::new();
        let mut frames = Vec::new();
        let mut buf = [0u8; 1024];
        while frames.len() < count {
            let n = reader.read(&mut buf).unwrap();
            assert!(n > 0);
            asm.add(&buf[..n]);
            while let Some(frame) = asm.try_read_frame().unwrap() {
                frames.push(frame);
            }
        }
        frames
    }

    #[test]
    fn unary_is_terminal() {
        let (sink, mut peer) = socket_sink("unary");

        sink.send_unary(&b"result"[..]).unwrap();
        assert!(sink.is_finished());
        assert!(matches!(
            sink.send_unary(&b"again"[..]),
            Err(RpcError::ResponseFinished)
        ));
        assert!(matches!(
            sink.send_chunk(&b"late"[..]),
            Err(RpcError::ResponseFinished)
        ));

        let frames = read_frames(&mut peer, 1);
        assert_eq!(frames[0].frame_type, FrameType::Unary);
        assert_eq!(frames[0].request_id, 7);
        assert_eq!(frames[0].method, "Svc/M");
        assert_eq!(frames[0].payload.as_ref(), b"result");
    }

    #[test]
    fn chunks_then_end_in_order() {
        let (sink, mut peer) = socket_sink("chunks");

        sink.send_chunk(&b"c1"[..]).unwrap();
        sink.send_chunk(&b"c2"[..]).unwrap();
        sink.send_end().unwrap();
        assert!(matches!(sink.send_end(), Err(RpcError::ResponseFinished)));

        let frames = read_frames(&mut peer, 3);
        assert_eq!(frames[0].frame_type, FrameType::StreamChunk);
        assert_eq!(frames[0].payload.as_ref(), b"c1");
        assert_eq!(frames[1].payload.as_ref(), b"c2");
        assert_eq!(frames[2].frame_type, FrameType::StreamEnd);
        assert!(frames[2].payload.is_empty());
    }

    #[test]
    fn error_supersedes_further_chunks() {
        let (sink, mut peer) = socket_sink("error");

        sink.send_chunk(&b"c1"[..]).unwrap();
        sink.send_error("boom").unwrap();
        assert!(matches!(
            sink.send_chunk(&b"c2"[..]),
            Err(RpcError::ResponseFinished)
        ));

        let frames = read_frames(&mut peer, 2);
        assert_eq!(frames[1].frame_type, FrameType::Error);
        assert_eq!(frames[1].payload.as_ref(), b"boom");
    }
}
