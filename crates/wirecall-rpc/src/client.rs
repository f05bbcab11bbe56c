use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use wirecall_frame::{Frame, FrameType, FrameWriter, Reassembler};
use wirecall_transport::{TransportError, UdsStream};

use crate::error::{Result, RpcError};
use crate::sink::SharedWriter;
use crate::stream::{CallStream, StreamEvent};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Client-side request/stream multiplexer.
///
/// Owns one connection to an RPC server and interleaves any number of
/// concurrent logical calls over it, each correlated by a per-connection
/// request id. Connects lazily on first use and reconnects the same way
/// after a disconnect — no automatic retry of failed operations.
///
/// Cloning is cheap and shares the connection; generated stubs hold a clone.
#[derive(Clone)]
pub struct RpcClient {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
}

struct State {
    endpoint: Option<PathBuf>,
    conn: Option<Connection>,
    next_request_id: u32,
    generation: u64,
    pending_calls: HashMap<u32, mpsc::Sender<Result<Frame>>>,
    pending_streams: HashMap<u32, mpsc::Sender<StreamEvent>>,
}

struct Connection {
    writer: SharedWriter,
    /// Handle kept for shutdown; unblocks the receive loop's read.
    socket: UdsStream,
    generation: u64,
}

impl RpcClient {
    /// Create a client with no endpoint configured.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    endpoint: None,
                    conn: None,
                    next_request_id: 1,
                    generation: 0,
                    pending_calls: HashMap::new(),
                    pending_streams: HashMap::new(),
                }),
            }),
        }
    }

    /// Record the server's socket path.
    ///
    /// If a connection is live it is torn down first; outstanding calls and
    /// streams fail with [`RpcError::ConnectionLost`]. The next operation
    /// connects to the new endpoint.
    pub fn configure(&self, path: impl AsRef<Path>) {
        let mut st = self.shared.state.lock().unwrap();
        st.endpoint = Some(path.as_ref().to_path_buf());
        if let Some(generation) = st.conn.as_ref().map(|c| c.generation) {
            teardown_locked(&mut st, generation);
        }
    }

    /// Issue a unary call and block until its terminal frame arrives.
    ///
    /// Concurrent calls from other threads interleave safely on the same
    /// connection. An ERROR response surfaces as [`RpcError::Remote`];
    /// connection death as [`RpcError::ConnectionLost`].
    pub fn call(&self, method: &str, payload: impl Into<Bytes>) -> Result<Bytes> {
        let (writer, request_id, rx) = {
            let mut st = self.shared.state.lock().unwrap();
            let writer = ensure_connected_locked(&self.shared, &mut st)?;
            let request_id = alloc_request_id(&mut st);
            let (tx, rx) = mpsc::channel();
            st.pending_calls.insert(request_id, tx);
            (writer, request_id, rx)
        };

        let frame = Frame::new(request_id, FrameType::Unary, method, payload.into());
        trace!(request_id, method, "issuing call");
        self.send_initiating_frame(&writer, &frame)?;

        match rx.recv() {
            Ok(Ok(frame)) => match frame.frame_type {
                FrameType::Error => Err(remote_error(frame)),
                _ => Ok(frame.payload),
            },
            Ok(Err(err)) => Err(err),
            Err(mpsc::RecvError) => Err(RpcError::ConnectionLost),
        }
    }

    /// Issue a streaming call; returns a lazy sequence of payload chunks.
    ///
    /// The sequence ends after STREAM_END, or yields one error on an ERROR
    /// frame or connection loss. The server is free-running once it starts
    /// sending — unread chunks buffer without bound, no flow control.
    pub fn stream(&self, method: &str, payload: impl Into<Bytes>) -> Result<CallStream> {
        let (writer, request_id, rx) = {
            let mut st = self.shared.state.lock().unwrap();
            let writer = ensure_connected_locked(&self.shared, &mut st)?;
            let request_id = alloc_request_id(&mut st);
            let (tx, rx) = mpsc::channel();
            st.pending_streams.insert(request_id, tx);
            (writer, request_id, rx)
        };

        let frame = Frame::new(request_id, FrameType::Unary, method, payload.into());
        trace!(request_id, method, "opening stream");
        self.send_initiating_frame(&writer, &frame)?;

        Ok(CallStream::new(rx))
    }

    /// Close the connection and fail everything outstanding. Idempotent;
    /// the next `call`/`stream` reconnects.
    pub fn disconnect(&self) {
        let mut st = self.shared.state.lock().unwrap();
        if let Some(generation) = st.conn.as_ref().map(|c| c.generation) {
            teardown_locked(&mut st, generation);
        }
    }

    /// Whether a connection is currently live.
    pub fn is_connected(&self) -> bool {
        self.shared.state.lock().unwrap().conn.is_some()
    }

    fn send_initiating_frame(&self, writer: &SharedWriter, frame: &Frame) -> Result<()> {
        let written = writer.lock().unwrap().send(frame);
        if let Err(err) = written {
            // A half-written frame leaves the byte stream unusable; tear the
            // whole connection down rather than desynchronize the peer.
            warn!(request_id = frame.request_id, error = %err, "request write failed");
            let mut st = self.shared.state.lock().unwrap();
            st.pending_calls.remove(&frame.request_id);
            st.pending_streams.remove(&frame.request_id);
            if let Some(generation) = st.conn.as_ref().map(|c| c.generation) {
                teardown_locked(&mut st, generation);
            }
            return Err(err.into());
        }
        Ok(())
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.shared.state.lock().unwrap();
        f.debug_struct("RpcClient")
            .field("endpoint", &st.endpoint)
            .field("connected", &st.conn.is_some())
            .field("pending_calls", &st.pending_calls.len())
            .field("pending_streams", &st.pending_streams.len())
            .finish()
    }
}

fn alloc_request_id(st: &mut State) -> u32 {
    let id = st.next_request_id;
    st.next_request_id = st.next_request_id.wrapping_add(1);
    id
}

/// Connect if not connected and hand back the connection's write half.
///
/// The state lock is held across the connect: the connection slot must be
/// exclusive while it is established, and no receive loop exists yet that
/// could contend for the lock.
fn ensure_connected_locked(shared: &Arc<Shared>, st: &mut State) -> Result<SharedWriter> {
    if let Some(conn) = &st.conn {
        return Ok(conn.writer.clone());
    }

    let path = st.endpoint.clone().ok_or(RpcError::NotConfigured)?;
    let socket = UdsStream::connect(&path)?;
    let read_half = socket.try_clone()?;
    let write_half = socket.try_clone()?;

    st.generation += 1;
    let generation = st.generation;
    let writer: SharedWriter = Arc::new(Mutex::new(FrameWriter::new(write_half)));

    let loop_shared = Arc::clone(shared);
    thread::Builder::new()
        .name("wirecall-client-recv".to_string())
        .spawn(move || receive_loop(loop_shared, read_half, generation))
        .map_err(TransportError::Io)?;

    debug!(?path, generation, "client connected");
    st.conn = Some(Connection {
        writer: writer.clone(),
        socket,
        generation,
    });
    Ok(writer)
}

/// Background receive loop, one per connection.
///
/// Reads raw bytes, reassembles frames, and routes each to its waiter. Must
/// never block on anything but the socket read: waiter queues are unbounded
/// sends, and the state lock is only held for O(1) map mutations.
fn receive_loop(shared: Arc<Shared>, mut reader: UdsStream, generation: u64) {
    let mut assembler = Reassembler::new();
    let mut buf = [0u8; READ_CHUNK_SIZE];

    'read: loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(error = %err, "receive loop read failed");
                break;
            }
        };
        assembler.add(&buf[..n]);

        loop {
            match assembler.try_read_frame() {
                Ok(Some(frame)) => dispatch(&shared, frame),
                Ok(None) => break,
                Err(err) => {
                    // The stream offset can no longer be trusted.
                    warn!(error = %err, "protocol violation from server");
                    break 'read;
                }
            }
        }
    }

    let mut st = shared.state.lock().unwrap();
    teardown_locked(&mut st, generation);
}

/// Route one incoming frame to its waiter by request id.
fn dispatch(shared: &Arc<Shared>, frame: Frame) {
    let mut st = shared.state.lock().unwrap();
    let request_id = frame.request_id;

    // A call's waiter is single-use: resolve and remove in one step.
    if let Some(tx) = st.pending_calls.remove(&request_id) {
        trace!(request_id, "resolving call");
        let _ = tx.send(Ok(frame));
        return;
    }

    match frame.frame_type {
        FrameType::StreamEnd => {
            if let Some(tx) = st.pending_streams.remove(&request_id) {
                trace!(request_id, "stream ended");
                let _ = tx.send(StreamEvent::End);
                return;
            }
        }
        FrameType::Error => {
            if let Some(tx) = st.pending_streams.remove(&request_id) {
                trace!(request_id, "stream failed");
                let _ = tx.send(StreamEvent::Failed(remote_error(frame)));
                return;
            }
        }
        _ => {
            if let Some(tx) = st.pending_streams.get(&request_id) {
                let _ = tx.send(StreamEvent::Chunk(frame.payload));
                return;
            }
        }
    }

    // No waiter: the call was abandoned locally. Intentional leniency —
    // late frames are normal after a disconnect/reconfigure.
    trace!(request_id, "discarding frame with no waiter");
}

/// Tear down the connection of `generation`, failing everything pending.
///
/// The generation guard keeps a dying receive loop from tearing down a
/// newer connection established after its own.
fn teardown_locked(st: &mut State, generation: u64) {
    if st.conn.as_ref().map(|c| c.generation) != Some(generation) {
        return;
    }
    if let Some(conn) = st.conn.take() {
        let _ = conn.socket.shutdown();
    }
    debug!(generation, "connection torn down");

    for (_, tx) in st.pending_calls.drain() {
        let _ = tx.send(Err(RpcError::ConnectionLost));
    }
    for (_, tx) in st.pending_streams.drain() {
        let _ = tx.send(StreamEvent::Failed(RpcError::ConnectionLost));
    }
}

fn remote_error(frame: Frame) -> RpcError {
    RpcError::Remote {
        method: frame.method,
        message: String::from_utf8_lossy(&frame.payload).into_owned(),
    }
}
