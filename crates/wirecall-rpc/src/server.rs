use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, trace, warn};

use wirecall_frame::{Frame, FrameWriter, Reassembler};
use wirecall_transport::{TransportError, UdsListener, UdsStream};

use crate::error::Result;
use crate::router::ServiceRouter;
use crate::sink::{ResponseSink, SharedWriter};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Bind `path` and serve `router` until the returned handle is closed.
///
/// Each accepted connection gets its own reader thread; each request on a
/// connection gets its own handler invocation, so a slow handler never
/// blocks the connection's read loop (request pipelining). The router is
/// shared read-only across all of them.
pub fn serve(path: impl AsRef<Path>, router: Arc<dyn ServiceRouter>) -> Result<ServerHandle> {
    let listener = UdsListener::bind(path)?;
    let path = listener.path().to_path_buf();
    let shutdown = Arc::new(AtomicBool::new(false));

    let loop_shutdown = Arc::clone(&shutdown);
    let accept_thread = thread::Builder::new()
        .name("wirecall-accept".to_string())
        .spawn(move || accept_loop(listener, router, loop_shutdown))
        .map_err(TransportError::Io)?;

    info!(?path, "rpc server serving");
    Ok(ServerHandle {
        path,
        shutdown,
        accept_thread: Some(accept_thread),
    })
}

/// Running server. Closing (or dropping) it stops accepting and releases
/// the socket path; connections already accepted run to their natural end.
pub struct ServerHandle {
    path: PathBuf,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// The socket path the server is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting and release the bound path. Idempotent.
    pub fn close(&mut self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            // Nudge the blocking accept awake so the loop observes the flag.
            let _ = UdsStream::connect(&self.path);
        }
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        debug!(path = ?self.path, "rpc server closed");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("path", &self.path)
            .field("closed", &self.shutdown.load(Ordering::SeqCst))
            .finish()
    }
}

fn accept_loop(listener: UdsListener, router: Arc<dyn ServiceRouter>, shutdown: Arc<AtomicBool>) {
    loop {
        let stream = match listener.accept() {
            Ok(stream) => stream,
            Err(err) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        if shutdown.load(Ordering::SeqCst) {
            // The close() nudge, or a client racing shutdown.
            break;
        }

        let router = Arc::clone(&router);
        let spawned = thread::Builder::new()
            .name("wirecall-conn".to_string())
            .spawn(move || run_connection(stream, router));
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn connection thread");
        }
    }
    debug!("accept loop stopped");
    // Dropping the listener removes the socket file.
}

/// Per-connection loop: reassemble requests, dispatch each to the router.
fn run_connection(stream: UdsStream, router: Arc<dyn ServiceRouter>) {
    let writer: SharedWriter = match stream.try_clone() {
        Ok(write_half) => Arc::new(Mutex::new(FrameWriter::new(write_half))),
        Err(err) => {
            warn!(error = %err, "failed to split accepted connection");
            return;
        }
    };
    let mut reader = stream;
    let mut assembler = Reassembler::new();
    let mut buf = [0u8; READ_CHUNK_SIZE];

    'read: loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(error = %err, "connection read failed");
                break;
            }
        };
        assembler.add(&buf[..n]);

        loop {
            match assembler.try_read_frame() {
                Ok(Some(request)) => dispatch_request(request, &writer, &router),
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "protocol violation from client");
                    break 'read;
                }
            }
        }
    }

    // Close both directions; handlers still running for this connection are
    // abandoned — their sink writes fail and nothing more goes on the wire.
    let _ = reader.shutdown();
    debug!("connection closed");
}

/// Hand one request to the router on its own thread.
///
/// A handler `Err` becomes an ERROR frame unless the handler already sent
/// its terminal frame, so routers never catch-and-forward their own
/// failures.
fn dispatch_request(request: Frame, writer: &SharedWriter, router: &Arc<dyn ServiceRouter>) {
    trace!(
        request_id = request.request_id,
        method = %request.method,
        "dispatching request"
    );
    let sink = ResponseSink::new(
        Arc::clone(writer),
        request.request_id,
        request.method.clone(),
    );
    let router = Arc::clone(router);

    let spawned = thread::Builder::new()
        .name("wirecall-handler".to_string())
        .spawn(move || {
            if let Err(err) = router.handle(&request.method, request.payload.clone(), &sink) {
                if sink.is_finished() {
                    debug!(
                        request_id = request.request_id,
                        error = %err,
                        "handler failed after responding"
                    );
                } else if let Err(send_err) = sink.send_error(&err.to_string()) {
                    debug!(
                        request_id = request.request_id,
                        error = %send_err,
                        "could not deliver handler error"
                    );
                }
            }
        });
    if let Err(err) = spawned {
        warn!(error = %err, "failed to spawn handler thread");
    }
}
