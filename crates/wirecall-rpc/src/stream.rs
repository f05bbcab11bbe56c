use std::sync::mpsc;

use bytes::Bytes;

use crate::error::{Result, RpcError};

/// What the receive loop pushes to an open stream's queue.
#[derive(Debug)]
pub(crate) enum StreamEvent {
    Chunk(Bytes),
    End,
    Failed(RpcError),
}

/// Lazy, finite sequence of payload chunks from a streaming call.
///
/// Chunks arrive in the order the server wrote them. Iteration ends with
/// `None` after the stream's terminal frame; an application error or
/// connection loss yields a single `Err` item first. Not restartable.
///
/// The consumer drives iteration at its own pace — unread chunks are
/// buffered without bound on the receive side, so a slow consumer never
/// blocks the connection's receive loop (and exerts no backpressure on the
/// server).
pub struct CallStream {
    rx: mpsc::Receiver<StreamEvent>,
    done: bool,
}

impl CallStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx, done: false }
    }
}

impl Iterator for CallStream {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(StreamEvent::Chunk(payload)) => Some(Ok(payload)),
            Ok(StreamEvent::End) => {
                self.done = true;
                None
            }
            Ok(StreamEvent::Failed(err)) => {
                self.done = true;
                Some(Err(err))
            }
            // Sender side vanished without a terminal event; the client
            // state that owned it is gone.
            Err(mpsc::RecvError) => {
                self.done = true;
                Some(Err(RpcError::ConnectionLost))
            }
        }
    }
}

impl std::fmt::Debug for CallStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallStream").field("done", &self.done).finish()
    }
}
