/// Errors surfaced by the rpc runtime.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level error (connect, bind, accept).
    #[error("transport error: {0}")]
    Transport(#[from] wirecall_transport::TransportError),

    /// Frame-level error (encode/decode, frame I/O).
    #[error("frame error: {0}")]
    Frame(#[from] wirecall_frame::FrameError),

    /// The connection died while the operation was in flight. Carries no
    /// method detail: every waiter on the connection gets the same signal.
    #[error("connection lost")]
    ConnectionLost,

    /// `call`/`stream` was invoked before `configure`.
    #[error("no endpoint configured")]
    NotConfigured,

    /// The peer answered with an ERROR frame. An application-level failure
    /// scoped to one request; other calls on the connection are unaffected.
    #[error("{method}: {message}")]
    Remote { method: String, message: String },

    /// A response sink was used again after its terminal frame.
    #[error("response already finished for this request")]
    ResponseFinished,
}

pub type Result<T> = std::result::Result<T, RpcError>;
