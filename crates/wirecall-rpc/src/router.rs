use bytes::Bytes;

use crate::sink::ResponseSink;

/// Dispatch table from method name to handler invocation.
///
/// Implementations are produced by the stub generator: one router per
/// service, matching on the method string, unmarshalling the payload, and
/// answering through the sink. Routers are shared read-only across all
/// connections and invoked concurrently, hence `Send + Sync`.
///
/// Returning `Err` makes the dispatcher emit an ERROR frame with the
/// error's display text (unless the handler already sent its terminal
/// frame). Handlers only call [`ResponseSink::send_error`] themselves for
/// deliberate application errors.
pub trait ServiceRouter: Send + Sync {
    fn handle(
        &self,
        method: &str,
        payload: Bytes,
        sink: &ResponseSink,
    ) -> std::result::Result<(), HandlerError>;
}

/// Failure signaled by a router or handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The router has no handler for the method. The resulting ERROR frame
    /// names the method, so callers of a nonexistent method see a normal
    /// application error rather than a dropped connection.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Wrap an arbitrary failure message.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        HandlerError::Failed(message.to_string())
    }
}
