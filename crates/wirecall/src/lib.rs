//! Lightweight RPC over Unix domain sockets.
//!
//! wirecall is the hand-written runtime half of a schema-driven RPC system:
//! generated stubs marshal payloads and call into this runtime, which owns
//! the wire protocol, frame reassembly, client-side request multiplexing,
//! and server-side connection dispatch. Payloads are opaque bytes here;
//! the marshalling format belongs to the stubs.
//!
//! # Crate Structure
//!
//! - [`transport`] — Unix domain socket stream and listener
//! - [`frame`] — binary frame codec and incremental reassembler
//! - [`rpc`] — client multiplexer, server dispatcher, router/sink boundary
//!
//! # Quick start
//!
//! A server routes method names to handlers; a client multiplexes calls
//! over one connection:
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use wirecall::rpc::{serve, HandlerError, ResponseSink, RpcClient, ServiceRouter};
//!
//! struct Echo;
//!
//! impl ServiceRouter for Echo {
//!     fn handle(&self, method: &str, payload: Bytes, sink: &ResponseSink)
//!         -> Result<(), HandlerError>
//!     {
//!         match method {
//!             "Echo/Echo" => sink.send_unary(payload).map_err(HandlerError::failed),
//!             other => Err(HandlerError::UnknownMethod(other.to_string())),
//!         }
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server = serve("/tmp/echo.sock", Arc::new(Echo))?;
//!
//! let client = RpcClient::new();
//! client.configure(server.path());
//! let response = client.call("Echo/Echo", &b"hi"[..])?;
//! assert_eq!(response.as_ref(), b"hi");
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use wirecall_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wirecall_frame::*;
}

/// Re-export rpc runtime types.
pub mod rpc {
    pub use wirecall_rpc::*;
}
