//! Runtime core of wirecall: the client-side request multiplexer and the
//! server-side connection dispatcher.
//!
//! Generated stubs are the intended callers. On the client they marshal a
//! request and invoke [`RpcClient::call`] or [`RpcClient::stream`]; on the
//! server they implement [`ServiceRouter`] and answer through a
//! [`ResponseSink`]. This crate owns everything in between: one physical
//! connection shared by any number of concurrent logical calls, correlated
//! by request id, with deterministic error fan-out when the connection dies.
//!
//! No deadlines, no retries, no backpressure — callers layer those on top.

pub mod client;
pub mod error;
pub mod router;
pub mod server;
pub mod sink;
pub mod stream;

pub use client::RpcClient;
pub use error::{Result, RpcError};
pub use router::{HandlerError, ServiceRouter};
pub use server::{serve, ServerHandle};
pub use sink::ResponseSink;
pub use stream::CallStream;
