//! Local stream transport for the wirecall RPC runtime.
//!
//! Provides the bidirectional byte-stream primitive everything else builds
//! on: [`UdsStream`] for connected endpoints and [`UdsListener`] for the
//! accepting side. The upper layers only rely on the `Read`/`Write` contract
//! plus `try_clone`/`shutdown`, so an alternative local transport can be
//! slotted in without touching the frame or rpc crates.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::UdsStream;

#[cfg(unix)]
pub use uds::UdsListener;
