//! Wire format for the wirecall RPC protocol.
//!
//! Every message on the wire is one self-delimiting frame:
//!
//! ```text
//! version(1) · requestId(4 BE) · frameType(1) · methodLen(4 BE)
//! · method(methodLen) · payloadLen(4 BE) · payload(payloadLen)
//! ```
//!
//! The format is implementation-neutral: any conforming peer, in any
//! language, produces byte-identical frames. Payloads are opaque to this
//! layer; marshalling belongs to generated stubs.

pub mod codec;
pub mod error;
pub mod reassembler;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameType, HEADER_SIZE, PROTOCOL_VERSION,
};
pub use error::{FrameError, Result};
pub use reassembler::Reassembler;
pub use writer::FrameWriter;
