//! Minimal echo server — routes one method and runs until killed.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! Then point any wirecall client at the printed socket path and call
//! `Echo/Echo`.

use std::sync::Arc;

use bytes::Bytes;
use wirecall::rpc::{serve, HandlerError, ResponseSink, ServiceRouter};

struct EchoRouter;

impl ServiceRouter for EchoRouter {
    fn handle(
        &self,
        method: &str,
        payload: Bytes,
        sink: &ResponseSink,
    ) -> Result<(), HandlerError> {
        match method {
            "Echo/Echo" => {
                eprintln!("echoing {} bytes", payload.len());
                sink.send_unary(payload).map_err(HandlerError::failed)
            }
            other => Err(HandlerError::UnknownMethod(other.to_string())),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let sock_dir = std::env::temp_dir().join(format!("wirecall-echo-{}", std::process::id()));
    std::fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("echo.sock");

    let server = serve(&sock_path, Arc::new(EchoRouter))?;
    eprintln!("Listening on {}", server.path().display());

    loop {
        std::thread::park();
    }
}
