//! End-to-end demo of a unary and a streaming method on one service.
//!
//! Plays both roles in one process: serves `UserService`, then calls it.
//! The JSON marshalling here stands in for what generated stubs normally
//! do — the runtime itself never looks inside the payloads.
//!
//! Run with:
//!   cargo run --example user-service

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use wirecall::rpc::{serve, HandlerError, ResponseSink, RpcClient, ServiceRouter};

#[derive(Serialize, Deserialize)]
struct GetUserRequest {
    id: u64,
}

#[derive(Serialize, Deserialize)]
struct GetUserResponse {
    name: String,
    email: String,
}

#[derive(Serialize, Deserialize)]
struct ListUsersRequest {
    query: String,
}

struct UserRouter;

impl ServiceRouter for UserRouter {
    fn handle(
        &self,
        method: &str,
        payload: Bytes,
        sink: &ResponseSink,
    ) -> Result<(), HandlerError> {
        match method {
            "UserService/GetUser" => {
                let request: GetUserRequest =
                    serde_json::from_slice(&payload).map_err(HandlerError::failed)?;
                eprintln!("  server ← GetUser(id: {})", request.id);
                let response = GetUserResponse {
                    name: format!("User {}", request.id),
                    email: format!("user{}@example.com", request.id),
                };
                let body = serde_json::to_vec(&response).map_err(HandlerError::failed)?;
                sink.send_unary(body).map_err(HandlerError::failed)
            }
            "UserService/ListUsers" => {
                let request: ListUsersRequest =
                    serde_json::from_slice(&payload).map_err(HandlerError::failed)?;
                eprintln!("  server ← ListUsers(query: {})", request.query);
                for i in 1..=3u64 {
                    let item = GetUserResponse {
                        name: format!("User {i}"),
                        email: format!("user{i}@example.com"),
                    };
                    let body = serde_json::to_vec(&item).map_err(HandlerError::failed)?;
                    sink.send_chunk(body).map_err(HandlerError::failed)?;
                }
                sink.send_end().map_err(HandlerError::failed)
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

    let sock_dir = std::env::temp_dir().join(format!("wirecall-users-{}", std::process::id()));
    std::fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("users.sock");

    let mut server = serve(&sock_path, Arc::new(UserRouter))?;

    let client = RpcClient::new();
    client.configure(&sock_path);

    println!("→ GetUser(id: 42)");
    let body = serde_json::to_vec(&GetUserRequest { id: 42 })?;
    let response = client.call("UserService/GetUser", body)?;
    let user: GetUserResponse = serde_json::from_slice(&response)?;
    println!("← name: {}, email: {}", user.name, user.email);

    println!("→ ListUsers(query: \"all\")");
    let body = serde_json::to_vec(&ListUsersRequest {
        query: "all".to_string(),
    })?;
    for chunk in client.stream("UserService/ListUsers", body)? {
        let user: GetUserResponse = serde_json::from_slice(&chunk?)?;
        println!("← name: {}, email: {}", user.name, user.email);
    }

    println!("→ Calling unknown method");
    match client.call("UserService/NonExistent", &b"{}"[..]) {
        Err(err) => println!("← error: {err}"),
        Ok(_) => println!("← unexpected success"),
    }

    client.disconnect();
    server.close();
    let _ = std::fs::remove_dir_all(&sock_dir);
    Ok(())
}
