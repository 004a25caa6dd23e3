//! HTTP gateway for DynamicKV.
//!
//! The gateway is the only component aware of HTTP semantics: it maps
//! REST verbs and paths onto store and query operations, enforces the
//! JSON request/response shapes, and translates typed store errors into
//! status codes. Each request is stateless - fully described by method,
//! path and body.
//!
//! The corpus this server sits on carries no HTTP framework, so the
//! transport implements the small HTTP/1.1 subset it needs (request line,
//! headers, `Content-Length` bodies) directly over tokio.

pub mod config;
pub mod http;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use http::{Method, Request, Response};
pub use router::Gateway;
pub use server::Server;
