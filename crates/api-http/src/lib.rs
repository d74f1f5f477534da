//! HTTP API Layer
//!
//! Webhook producers enqueue with `GET|POST /{token}`; the consumer drains
//! with `GET /{token}/extension-poll`. The same routes are also mounted
//! under `/api` for older installs.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{build_router, HttpServer, HttpServerConfig};
