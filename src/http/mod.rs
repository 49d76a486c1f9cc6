//! HTTP subsystem: server, instrumentation middleware, request IDs.

pub mod middleware;
pub mod request_id;
pub mod server;

pub use server::{AppServer, AppState};
