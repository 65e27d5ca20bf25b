//! HTTP server module.
//!
//! Plain HTTP only: TLS is expected to terminate at the reverse proxy in
//! front of the service. The server drains in-flight requests on
//! SIGTERM/SIGINT before exiting.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
