//! Empty-response middleware and client-disconnect regression tooling.
//!
//! When a client abandons a slow request, the connection-level machinery
//! drops the in-flight dispatch and the middleware chain sees a
//! "No response returned." failure instead of a response. The
//! [`middleware::empty_response`] layer converts that failure into a valid
//! empty `204 No Content` response so it never propagates as an error.
//!
//! The crate also ships the instrumentation used to pin this contract down
//! from outside: probe state observed across threads, a background server
//! harness, and the disconnect-detection glue that makes the condition
//! reproducible against a real listener.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod net;
pub mod observability;
pub mod probe;
pub mod testing;

pub use config::schema::GuardConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use probe::Probe;
