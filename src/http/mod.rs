//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs accept loop
//!     → hyper http1, one task per connection
//!     → middleware chain (see crate::middleware)
//!     → target endpoint (axum Router)
//! ```

pub mod server;

pub use server::HttpServer;
