//! Test-support utilities: a background server with scoped lifetime.
//!
//! Integration scenarios need a real listener: the disconnect condition only
//! exists when an actual client abandons an actual connection. The harness
//! here runs the server on a dedicated worker thread, blocks the caller
//! until the listener is confirmed started, and tears everything down on
//! every exit path, so a failing assertion never leaks a listener into the
//! next scenario.

pub mod server;

pub use server::BackgroundServer;
