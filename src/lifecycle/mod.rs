//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → accept loop exits → drain in-flight work → join worker
//!
//! Drain (drain.rs):
//!     Every in-flight task holds a permit
//!     Teardown waits (bounded) for all permits to drop before the runtime
//!     is torn down, so late probe writes are never lost
//! ```
//!
//! No signal handlers live here: the server never owns the process signal
//! context, shutdown is always driven explicitly by whoever started it.

pub mod drain;
pub mod shutdown;

pub use drain::{drain_pair, Drain, DrainBarrier, DrainPermit};
pub use shutdown::Shutdown;
