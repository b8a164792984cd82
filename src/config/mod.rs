//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file
//!     → loader.rs (read, parse)
//!     → validation.rs (semantic checks, all errors collected)
//!     → schema.rs types handed to the server
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{EndpointConfig, GuardConfig, ListenerConfig, MiddlewareConfig, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
