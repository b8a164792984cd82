//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, with
//! defaults chosen so an empty config yields a working instance: ephemeral
//! port, slow handler, shim installed.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind host/port).
    pub listener: ListenerConfig,

    /// Target endpoint behavior.
    pub endpoint: EndpointConfig,

    /// Which optional middleware is installed.
    pub middleware: MiddlewareConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind (loopback by default).
    pub host: String,

    /// Port to bind; 0 means pick an unused ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

/// Target endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// How long the handler suspends before responding, in milliseconds.
    ///
    /// Kept well above any client timeout used to force a disconnect so the
    /// race resolves deterministically.
    pub delay_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

/// Optional middleware installation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Install the empty-response shim between the observers and the
    /// outermost layer.
    pub empty_response: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            empty_response: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_regression_setup() {
        let config = GuardConfig::default();
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 0);
        assert_eq!(config.endpoint.delay_ms, 1000);
        assert!(config.middleware.empty_response);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn partial_toml_overrides_only_what_it_names() {
        let config: GuardConfig = toml::from_str(
            r#"
            [endpoint]
            delay_ms = 250

            [middleware]
            empty_response = false
            "#,
        )
        .expect("parse");

        assert_eq!(config.endpoint.delay_ms, 250);
        assert!(!config.middleware.empty_response);
        assert_eq!(config.listener.host, "127.0.0.1");
    }
}
