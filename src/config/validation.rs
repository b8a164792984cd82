//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! All errors are collected and returned together, not just the first.

use crate::config::schema::GuardConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Host is not a parseable IP address.
    InvalidHost(String),
    /// Handler delay of zero would make the disconnect race nondeterministic.
    ZeroDelay,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidHost(host) => {
                write!(f, "listener.host is not an IP address: {}", host)
            }
            ValidationError::ZeroDelay => write!(f, "endpoint.delay_ms must be greater than 0"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.parse::<std::net::IpAddr>().is_err() {
        errors.push(ValidationError::InvalidHost(config.listener.host.clone()));
    }

    if config.endpoint.delay_ms == 0 {
        errors.push(ValidationError::ZeroDelay);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        validate_config(&GuardConfig::default()).expect("defaults validate");
    }

    #[test]
    fn collects_every_error() {
        let mut config = GuardConfig::default();
        config.listener.host = "not-an-ip".to_string();
        config.endpoint.delay_ms = 0;

        let errors = validate_config(&config).expect_err("two problems");
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::ZeroDelay));
    }
}
