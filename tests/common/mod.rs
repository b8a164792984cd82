//! Shared utilities for the integration suite.

use response_guard::config::schema::{GuardConfig, ObservabilityConfig};
use response_guard::observability::logging;
use response_guard::testing::BackgroundServer;

/// Install the tracing subscriber once per test binary.
pub fn init_logging() {
    logging::init(&ObservabilityConfig::default());
}

/// Scenario configuration: slow handler on an ephemeral loopback port.
///
/// `empty_response` controls whether the shim under test is installed.
/// Stop a server from async test code.
///
/// The join happens on a blocking thread so the test runtime keeps polling
/// its own tasks (such as client connection cleanup) during teardown.
#[allow(dead_code)]
pub async fn stop(server: BackgroundServer) {
    tokio::task::spawn_blocking(move || server.stop())
        .await
        .expect("teardown thread");
}

#[allow(dead_code)]
pub fn scenario_config(empty_response: bool) -> GuardConfig {
    let mut config = GuardConfig::default();
    config.endpoint.delay_ms = 1000;
    config.middleware.empty_response = empty_response;
    config
}
