//! Background server harness.
//!
//! # Design Decisions
//! - One dedicated worker thread per server, running a current-thread tokio
//!   runtime: request handling is cooperatively scheduled on a single
//!   thread while the caller keeps its own runtime
//! - Readiness is a message carrying the bound address, sent only after the
//!   listener exists; `start` blocks on it so callers never race the bind
//! - Teardown is trigger-then-join, and runs from `Drop` too, so the worker
//!   is reaped even when an assertion panics mid-test
//! - No signal handlers: the harness never owns the process signal context

use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::schema::GuardConfig;
use crate::error::GatewayError;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::unused_port;
use crate::probe::Probe;

/// How long `start` waits for the listener to report ready.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A server running on its own worker thread for the duration of one
/// scenario.
pub struct BackgroundServer {
    addr: SocketAddr,
    shutdown: Shutdown,
    worker: Option<thread::JoinHandle<()>>,
}

impl BackgroundServer {
    /// Start the server and block until its listener accepts connections.
    ///
    /// A configured port of 0 is resolved through [`unused_port`] first.
    pub fn start(mut config: GuardConfig, probe: Probe) -> Result<Self, GatewayError> {
        if config.listener.port == 0 {
            config.listener.port = unused_port()?;
        }
        let bind_addr = format!("{}:{}", config.listener.host, config.listener.port);

        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<SocketAddr, GatewayError>>();

        let worker = thread::Builder::new()
            .name("guard-server".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(error) => {
                        let _ = ready_tx.send(Err(error.into()));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
                        Ok(listener) => listener,
                        Err(error) => {
                            let _ = ready_tx.send(Err(error.into()));
                            return;
                        }
                    };
                    let addr = match listener.local_addr() {
                        Ok(addr) => addr,
                        Err(error) => {
                            let _ = ready_tx.send(Err(error.into()));
                            return;
                        }
                    };

                    let server = HttpServer::new(config, probe);
                    let _ = ready_tx.send(Ok(addr));
                    if let Err(error) = server.run(listener, signal).await {
                        tracing::error!(error = %error, "background server failed");
                    }
                });
            })?;

        let addr = match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(addr)) => addr,
            Ok(Err(error)) => {
                let _ = worker.join();
                return Err(error);
            }
            Err(_) => {
                // Worker wedged or dead; reap it so no listener outlives
                // this call.
                shutdown.trigger();
                let _ = worker.join();
                return Err(GatewayError::StartupTimeout);
            }
        };

        Ok(Self {
            addr,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop the server and join the worker thread.
    ///
    /// Blocks the calling thread until the worker has drained and exited.
    /// From async code, run this via `spawn_blocking` so the caller's
    /// runtime keeps being polled during teardown.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.trigger();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("server worker thread panicked");
            }
        }
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
