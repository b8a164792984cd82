//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum Router for the target endpoint
//! - Wire up the middleware chain (disconnect glue, tracing, request ID,
//!   observers, optional empty-response shim)
//! - Accept connections and serve each on its own task
//! - Drain in-flight work on shutdown so probe writes complete before the
//!   runtime is torn down

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::routing::get;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::util::BoxCloneService;
use tower::{BoxError, Layer, ServiceBuilder, ServiceExt};
use tower_http::trace::TraceLayer;

use crate::config::schema::GuardConfig;
use crate::error::GatewayError;
use crate::lifecycle::{drain_pair, Drain, DrainBarrier};
use crate::middleware::{
    AbortOnDisconnectLayer, DetachLayer, EmptyResponseLayer, ErrorProbeLayer, RequestIdLayer,
    ResponseProbeLayer,
};
use crate::probe::Probe;

/// How long teardown waits for in-flight chains before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The fully layered application, boxed for a nameable type.
type AppStack<B> = BoxCloneService<Request<B>, Response<Body>, BoxError>;

/// State injected into the target endpoint.
#[derive(Clone)]
struct EndpointState {
    delay: Duration,
}

/// HTTP server wrapping the instrumented middleware chain.
pub struct HttpServer {
    stack: AppStack<Incoming>,
    barrier: DrainBarrier,
    config: GuardConfig,
}

impl HttpServer {
    /// Create a new server from a configuration and a probe to report into.
    pub fn new(config: GuardConfig, probe: Probe) -> Self {
        let (drain, barrier) = drain_pair();
        let stack = build_stack(&config, &probe, drain);
        Self {
            stack,
            barrier,
            config,
        }
    }

    /// Accept connections on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), GatewayError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            empty_response = self.config.middleware.empty_response,
            "server listening"
        );

        let HttpServer { stack, barrier, .. } = self;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    tracing::debug!(peer = %peer, "connection accepted");

                    let stack = stack.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        // hyper needs a concrete infallible service, so chain
                        // errors are resolved here rather than bubbled up.
                        let service = service_fn(move |req: Request<Incoming>| {
                            let stack = stack.clone();
                            async move {
                                let response = match stack.oneshot(req).await {
                                    Ok(response) => response,
                                    Err(error) => {
                                        tracing::error!(error = %error, "request failed unhandled");
                                        let mut response = Response::new(Body::empty());
                                        *response.status_mut() =
                                            StatusCode::INTERNAL_SERVER_ERROR;
                                        response
                                    }
                                };
                                Ok::<_, Infallible>(response)
                            }
                        });
                        if let Err(error) = http1::Builder::new().serve_connection(io, service).await {
                            // Expected for abandoned requests: the peer is
                            // already gone when the chain produces a result.
                            tracing::debug!(peer = %peer, error = %error, "connection ended");
                        }
                    });
                }
            }
        }

        drop(listener);
        if !barrier.wait(DRAIN_TIMEOUT).await {
            tracing::warn!("teardown proceeded with requests still in flight");
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

/// Compose the middleware chain around the target endpoint.
///
/// Outermost to innermost: detach glue, request ID, trace, response probe,
/// optional empty-response shim, two error probes, disconnect abort, router.
fn build_stack<B>(config: &GuardConfig, probe: &Probe, drain: Drain) -> AppStack<B>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let endpoint = Router::new().route("/", get(index)).with_state(EndpointState {
        delay: Duration::from_millis(config.endpoint.delay_ms),
    });

    let observed = ServiceBuilder::new()
        // Two identical observer layers, deliberately: with a single layer
        // the abandoned-handler failure surfaces at the connection level
        // instead of inside the chain, and the probe never sees it.
        .layer(ErrorProbeLayer::new(probe.clone()))
        .layer(ErrorProbeLayer::new(probe.clone()))
        .layer(AbortOnDisconnectLayer)
        .service(endpoint);

    let shimmed: AppStack<B> = if config.middleware.empty_response {
        BoxCloneService::new(EmptyResponseLayer::new().layer(observed))
    } else {
        BoxCloneService::new(observed)
    };

    let stack = ServiceBuilder::new()
        .layer(DetachLayer::new(drain))
        .layer(RequestIdLayer)
        // Trace wraps the body in its own type; fold it back so the layers
        // above keep seeing the plain body.
        .map_response(|response: Response<_>| response.map(Body::new))
        .layer(TraceLayer::new_for_http())
        .layer(ResponseProbeLayer::new(probe.clone()))
        .service(shimmed);

    BoxCloneService::new(stack)
}

/// Target endpoint: suspend long enough for an impatient client to give up,
/// then report no content.
async fn index(State(state): State<EndpointState>) -> StatusCode {
    tokio::time::sleep(state.delay).await;
    StatusCode::NO_CONTENT
}
