//! Client-disconnect detection.
//!
//! # Responsibilities
//! - Keep the middleware chain alive after the connection layer abandons an
//!   in-flight dispatch
//! - Tell the innermost layer that the client went away so it can give up on
//!   the handler and surface the abandoned-handler failure
//!
//! # Design Decisions
//! - The chain below [`DetachLayer`] runs on its own task; hyper dropping the
//!   dispatch future therefore cancels only the await, not the chain
//! - The disconnect signal is the drop of a `watch` sender owned by that
//!   await: no polling, no extra connection plumbing
//! - The signal travels to [`AbortOnDisconnectLayer`] through request
//!   extensions, the same channel used for per-request context elsewhere

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tower::{BoxError, Layer, Service};

use crate::error::GatewayError;
use crate::lifecycle::Drain;

/// Handle resolving once the client has abandoned the request.
///
/// Installed into request extensions by [`DetachLayer`] and consumed by
/// [`AbortOnDisconnectLayer`].
#[derive(Clone, Debug)]
pub struct ClientGone {
    rx: watch::Receiver<()>,
}

impl ClientGone {
    fn new(rx: watch::Receiver<()>) -> Self {
        Self { rx }
    }

    /// Wait until the client is gone.
    ///
    /// Pending while the dispatch is still awaited; resolves when the sender
    /// side drops, which happens exactly when the connection layer abandons
    /// the dispatch.
    pub async fn wait(mut self) {
        while self.rx.changed().await.is_ok() {}
    }
}

/// Runs the rest of the chain on a detached task so it survives the
/// connection layer dropping the dispatch on client disconnect.
#[derive(Clone, Debug)]
pub struct DetachLayer {
    drain: Drain,
}

impl DetachLayer {
    /// A permit is minted from `drain` for each dispatched request so
    /// teardown can wait for in-flight chains to finish. The handle itself
    /// holds nothing, so idle connections never delay teardown.
    pub fn new(drain: Drain) -> Self {
        Self { drain }
    }
}

impl<S> Layer<S> for DetachLayer {
    type Service = DetachService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DetachService {
            inner,
            drain: self.drain.clone(),
        }
    }
}

/// See [`DetachLayer`].
#[derive(Clone, Debug)]
pub struct DetachService<S> {
    inner: S,
    drain: Drain,
}

impl<S, B> Service<Request<B>> for DetachService<S>
where
    S: Service<Request<B>, Response = Response<Body>, Error = BoxError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Move out the service that was polled ready; keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let permit = self.drain.permit();

        Box::pin(async move {
            let (gone_tx, gone_rx) = watch::channel(());
            req.extensions_mut().insert(ClientGone::new(gone_rx));

            let chain = tokio::spawn(async move {
                let _permit = permit;
                inner.call(req).await
            });

            // `gone_tx` is owned by this future. If the connection layer
            // drops us before the chain finishes, the channel closes and the
            // abort layer fires inside the still-running task.
            let outcome = chain.await;
            drop(gone_tx);
            match outcome {
                Ok(result) => result,
                Err(join_error) => Err(Box::new(join_error) as BoxError),
            }
        })
    }
}

/// Races the handler against the client going away.
///
/// If the client disconnects first, the handler future is dropped and the
/// layer yields the abandoned-handler failure for the chain above to observe.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbortOnDisconnectLayer;

impl<S> Layer<S> for AbortOnDisconnectLayer {
    type Service = AbortOnDisconnect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AbortOnDisconnect { inner }
    }
}

/// See [`AbortOnDisconnectLayer`].
#[derive(Clone, Debug)]
pub struct AbortOnDisconnect<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for AbortOnDisconnect<S>
where
    S: Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let client_gone = req.extensions_mut().remove::<ClientGone>();

        Box::pin(async move {
            let pending = inner.call(req);
            match client_gone {
                Some(gone) => tokio::select! {
                    outcome = pending => outcome.map_err(Into::into),
                    () = gone.wait() => {
                        tracing::debug!("client gone before the handler finished");
                        Err(Box::new(GatewayError::NoResponseReturned) as BoxError)
                    }
                },
                // No detach layer above; nothing to race against.
                None => pending.await.map_err(Into::into),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use tower::{ServiceBuilder, ServiceExt};

    use super::*;
    use crate::lifecycle::drain_pair;
    use crate::middleware::observe::ErrorProbeLayer;
    use crate::probe::Probe;

    /// Handler that suspends for a fixed delay before answering 200.
    #[derive(Clone)]
    struct SlowEndpoint {
        delay: Duration,
    }

    impl Service<Request<Body>> for SlowEndpoint {
        type Response = Response<Body>;
        type Error = BoxError;
        type Future = BoxFuture<'static, Result<Response<Body>, BoxError>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Body>) -> Self::Future {
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(Response::new(Body::empty()))
            })
        }
    }

    fn slow_endpoint(delay: Duration) -> SlowEndpoint {
        SlowEndpoint { delay }
    }

    #[tokio::test]
    async fn dropped_dispatch_surfaces_the_failure() {
        let probe = Probe::new();
        let (drain, barrier) = drain_pair();
        let stack = ServiceBuilder::new()
            .layer(DetachLayer::new(drain))
            .layer(ErrorProbeLayer::new(probe.clone()))
            .layer(AbortOnDisconnectLayer)
            .service(slow_endpoint(Duration::from_secs(5)));

        let dispatch = stack.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap());
        // Dropping the dispatch mid-flight is what the connection layer does
        // when the client disconnects.
        let timed_out = tokio::time::timeout(Duration::from_millis(50), dispatch)
            .await
            .is_err();
        assert!(timed_out);

        // The detached chain finishes on its own; wait for it via the drain.
        assert!(barrier.wait(Duration::from_secs(1)).await);
        assert_eq!(
            probe.error_encountered().as_deref(),
            Some("No response returned.")
        );
    }

    #[tokio::test]
    async fn undisturbed_dispatch_completes() {
        let probe = Probe::new();
        let (drain, _barrier) = drain_pair();
        let stack = ServiceBuilder::new()
            .layer(DetachLayer::new(drain))
            .layer(ErrorProbeLayer::new(probe.clone()))
            .layer(AbortOnDisconnectLayer)
            .service(slow_endpoint(Duration::from_millis(10)));

        let response = stack
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("handler should complete");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(probe.error_encountered(), None);
    }

    #[tokio::test]
    async fn abort_layer_is_inert_without_detach() {
        let stack = ServiceBuilder::new()
            .layer(AbortOnDisconnectLayer)
            .service(slow_endpoint(Duration::from_millis(10)));

        let response = stack
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("no disconnect signal, so the handler runs to completion");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
