//! Observer layers recording chain outcomes into a [`Probe`].
//!
//! These layers are instrumentation: they never alter a request or response,
//! they only record what flowed past them so a driver on another thread can
//! assert on it after the fact.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use tower::{BoxError, Layer, Service};

use crate::error::GatewayError;
use crate::probe::Probe;

/// Records the display string of any failure flowing upward, then
/// re-propagates it untouched.
#[derive(Clone, Debug)]
pub struct ErrorProbeLayer {
    probe: Probe,
}

impl ErrorProbeLayer {
    pub fn new(probe: Probe) -> Self {
        Self { probe }
    }
}

impl<S> Layer<S> for ErrorProbeLayer {
    type Service = ErrorProbe<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorProbe {
            inner,
            probe: self.probe.clone(),
        }
    }
}

/// See [`ErrorProbeLayer`].
#[derive(Clone, Debug)]
pub struct ErrorProbe<S> {
    inner: S,
    probe: Probe,
}

impl<S, B> Service<Request<B>> for ErrorProbe<S>
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

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let probe = self.probe.clone();

        Box::pin(async move {
            match inner.call(req).await {
                Ok(response) => Ok(response),
                Err(error) => {
                    probe.record_error(&error.to_string());
                    Err(error)
                }
            }
        })
    }
}

/// Outermost observer: expects a `204 No Content` response and records that
/// the failure below was handled.
///
/// A failure reaching this layer passes through untouched, so the handled
/// flag stays false; any status other than 204 is itself an error.
#[derive(Clone, Debug)]
pub struct ResponseProbeLayer {
    probe: Probe,
}

impl ResponseProbeLayer {
    pub fn new(probe: Probe) -> Self {
        Self { probe }
    }
}

impl<S> Layer<S> for ResponseProbeLayer {
    type Service = ResponseProbe<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseProbe {
            inner,
            probe: self.probe.clone(),
        }
    }
}

/// See [`ResponseProbeLayer`].
#[derive(Clone, Debug)]
pub struct ResponseProbe<S> {
    inner: S,
    probe: Probe,
}

impl<S, B> Service<Request<B>> for ResponseProbe<S>
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

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let probe = self.probe.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;
            if response.status() == StatusCode::NO_CONTENT {
                probe.mark_handled();
                Ok(response)
            } else {
                Err(Box::new(GatewayError::UnexpectedStatus(response.status())) as BoxError)
            }
        })
    }
}
