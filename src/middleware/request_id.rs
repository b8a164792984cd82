//! Request ID propagation.
//!
//! # Responsibilities
//! - Generate a UUID `x-request-id` for requests that arrive without one
//! - Make the ID available to handlers via request extensions
//! - Echo the ID on the response
//!
//! # Design Decisions
//! - Added as early as possible so every log line below carries the ID
//! - Client-supplied IDs are trusted and passed through unchanged

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{BoxError, Layer, Service};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request extension holding the ID assigned to this request.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Assigns and propagates `x-request-id`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// See [`RequestIdLayer`].
#[derive(Clone, Debug)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestIdService<S>
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
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Ok(value) = HeaderValue::from_str(&id) {
            req.headers_mut().insert(X_REQUEST_ID, value);
        }
        req.extensions_mut().insert(RequestId(id.clone()));

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            if !response.headers().contains_key(X_REQUEST_ID) {
                if let Ok(value) = HeaderValue::from_str(&id) {
                    response.headers_mut().insert(X_REQUEST_ID, value);
                }
            }
            Ok(response)
        })
    }
}
