//! The empty-response shim.
//!
//! When the connection layer abandons an in-flight dispatch because the
//! client disconnected, inner layers see the opaque "No response returned."
//! failure instead of a response object. Left alone, that failure propagates
//! through every wrapping layer as an unhandled error. This layer intercepts
//! exactly that condition and substitutes a valid empty `204 No Content`
//! response, so layers above always receive a real response.
//!
//! Any other failure, and every successful response, passes through
//! untouched.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use tower::{BoxError, Layer, Service};

use crate::error::GatewayError;

/// Build the substitute response: status 204, empty body.
fn empty_response() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Converts the abandoned-handler failure into an empty 204 response.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyResponseLayer;

impl EmptyResponseLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for EmptyResponseLayer {
    type Service = EmptyResponse<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EmptyResponse { inner }
    }
}

/// See [`EmptyResponseLayer`].
#[derive(Clone, Debug)]
pub struct EmptyResponse<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for EmptyResponse<S>
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

        Box::pin(async move {
            match inner.call(req).await {
                Err(error) if GatewayError::is_no_response(&error) => {
                    tracing::debug!("handler abandoned by client, substituting empty response");
                    Ok(empty_response())
                }
                outcome => outcome,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use tower::{service_fn, ServiceExt};

    use super::*;

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn converts_the_abandoned_handler_failure() {
        let stack = EmptyResponseLayer::new().layer(service_fn(
            |_req: Request<Body>| async {
                Err::<Response<Body>, BoxError>(Box::new(GatewayError::NoResponseReturned))
            },
        ));

        let response = stack.oneshot(request()).await.expect("converted to 204");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn other_failures_pass_through() {
        let stack = EmptyResponseLayer::new().layer(service_fn(
            |_req: Request<Body>| async {
                Err::<Response<Body>, BoxError>(Box::new(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "socket closed",
                )))
            },
        ));

        let error = stack.oneshot(request()).await.expect_err("not converted");
        assert!(error.to_string().contains("socket closed"));
    }

    #[tokio::test]
    async fn successful_responses_pass_through() {
        let stack = EmptyResponseLayer::new().layer(service_fn(
            |_req: Request<Body>| async {
                Ok::<_, BoxError>(Response::new(Body::from("payload")))
            },
        ));

        let response = stack.oneshot(request()).await.expect("untouched");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&bytes[..], b"payload");
    }
}
