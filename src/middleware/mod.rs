//! Middleware chain subsystem.
//!
//! # Data Flow
//! ```text
//! Connection dispatch
//!     → disconnect.rs DetachLayer (chain survives a dropped dispatch)
//!     → request_id.rs (x-request-id in, echoed out)
//!     → tower-http TraceLayer
//!     → observe.rs ResponseProbeLayer (validates the final response)
//!     → empty_response.rs (converts the abandoned-handler failure to 204)
//!     → observe.rs ErrorProbeLayer x2 (records failure messages)
//!     → disconnect.rs AbortOnDisconnectLayer (raises the failure)
//!     → target endpoint
//! ```
//!
//! All layers are tower `Layer`/`Service` pairs over `http::Request<B>` with
//! `Response = http::Response<axum::body::Body>` and `Error = tower::BoxError`,
//! so failures travel the chain as values rather than aborting it.

pub mod disconnect;
pub mod empty_response;
pub mod observe;
pub mod request_id;

pub use disconnect::{AbortOnDisconnectLayer, ClientGone, DetachLayer};
pub use empty_response::EmptyResponseLayer;
pub use observe::{ErrorProbeLayer, ResponseProbeLayer};
pub use request_id::{RequestId, RequestIdLayer, X_REQUEST_ID};
