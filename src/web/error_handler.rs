//! # Rejection Handler
//!
//! The CSRF middleware never lets a rejected request reach the wrapped
//! handler. It calls an [`ErrorHandler`] instead, which receives the
//! request with its [`CsrfContext`](crate::web::context::CsrfContext)
//! attached, so a custom handler can read the failure reason and the
//! token that was issued for this request.
//!
//! # Example
//! ```rust
//! use axum::{extract::Request, http::StatusCode};
//! use wzs_csrf::config::csrf::{random_secret, CsrfConfig};
//! use wzs_csrf::web::context::failure_reason;
//!
//! let cfg = CsrfConfig::new(random_secret()).error_handler(|req: Request| async move {
//!     let reason = failure_reason(&req).map(|r| r.to_string()).unwrap_or_default();
//!     (StatusCode::BAD_REQUEST, format!("rejected: {reason}"))
//! });
//! ```

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use axum::{
    extract::Request,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    response::{IntoResponse, Response},
};

use crate::web::context::failure_reason;

type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Handler invoked in place of the wrapped service on rejection.
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(Request) -> BoxResponseFuture + Send + Sync>);

impl ErrorHandler {
    /// Wraps an async function returning anything that converts into a response.
    pub fn new<F, Fut, R>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self(Arc::new(move |req| {
            let fut = handler(req);
            Box::pin(async move { fut.await.into_response() }) as BoxResponseFuture
        }))
    }

    pub(crate) fn call(&self, req: Request) -> BoxResponseFuture {
        (self.0)(req)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(forbidden)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler(..)")
    }
}

/// Default rejection: `403 Forbidden` with a short plain-text reason.
///
/// Only the reason category is written; the expected token is never echoed.
pub async fn forbidden(req: Request) -> Response {
    let reason = failure_reason(&req)
        .map(|r| r.to_string())
        .unwrap_or_else(|| "CSRF validation failed".into());

    (
        StatusCode::FORBIDDEN,
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        format!("Forbidden - {reason}"),
    )
        .into_response()
}
