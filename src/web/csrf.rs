//! # CSRF Token Endpoint
//!
//! A JSON endpoint for single-page applications that cannot read the token
//! from a server-rendered form. Mount it behind [`CsrfLayer`]; the layer
//! sets the cookie, and the handler returns the matching masked token for
//! the `X-CSRF-Token` header.
//!
//! # Example
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use wzs_csrf::config::csrf::CsrfConfig;
//! use wzs_csrf::web::{csrf::csrf_handler, middleware::CsrfLayer};
//!
//! let cfg = CsrfConfig::from_env().unwrap();
//! let app: Router = Router::new()
//!     .route("/csrf", get(csrf_handler))
//!     .layer(CsrfLayer::new(cfg));
//! ```
//!
//! [`CsrfLayer`]: crate::web::middleware::CsrfLayer

use axum::{
    Json,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
};
use serde::Serialize;

use crate::web::context::CsrfToken;

/// JSON response schema returned by [`csrf_handler`].
#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

/// Axum handler returning the masked token issued for this request.
///
/// The response is marked uncacheable since the token changes every time.
pub async fn csrf_handler(
    CsrfToken(token): CsrfToken,
) -> (StatusCode, HeaderMap, Json<CsrfResponse>) {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    (
        StatusCode::OK,
        headers,
        Json(CsrfResponse { csrf_token: token }),
    )
}
