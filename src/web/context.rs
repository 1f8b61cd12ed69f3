//! # Request-Scoped CSRF State
//!
//! The middleware attaches a [`CsrfContext`] to every request it forwards,
//! carrying the freshly masked token for this response and, on rejection,
//! the failure reason. Nothing is stored outside the request, so
//! concurrent requests never observe each other's state.
//!
//! # Example
//! ```rust,no_run
//! use axum::{response::Html, routing::get, Router};
//! use wzs_csrf::web::context::CsrfContext;
//!
//! async fn form(csrf: CsrfContext) -> Html<String> {
//!     Html(format!(
//!         r#"<form method="post">{}<button>Send</button></form>"#,
//!         csrf.template_field().unwrap_or_default()
//!     ))
//! }
//!
//! let app: Router = Router::new().route("/form", get(form));
//! ```

use askama::Template;
use axum::extract::FromRequestParts;
use axum::http::{Request, StatusCode, request::Parts};

use crate::error::csrf::FailureReason;
use crate::web::template::CsrfField;

/// Per-request CSRF state exposed to handlers and the error handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfContext {
    /// Encoded masked token to embed in the rendered page or send back in
    /// the request header.
    pub token: String,
    /// Why the request was rejected. `None` for accepted requests.
    pub failure: Option<FailureReason>,
    /// Header the client should use to submit the token.
    pub header_name: String,
    /// Form field the client should use to submit the token.
    pub field_name: String,
}

impl CsrfContext {
    /// Renders a hidden `<input>` carrying the token.
    ///
    /// # Errors
    /// Returns the template error if rendering fails.
    pub fn template_field(&self) -> askama::Result<String> {
        CsrfField {
            name: &self.field_name,
            token: &self.token,
        }
        .render()
    }
}

impl<S> FromRequestParts<S> for CsrfContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "CSRF middleware not installed"))
    }
}

/// Extractor yielding only the encoded masked token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = CsrfContext::from_request_parts(parts, state).await?;
        Ok(Self(ctx.token))
    }
}

/// Returns the masked token issued for `req`, if the middleware ran.
pub fn token<B>(req: &Request<B>) -> Option<&str> {
    req.extensions()
        .get::<CsrfContext>()
        .map(|ctx| ctx.token.as_str())
}

/// Returns why `req` was rejected, if it was.
pub fn failure_reason<B>(req: &Request<B>) -> Option<FailureReason> {
    req.extensions()
        .get::<CsrfContext>()
        .and_then(|ctx| ctx.failure)
}
