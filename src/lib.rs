//! # wzs_csrf
//!
//! Cross-Site Request Forgery protection for
//! [Axum](https://crates.io/crates/axum) applications.
//!
//! This crate provides:
//! - A tower layer validating unsafe requests (`web::middleware`)
//! - Masked, signed, cookie-carried tokens (`token`, `store`)
//! - Request-scoped access to the current token and rejection reason (`web::context`)
//! - Re-exports of the crates appearing in its public API (`axum`, `axum_extra`, etc.)
//!
//! ## Example usage (in another crate)
//!
//! ```rust,no_run
//! use wzs_csrf::axum::{routing::{get, post}, Router};
//! use wzs_csrf::config::csrf::CsrfConfig;
//! use wzs_csrf::web::context::CsrfContext;
//! use wzs_csrf::web::middleware::CsrfLayer;
//!
//! async fn form(csrf: CsrfContext) -> String {
//!     csrf.template_field().unwrap_or_default()
//! }
//!
//! let cfg = CsrfConfig::from_env().unwrap().secure(false);
//! let app: Router = Router::new()
//!     .route("/form", get(form))
//!     .route("/form", post(|| async { "saved" }))
//!     .layer(CsrfLayer::new(cfg));
//! ```

// ===============================
// Re-exports of external crates
// ===============================

pub use anyhow;
pub use askama;
pub use axum;
pub use axum_extra;
pub use base64;
pub use chrono;
pub use rand;
pub use tower;

// ===============================
// Public modules
// ===============================
pub mod config;
pub mod error;
pub mod store;
pub mod time;
pub mod token;
pub mod web;
