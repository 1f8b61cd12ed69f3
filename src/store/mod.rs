//! # Token Storage
//!
//! A [`TokenStore`] decides where the raw token of a client lives between
//! requests. The default [`CookieStore`](cookie_store::CookieStore) keeps
//! it in a signed, masked cookie so the server holds no state; a
//! session-backed store can be swapped in without touching masking or
//! validation.

use axum::http::HeaderMap;

use crate::error::csrf::CsrfError;
use crate::token::mask::RawToken;

pub mod cookie_store;

/// Capability interface over the token persistence backend.
pub trait TokenStore: Send + Sync {
    /// Returns the raw token bound to the request, if a valid one exists.
    ///
    /// Missing, tampered, expired or undecodable state yields `None`; it
    /// is never an error.
    fn load(&self, headers: &HeaderMap) -> Option<RawToken>;

    /// Persists `token` into the response headers.
    ///
    /// Called on every response so that the transmitted form is re-masked
    /// even when the token itself is unchanged.
    ///
    /// # Errors
    /// Fails when masking cannot draw randomness or the header is invalid.
    fn save(&self, headers: &mut HeaderMap, token: &RawToken) -> Result<(), CsrfError>;

    /// Mints a fresh raw token.
    ///
    /// # Errors
    /// Fails only when the random source fails.
    fn generate(&self) -> Result<RawToken, CsrfError>;
}
