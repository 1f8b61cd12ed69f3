//! # CSRF Configuration
//!
//! The immutable settings record shared by every request passing through
//! the CSRF middleware: cookie attributes, the names under which clients
//! submit the token, and the handler invoked on rejection.
//!
//! A config starts from documented defaults and is adjusted with builder
//! steps. Steps are applied in order, so a later step overrides an earlier
//! one touching the same field.
//!
//! The configuration can also be read from environment variables:
//! - `CSRF_SECRET` — base string used to derive the 32-byte signing key (random if missing)
//! - `CSRF_COOKIE_NAME`, `CSRF_COOKIE_PATH`, `CSRF_COOKIE_DOMAIN`
//! - `CSRF_MAX_AGE` — cookie lifetime in seconds (default: `43200`)
//! - `CSRF_COOKIE_SECURE` — enables `Secure` cookie flag (default: `true`)
//! - `CSRF_COOKIE_HTTPONLY` — enables `HttpOnly` cookie flag (default: `true`)
//! - `CSRF_SAME_SITE` — `strict`, `lax` or `none` (default: `lax`)
//! - `CSRF_HEADER_NAME`, `CSRF_FIELD_NAME`
//!
//! # Examples
//! ```rust
//! use wzs_csrf::config::csrf::{random_secret, CsrfConfig};
//!
//! let cfg = CsrfConfig::new(random_secret())
//!     .max_age(3600)
//!     .secure(false)
//!     .request_header("X-XSRF-Token");
//!
//! assert_eq!(cfg.max_age, 3600);
//! assert!(!cfg.cookie_secure);
//! assert!(cfg.cookie_http_only);
//! assert_eq!(cfg.header_name, "X-XSRF-Token");
//! ```

use std::env as std_env;
use std::future::Future;

use anyhow::{Result, bail};
use axum::{extract::Request, http::Method, response::IntoResponse};
use axum_extra::extract::cookie::SameSite;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::env::{read_flag_from, read_string_from, read_u64_from};
use crate::error::csrf::CsrfError;
use crate::web::error_handler::ErrorHandler;

/// Default cookie name used to store the CSRF token.
pub const DEFAULT_COOKIE_NAME: &str = "csrf";

/// Default HTTP header inspected for the submitted token.
pub const DEFAULT_HEADER_NAME: &str = "X-CSRF-Token";

/// Default form field inspected when the header is absent.
pub const DEFAULT_FIELD_NAME: &str = "csrfToken";

/// Default cookie lifetime: 12 hours.
pub const DEFAULT_MAX_AGE: u64 = 12 * 60 * 60;

/// Default cap on a buffered form body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Methods exempt from token checks by default.
pub fn default_safe_methods() -> Vec<Method> {
    vec![Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE]
}

/// Configuration for CSRF protection.
///
/// Built once, then read-only for the lifetime of the middleware.
#[derive(Clone, Debug)]
pub struct CsrfConfig {
    /// Key used to sign the CSRF cookie.
    pub secret: [u8; 32],
    pub cookie_name: String,
    /// Cookie `Path`; `None` lets the browser default to the issuing path.
    pub cookie_path: Option<String>,
    /// Cookie `Domain`; `None` restricts the cookie to the issuing host.
    pub cookie_domain: Option<String>,
    /// Cookie lifetime in seconds. `0` issues a session cookie that never
    /// expires server-side.
    pub max_age: u64,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub same_site: SameSite,
    /// Request header carrying the submitted token.
    pub header_name: String,
    /// Form field carrying the submitted token when the header is absent.
    pub field_name: String,
    pub safe_methods: Vec<Method>,
    /// Largest form body buffered while looking for the token field.
    ///
    /// A larger form is dropped without being inspected and, without a
    /// header token, rejected as
    /// [`NoToken`](crate::error::csrf::FailureReason::NoToken).
    /// Large uploads should send the token in the request header instead.
    pub max_body_bytes: usize,
    pub error_handler: ErrorHandler,
}

impl CsrfConfig {
    /// Creates a configuration with the documented defaults.
    pub fn new(secret: [u8; 32]) -> Self {
        Self {
            secret,
            cookie_name: DEFAULT_COOKIE_NAME.into(),
            cookie_path: None,
            cookie_domain: None,
            max_age: DEFAULT_MAX_AGE,
            cookie_secure: true,
            cookie_http_only: true,
            same_site: SameSite::Lax,
            header_name: DEFAULT_HEADER_NAME.into(),
            field_name: DEFAULT_FIELD_NAME.into(),
            safe_methods: default_safe_methods(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            error_handler: ErrorHandler::default(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    /// Fails when a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|k| std_env::var(k).ok())
    }

    /// Loads configuration using a custom key provider (for testing/mocking).
    ///
    /// # Errors
    /// Fails when `CSRF_MAX_AGE` is not a number, `CSRF_SAME_SITE` is not
    /// one of `strict`, `lax`, `none`, or a cookie attribute is invalid.
    pub fn from_env_with<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = match get("CSRF_SECRET") {
            Some(s) => derive_secret_from_string(&s),
            None => random_secret(),
        };

        let mut cfg = Self::new(secret)
            .max_age(read_u64_from(&get, "CSRF_MAX_AGE", DEFAULT_MAX_AGE)?)
            .secure(read_flag_from(&get, "CSRF_COOKIE_SECURE", true))
            .http_only(read_flag_from(&get, "CSRF_COOKIE_HTTPONLY", true));

        if let Some(name) = read_string_from(&get, "CSRF_COOKIE_NAME") {
            cfg = cfg.cookie_name(name);
        }
        if let Some(path) = read_string_from(&get, "CSRF_COOKIE_PATH") {
            cfg = cfg.path(path);
        }
        if let Some(domain) = read_string_from(&get, "CSRF_COOKIE_DOMAIN") {
            cfg = cfg.domain(domain);
        }
        if let Some(same_site) = read_string_from(&get, "CSRF_SAME_SITE") {
            cfg = cfg.same_site(parse_same_site(&same_site)?);
        }
        if let Some(header) = read_string_from(&get, "CSRF_HEADER_NAME") {
            cfg = cfg.request_header(header);
        }
        if let Some(field) = read_string_from(&get, "CSRF_FIELD_NAME") {
            cfg = cfg.field_name(field);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Sets the cookie lifetime in seconds.
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Sets the cookie domain. Defaults to the issuing host only (recommended).
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Sets the cookie path. Defaults to the path the cookie was issued from.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = Some(path.into());
        self
    }

    /// Sets the `Secure` flag. Disable only for plain-HTTP development.
    pub fn secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Replaces the handler invoked on rejection.
    ///
    /// The handler receives the rejected request; the failure reason is
    /// available through [`failure_reason`](crate::web::context::failure_reason).
    pub fn error_handler<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.error_handler = ErrorHandler::new(handler);
        self
    }

    /// Changes the request header inspected for the token.
    pub fn request_header(mut self, header: impl Into<String>) -> Self {
        self.header_name = header.into();
        self
    }

    /// Changes the form field inspected for the token.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Changes the cookie name. Names must not contain whitespace, commas,
    /// semicolons, backslashes or control characters (RFC 6265).
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn safe_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.safe_methods = methods.into_iter().collect();
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Returns `true` if `method` skips token validation.
    pub fn is_safe_method(&self, method: &Method) -> bool {
        self.safe_methods.iter().any(|m| m == method)
    }

    /// Checks that the cookie attributes can be written into a `Set-Cookie`
    /// header.
    ///
    /// # Errors
    /// Returns [`CsrfError::Cookie`] naming the offending attribute.
    pub fn validate(&self) -> Result<(), CsrfError> {
        if self.cookie_name.is_empty() || !self.cookie_name.bytes().all(is_cookie_name_byte) {
            return Err(CsrfError::Cookie(format!(
                "cookie name {:?} is not a valid token",
                self.cookie_name
            )));
        }
        for (attr, value) in [("path", &self.cookie_path), ("domain", &self.cookie_domain)] {
            if let Some(v) = value.as_deref().filter(|v| !v.bytes().all(is_cookie_attr_byte)) {
                return Err(CsrfError::Cookie(format!("cookie {attr} {v:?} is invalid")));
            }
        }
        Ok(())
    }
}

/// RFC 6265 `token` characters.
fn is_cookie_name_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
}

fn is_cookie_attr_byte(b: u8) -> bool {
    (b.is_ascii_graphic() || b == b' ') && b != b';'
}

fn parse_same_site(value: &str) -> Result<SameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        other => bail!("CSRF_SAME_SITE must be strict, lax or none, got {other:?}"),
    }
}

/// Derives a deterministic 32-byte secret key from a string.
///
/// Useful for converting an environment string (e.g. `CSRF_SECRET`)
/// into a fixed-length HMAC key.
pub fn derive_secret_from_string(s: &str) -> [u8; 32] {
    let digest = Sha256::digest(s.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    key
}

/// Generates a new random 32-byte secret key.
pub fn random_secret() -> [u8; 32] {
    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);
    key
}
