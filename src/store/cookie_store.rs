//! # Signed Cookie Token Store
//!
//! Stores the raw token in a cookie, masked with a fresh pad on every
//! write and signed with HMAC-SHA256 using the configured secret.
//!
//! Cookie value format:
//!
//! ```text
//! v1.<issued_at>.<masked_b64>.<mac_b64>
//! ```
//!
//! - `issued_at` is unix seconds, checked against `max_age`
//! - `masked_b64` is the [codec](crate::token::codec) form of the masked token
//! - `mac` covers the cookie name and everything before the last dot

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::config::csrf::CsrfConfig;
use crate::error::csrf::CsrfError;
use crate::store::TokenStore;
use crate::time::{clock::Clock, system_clock::SystemClock};
use crate::token::codec;
use crate::token::mask::{RawToken, constant_time_eq, mask};
use crate::token::random::RandomSource;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "v1";

/// Tolerance for cookies stamped slightly in the future by a skewed clock.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// [`TokenStore`] keeping the token in a signed cookie.
pub struct CookieStore {
    config: Arc<CsrfConfig>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl CookieStore {
    pub fn new(config: Arc<CsrfConfig>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            config,
            random,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for issue timestamps and expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn mac(&self, payload: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.config.secret).expect("HMAC accepts any key length");
        mac.update(self.config.cookie_name.as_bytes());
        mac.update(b"|");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Produces a signed cookie value carrying a freshly masked `token`.
    fn encode_value(&self, token: &RawToken) -> Result<String, CsrfError> {
        let masked = codec::encode(&mask(token, self.random.as_ref())?);
        let payload = format!("{VERSION}.{}.{masked}", self.clock.unix_now());
        let tag = URL_SAFE_NO_PAD.encode(self.mac(&payload));
        Ok(format!("{payload}.{tag}"))
    }

    /// Verifies and unmasks a cookie value.
    fn decode_value(&self, value: &str) -> Option<RawToken> {
        let (payload, tag_b64) = value.rsplit_once('.')?;

        let mut parts = payload.split('.');
        let (Some(version), Some(issued_at), Some(masked), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if version != VERSION {
            return None;
        }

        let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;
        if !constant_time_eq(&self.mac(payload), &tag) {
            return None;
        }

        let issued_at = issued_at.parse::<i64>().ok()?;
        if self.is_expired(issued_at) {
            return None;
        }

        codec::decode(masked).ok().map(|m| m.unmask())
    }

    fn is_expired(&self, issued_at: i64) -> bool {
        if self.config.max_age == 0 {
            return false;
        }
        let now = self.clock.unix_now();
        let max_age = i64::try_from(self.config.max_age).unwrap_or(i64::MAX);

        issued_at > now.saturating_add(MAX_CLOCK_SKEW_SECS) || now.saturating_sub(issued_at) > max_age
    }
}

impl TokenStore for CookieStore {
    fn load(&self, headers: &HeaderMap) -> Option<RawToken> {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar.get(&self.config.cookie_name)?;

        let token = self.decode_value(cookie.value());
        if token.is_none() {
            debug!(cookie = %self.config.cookie_name, "discarding invalid CSRF cookie");
        }
        token
    }

    fn save(&self, headers: &mut HeaderMap, token: &RawToken) -> Result<(), CsrfError> {
        let cfg = &self.config;
        let mut cookie = Cookie::build((cfg.cookie_name.clone(), self.encode_value(token)?))
            .secure(cfg.cookie_secure)
            .http_only(cfg.cookie_http_only)
            .same_site(cfg.same_site);

        if let Some(path) = &cfg.cookie_path {
            cookie = cookie.path(path.clone());
        }
        if let Some(domain) = &cfg.cookie_domain {
            cookie = cookie.domain(domain.clone());
        }
        if cfg.max_age > 0 {
            let seconds = i64::try_from(cfg.max_age).unwrap_or(i64::MAX);
            cookie = cookie.max_age(::time::Duration::seconds(seconds));
        }

        let value = HeaderValue::from_str(&cookie.build().to_string())
            .map_err(|e| CsrfError::Cookie(e.to_string()))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }

    fn generate(&self) -> Result<RawToken, CsrfError> {
        RawToken::generate(self.random.as_ref())
    }
}
