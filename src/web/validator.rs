//! # Request Validation
//!
//! Decides whether a request may proceed.
//!
//! ```text
//! safe method ──────────────────────────────────────────────▶ Accepted
//! unsafe ─▶ header / form field ─▶ decode + unmask ─▶ compare ─▶ Accepted
//!              │                       │                │
//!              ▼                       ▼                ▼
//!           NoToken            MalformedToken     TokenMismatch
//! ```
//!
//! The header wins over the form field. Reading the form field buffers the
//! body; the buffered bytes are put back on the request so the wrapped
//! handler still sees the original body.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request},
    http::{HeaderMap, header::CONTENT_TYPE},
};
use axum_extra::extract::Multipart;
use tracing::warn;

use crate::config::csrf::CsrfConfig;
use crate::error::csrf::FailureReason;
use crate::token::codec;
use crate::token::mask::{RawToken, constant_time_eq};

/// Outcome of validating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(FailureReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

/// Validates `req` against the raw token in effect for it.
///
/// Returns the request (with its body restored if it had to be read)
/// alongside the verdict.
pub async fn validate(req: Request, stored: &RawToken, cfg: &CsrfConfig) -> (Request, Verdict) {
    if cfg.is_safe_method(req.method()) {
        return (req, Verdict::Accepted);
    }

    let (req, submitted) = submitted_token(req, cfg).await;
    let verdict = match submitted {
        Some(value) => check(&value, stored),
        None => Verdict::Rejected(FailureReason::NoToken),
    };
    (req, verdict)
}

/// Compares a submitted wire token with the stored raw token.
pub fn check(submitted: &str, stored: &RawToken) -> Verdict {
    let masked = match codec::decode(submitted) {
        Ok(masked) => masked,
        Err(reason) => return Verdict::Rejected(reason),
    };

    if constant_time_eq(masked.unmask().as_bytes(), stored.as_bytes()) {
        Verdict::Accepted
    } else {
        Verdict::Rejected(FailureReason::TokenMismatch)
    }
}

/// Finds the submitted token: header first, then the form field.
async fn submitted_token(req: Request, cfg: &CsrfConfig) -> (Request, Option<String>) {
    if let Some(value) = header_token(req.headers(), &cfg.header_name) {
        return (req, Some(value));
    }
    form_token(req, cfg).await
}

fn header_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
    UrlEncoded,
    Multipart,
}

fn form_kind(headers: &HeaderMap) -> Option<FormKind> {
    let ct = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = ct.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "application/x-www-form-urlencoded" => Some(FormKind::UrlEncoded),
        "multipart/form-data" => Some(FormKind::Multipart),
        _ => None,
    }
}

async fn form_token(req: Request, cfg: &CsrfConfig) -> (Request, Option<String>) {
    let Some(kind) = form_kind(req.headers()) else {
        return (req, None);
    };

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, cfg.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                error = %e,
                limit = cfg.max_body_bytes,
                "form body exceeds CSRF buffer limit, field not inspected"
            );
            return (Request::from_parts(parts, Body::empty()), None);
        }
    };

    let value = match kind {
        FormKind::UrlEncoded => urlencoded_field(&bytes, &cfg.field_name),
        FormKind::Multipart => multipart_field(&parts.headers, bytes.clone(), &cfg.field_name).await,
    }
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty());

    (Request::from_parts(parts, Body::from(bytes)), value)
}

fn urlencoded_field(bytes: &[u8], name: &str) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
        .ok()?
        .into_iter()
        .find_map(|(k, v)| (k == name).then_some(v))
}

async fn multipart_field(headers: &HeaderMap, bytes: Bytes, name: &str) -> Option<String> {
    let mut probe = Request::new(Body::from(bytes));
    *probe.headers_mut() = headers.clone();

    let mut multipart = Multipart::from_request(probe, &()).await.ok()?;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some(name) {
            return field.text().await.ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::csrf::random_secret;
    use crate::token::mask::mask;
    use crate::token::random::OsRandom;
    use axum::http::Method;
    use http_body_util::BodyExt;

    fn cfg() -> CsrfConfig {
        CsrfConfig::new(random_secret())
    }

    fn wire(raw: &RawToken) -> String {
        codec::encode(&mask(raw, &OsRandom).unwrap())
    }

    fn request(method: Method) -> axum::http::request::Builder {
        Request::builder().method(method).uri("/submit")
    }

    async fn body_string(req: Request) -> String {
        let bytes = req.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn safe_methods_skip_token_checks() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        for m in [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE] {
            let req = request(m).body(Body::empty()).unwrap();
            let (_, verdict) = validate(req, &stored, &cfg()).await;
            assert_eq!(verdict, Verdict::Accepted);
        }
    }

    #[tokio::test]
    async fn configured_safe_set_is_honored() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let cfg = cfg().safe_methods([Method::GET]);

        let req = request(Method::OPTIONS).body(Body::empty()).unwrap();
        let (_, verdict) = validate(req, &stored, &cfg).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::NoToken));
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::POST).body(Body::empty()).unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::NoToken));
        assert_eq!(verdict.reason(), Some(FailureReason::NoToken));
    }

    #[tokio::test]
    async fn empty_header_counts_as_missing() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::DELETE)
            .header("X-CSRF-Token", "")
            .body(Body::empty())
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::NoToken));
    }

    #[tokio::test]
    async fn valid_header_token_is_accepted() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::POST)
            .header("X-CSRF-Token", wire(&stored))
            .body(Body::empty())
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert!(verdict.is_accepted());
    }

    #[tokio::test]
    async fn custom_header_name_is_used() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let cfg = cfg().request_header("X-XSRF-Token");
        let req = request(Method::PUT)
            .header("X-XSRF-Token", wire(&stored))
            .body(Body::empty())
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg).await;
        assert!(verdict.is_accepted());
    }

    #[tokio::test]
    async fn token_of_other_client_is_a_mismatch() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let other = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::POST)
            .header("X-CSRF-Token", wire(&other))
            .body(Body::empty())
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::TokenMismatch));
    }

    #[tokio::test]
    async fn garbage_header_is_malformed() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::PATCH)
            .header("X-CSRF-Token", "definitely not a token")
            .body(Body::empty())
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::MalformedToken));
    }

    #[tokio::test]
    async fn urlencoded_field_is_accepted_and_body_restored() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let body = format!("name=alice&csrfToken={}", wire(&stored));
        let req = request(Method::POST)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.clone()))
            .unwrap();

        let (req, verdict) = validate(req, &stored, &cfg()).await;
        assert!(verdict.is_accepted());
        assert_eq!(body_string(req).await, body);
    }

    #[tokio::test]
    async fn padded_field_value_is_trimmed() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let body = format!("csrfToken=%20{}%09", wire(&stored));
        let req = request(Method::POST)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert!(verdict.is_accepted());
    }

    #[test]
    fn padded_value_is_malformed_for_check() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        assert_eq!(
            check(&format!(" {}", wire(&stored)), &stored),
            Verdict::Rejected(FailureReason::MalformedToken)
        );
    }

    #[tokio::test]
    async fn header_takes_precedence_over_field() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let other = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::POST)
            .header("X-CSRF-Token", wire(&other))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("csrfToken={}", wire(&stored))))
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::TokenMismatch));
    }

    #[tokio::test]
    async fn multipart_field_is_accepted_and_body_restored() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let body = format!(
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             hello\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"csrfToken\"\r\n\r\n\
             {}\r\n\
             --XYZ--\r\n",
            wire(&stored)
        );
        let req = request(Method::POST)
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body.clone()))
            .unwrap();

        let (req, verdict) = validate(req, &stored, &cfg()).await;
        assert!(verdict.is_accepted());
        assert_eq!(body_string(req).await, body);
    }

    #[tokio::test]
    async fn form_without_field_is_missing_token() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let req = request(Method::POST)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=alice"))
            .unwrap();

        let (_, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::NoToken));
    }

    #[tokio::test]
    async fn oversized_form_body_is_dropped() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let cfg = cfg().max_body_bytes(16);
        let req = request(Method::POST)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("csrfToken={}", wire(&stored))))
            .unwrap();

        let (req, verdict) = validate(req, &stored, &cfg).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::NoToken));
        assert_eq!(body_string(req).await, "");
    }

    #[tokio::test]
    async fn oversized_upload_passes_with_header_token() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let cfg = cfg().max_body_bytes(16);
        let body = format!(
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\n\
             {}\r\n\
             --XYZ--\r\n",
            "x".repeat(256)
        );
        let req = request(Method::POST)
            .header("X-CSRF-Token", wire(&stored))
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body.clone()))
            .unwrap();

        let (req, verdict) = validate(req, &stored, &cfg).await;
        assert!(verdict.is_accepted());
        assert_eq!(body_string(req).await, body);
    }

    #[tokio::test]
    async fn json_body_is_not_inspected() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        let body = format!(r#"{{"csrfToken":"{}"}}"#, wire(&stored));
        let req = request(Method::POST)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.clone()))
            .unwrap();

        let (req, verdict) = validate(req, &stored, &cfg()).await;
        assert_eq!(verdict, Verdict::Rejected(FailureReason::NoToken));
        assert_eq!(body_string(req).await, body);
    }

    #[test]
    fn check_is_symmetric_with_masking() {
        let stored = RawToken::generate(&OsRandom).unwrap();
        for _ in 0..100 {
            assert_eq!(check(&wire(&stored), &stored), Verdict::Accepted);
        }
        assert_eq!(
            check("", &stored),
            Verdict::Rejected(FailureReason::MalformedToken)
        );
    }

    #[test]
    fn form_kind_parses_content_type() {
        let mut h = HeaderMap::new();
        assert_eq!(form_kind(&h), None);

        h.insert(
            CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=UTF-8".parse().unwrap(),
        );
        assert_eq!(form_kind(&h), Some(FormKind::UrlEncoded));

        h.insert(CONTENT_TYPE, "Multipart/Form-Data; boundary=x".parse().unwrap());
        assert_eq!(form_kind(&h), Some(FormKind::Multipart));

        h.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        assert_eq!(form_kind(&h), None);
    }
}
