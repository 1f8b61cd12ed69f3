use thiserror::Error;

/// Reason a request was rejected by the CSRF middleware.
///
/// These are per-request, non-fatal outcomes. They are exposed to the
/// error handler through [`CsrfContext`](crate::web::context::CsrfContext)
/// and are safe to show to the client: the message never contains the
/// expected token or comparison details.
///
/// # Example
/// ```
/// use wzs_csrf::error::csrf::FailureReason;
///
/// assert_eq!(FailureReason::NoToken.to_string(), "CSRF token not found in request");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FailureReason {
    /// An unsafe request carried no token in the header or the form field.
    #[error("CSRF token not found in request")]
    NoToken,
    /// The submitted value could not be decoded into a masked token.
    #[error("CSRF token malformed")]
    MalformedToken,
    /// The submitted token does not match the token bound to the cookie.
    #[error("CSRF token invalid")]
    TokenMismatch,
}

/// Fatal errors of the token protocol.
///
/// Unlike [`FailureReason`], these abort the request: the middleware
/// never serves a response carrying a token it could not generate safely.
#[derive(Debug, Error)]
pub enum CsrfError {
    /// The cryptographic random source failed to produce bytes.
    #[error("random source failure: {0}")]
    Random(String),
    /// The configured cookie attributes cannot form a valid `Set-Cookie` header.
    #[error("invalid CSRF cookie: {0}")]
    Cookie(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_messages_do_not_leak_details() {
        assert_eq!(
            FailureReason::NoToken.to_string(),
            "CSRF token not found in request"
        );
        assert_eq!(FailureReason::MalformedToken.to_string(), "CSRF token malformed");
        assert_eq!(FailureReason::TokenMismatch.to_string(), "CSRF token invalid");
    }

    #[test]
    fn csrf_error_display_includes_source_message() {
        let err = CsrfError::Random("entropy exhausted".into());
        assert_eq!(err.to_string(), "random source failure: entropy exhausted");
    }

    #[test]
    fn failure_reason_is_copy_and_comparable() {
        let a = FailureReason::TokenMismatch;
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, FailureReason::NoToken);
    }
}
