//! # Token Codec
//!
//! Encodes masked tokens for transport in cookies, headers and form fields.
//!
//! Tokens use Base64 (URL-safe, no padding), so the encoded form never
//! contains whitespace, commas, semicolons or control characters.
//!
//! # Example
//! ```rust
//! use wzs_csrf::token::codec::{decode, encode};
//! use wzs_csrf::token::mask::{mask, RawToken};
//! use wzs_csrf::token::random::OsRandom;
//!
//! let raw = RawToken::generate(&OsRandom).unwrap();
//! let wire = encode(&mask(&raw, &OsRandom).unwrap());
//! assert_eq!(decode(&wire).unwrap().unmask(), raw);
//! ```

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::csrf::FailureReason;
use crate::token::mask::MaskedToken;

/// Encodes a masked token into its printable wire form.
pub fn encode(token: &MaskedToken) -> String {
    URL_SAFE_NO_PAD.encode(token.as_bytes())
}

/// Decodes the wire form back into a masked token.
///
/// # Errors
/// Returns [`FailureReason::MalformedToken`] on an invalid alphabet or a
/// decoded length other than [`MASKED_LEN`](crate::token::mask::MASKED_LEN).
pub fn decode(value: &str) -> Result<MaskedToken, FailureReason> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| FailureReason::MalformedToken)?;
    MaskedToken::from_slice(&bytes).ok_or(FailureReason::MalformedToken)
}
