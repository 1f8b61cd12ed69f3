//! # Token Masking
//!
//! A [`RawToken`] is the stable per-client secret. It never travels as-is:
//! every time it is written to a cookie or rendered into a page it is
//! XOR-masked with a fresh one-time pad, producing a [`MaskedToken`]:
//!
//! ```text
//! masked = mask || (mask XOR raw)
//! ```
//!
//! Because the pad changes on every serialization, the bytes sent to the
//! client differ each time even though the secret does not. This defeats
//! compression-oracle attacks such as BREACH.

use std::fmt;

use subtle::{Choice, ConstantTimeEq};

use crate::error::csrf::CsrfError;
use crate::token::random::RandomSource;

/// Length of a raw token in bytes.
pub const TOKEN_LEN: usize = 32;

/// Length of a masked token in bytes (pad followed by ciphertext).
pub const MASKED_LEN: usize = TOKEN_LEN * 2;

/// The unmasked anti-forgery secret.
#[derive(Clone, PartialEq, Eq)]
pub struct RawToken([u8; TOKEN_LEN]);

impl RawToken {
    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    /// Draws a new token from `random`.
    ///
    /// # Errors
    /// Propagates [`CsrfError::Random`].
    pub fn generate(random: &dyn RandomSource) -> Result<Self, CsrfError> {
        let mut bytes = [0u8; TOKEN_LEN];
        random.fill(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }
}

impl fmt::Debug for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawToken(..)")
    }
}

/// A one-time-padded, transmittable form of a [`RawToken`].
#[derive(Clone, PartialEq, Eq)]
pub struct MaskedToken([u8; MASKED_LEN]);

impl MaskedToken {
    /// Builds a masked token from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; MASKED_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; MASKED_LEN] {
        &self.0
    }

    /// Removes the pad and returns the underlying secret.
    pub fn unmask(&self) -> RawToken {
        let (pad, cipher) = self.0.split_at(TOKEN_LEN);
        let mut raw = [0u8; TOKEN_LEN];
        for (i, out) in raw.iter_mut().enumerate() {
            *out = pad[i] ^ cipher[i];
        }
        RawToken(raw)
    }
}

impl fmt::Debug for MaskedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MaskedToken(..)")
    }
}

/// Masks `raw` with a fresh pad drawn from `random`.
///
/// Must be called anew for every serialization; reusing a pad defeats the
/// purpose of masking.
///
/// # Errors
/// Propagates [`CsrfError::Random`].
pub fn mask(raw: &RawToken, random: &dyn RandomSource) -> Result<MaskedToken, CsrfError> {
    let mut out = [0u8; MASKED_LEN];
    let (pad, cipher) = out.split_at_mut(TOKEN_LEN);
    random.fill(pad)?;
    for (i, c) in cipher.iter_mut().enumerate() {
        *c = pad[i] ^ raw.0[i];
    }
    Ok(MaskedToken(out))
}

/// Unmasks raw bytes, failing when they are not exactly [`MASKED_LEN`] long.
pub fn unmask(masked: &[u8]) -> Option<RawToken> {
    MaskedToken::from_slice(masked).map(|m| m.unmask())
}

/// Compares two byte strings in constant time.
///
/// The loop always runs `max(a.len(), b.len())` times and a length
/// difference is folded into the result instead of returning early.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut equal: Choice = (a.len() as u64).ct_eq(&(b.len() as u64));
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        equal &= x.ct_eq(&y);
    }
    bool::from(equal)
}
