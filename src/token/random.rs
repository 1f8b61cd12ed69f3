//! # Random Source
//!
//! Supplies cryptographically secure bytes for token minting and masking.
//!
//! The default [`OsRandom`] reads from the operating system CSPRNG. A
//! failure there is fatal for the request: the middleware refuses to issue
//! a predictable token.
//!
//! # Example
//! ```rust
//! use wzs_csrf::token::random::{OsRandom, RandomSource};
//!
//! let mut buf = [0u8; 32];
//! OsRandom.fill(&mut buf).unwrap();
//! ```

use rand::{TryRngCore, rngs::OsRng};

use crate::error::csrf::CsrfError;

/// A source of cryptographically secure random bytes.
///
/// Implementations are shared by all requests and must be safe for
/// concurrent use.
pub trait RandomSource: Send + Sync {
    /// Fills `dest` entirely with random bytes.
    ///
    /// # Errors
    /// Returns [`CsrfError::Random`] if the underlying generator fails.
    fn fill(&self, dest: &mut [u8]) -> Result<(), CsrfError>;
}

/// [`RandomSource`] backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CsrfError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CsrfError::Random(e.to_string()))
    }
}
