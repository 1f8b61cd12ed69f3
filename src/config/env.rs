//! # Environment Variable Utilities
//!
//! Helpers for reading configuration values from an environment-like
//! provider. Every helper takes the provider as a closure so that tests can
//! feed values without touching the process environment.
//!
//! # Examples
//! ```rust
//! use wzs_csrf::config::env::{read_flag_from, read_u64_from};
//!
//! let secure = read_flag_from(|_| Some("yes".into()), "CSRF_COOKIE_SECURE", false);
//! assert!(secure);
//!
//! let max_age = read_u64_from(|_| None, "CSRF_MAX_AGE", 43200).unwrap();
//! assert_eq!(max_age, 43200);
//! ```

use anyhow::{Context, Result};

/// Reads a boolean flag using a custom provider function.
///
/// Returns `true` for any of the following case-insensitive values:
/// `"1"`, `"true"`, `"yes"`, `"on"`. Surrounding quotes are ignored.
pub fn read_flag_from<F>(provider: F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match provider(name) {
        Some(v) => {
            let s = unquote(&v);
            matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        None => default,
    }
}

/// Reads a non-empty string value. Blank values count as unset.
pub fn read_string_from<F>(provider: F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .map(|v| unquote(&v).to_string())
        .filter(|s| !s.is_empty())
}

/// Reads an unsigned integer (`u64`), returning `default` when unset.
///
/// # Errors
/// Fails when the variable is set but is not a valid number.
pub fn read_u64_from<F>(provider: F, name: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match read_string_from(provider, name) {
        Some(s) => s
            .parse::<u64>()
            .with_context(|| format!("{name} parse error: {s:?}")),
        None => Ok(default),
    }
}

fn unquote(v: &str) -> &str {
    v.trim().trim_matches(|c| c == '"' || c == '\'')
}
