use chrono::{DateTime, Utc};

/// A port that provides the **current instant** to the token store.
///
/// # Purpose
/// Signed CSRF cookies carry their issue time, and expiry is checked
/// against this clock. Abstracting it keeps the expiry logic deterministic
/// under test.
///
/// # Typical Implementations
/// - `SystemClock`: uses the OS clock
/// - `FixedClock`: returns a constant instant (for testing)
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current instant as unix seconds.
    fn unix_now(&self) -> i64 {
        self.now().timestamp()
    }
}
