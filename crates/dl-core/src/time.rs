//! Time utilities for devlink

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in milliseconds.
///
/// A clock set before the Unix epoch yields 0.
///
/// # Examples
/// ```
/// use dl_core::time::current_time_millis;
///
/// let now = current_time_millis();
/// assert!(now > 0);
/// ```
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Build a session token from a millisecond timestamp.
///
/// The token only correlates a connection with the server's session; it
/// carries no secret.
pub fn session_token_at(millis: u64) -> String {
    format!("session_{}", millis)
}

/// Build a session token from the current time.
pub fn session_token() -> String {
    session_token_at(current_time_millis())
}
