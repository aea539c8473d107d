//! Small utilities shared across guildsync crates.

/// Milliseconds since the Unix epoch. Saturates to zero on clock skew.
#[must_use]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
