//! Cached entries and expiration timestamps.

use std::time::Duration;

use chrono::Utc;

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Absolute expiration timestamp `ttl` from now, saturating on overflow.
pub(crate) fn expire_after(ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    unix_now().saturating_add(secs)
}

/// Entry stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry<T> {
    /// Cached value.
    pub(crate) value: T,

    /// Unix timestamp (seconds) at which the entry expires.
    pub(crate) expire_at: i64,
}

impl<T> Entry<T> {
    /// Create a new entry expiring at `expire_at`.
    pub(crate) fn new(value: T, expire_at: i64) -> Self {
        Self { value, expire_at }
    }

    /// Whether the entry is expired as of `now`. The boundary counts as expired.
    pub(crate) fn is_expired_at(&self, now: i64) -> bool {
        self.expire_at <= now
    }
}
