//! TTL Entry Module
//!
//! Defines the structure stored per key in the TTL cache.

use std::time::{Duration, Instant};

/// Upper bound used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

// == TTL Entry ==
/// A value together with the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct TtlEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was stored
    pub created_at: Instant,
    /// First instant at which the entry is expired
    pub expires_at: Instant,
}

impl<V> TtlEntry<V> {
    // == Constructor ==
    /// Creates an entry expiring `ttl` after now.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::at(value, Instant::now(), ttl)
    }

    /// Creates an entry as if stored at `now`.
    pub fn at(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: deadline(now, ttl),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired at `now`.
    ///
    /// Boundary condition: the entry is valid only while `now < expires_at`,
    /// so it is already expired at the exact expiration instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Returns the remaining lifetime at `now`, zero once expired.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    // == Extend ==
    /// Pushes the expiration back by `additional`, counted from the current
    /// expiration instant rather than from now.
    pub fn extend(&mut self, additional: Duration) {
        self.expires_at = deadline(self.expires_at, additional);
    }
}

fn deadline(from: Instant, ttl: Duration) -> Instant {
    from.checked_add(ttl).unwrap_or(from + FAR_FUTURE)
}
