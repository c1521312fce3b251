use dashmap::DashMap;
use std::hash::Hash;
use tokio::time::{Duration, Instant};

/// Longest TTL a deadline may be marked with; larger values are clamped.
pub const MAX_TTL_SECS: u64 = 86_400 * 365;
pub const MAX_TTL: Duration = Duration::from_secs(MAX_TTL_SECS);

/// Concurrent map from a tracked object to its absolute expiration time.
///
/// Every access locks a single shard for the duration of the call only.
/// Callers pass `now` so one sweep judges all entries against the same instant.
#[derive(Debug)]
pub struct ExpiryIndex<K>
where
    K: Eq + Hash,
{
    deadlines: DashMap<K, Instant>,
}

impl<K> ExpiryIndex<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            deadlines: DashMap::new(),
        }
    }

    /// Set (or renew) the deadline of `key` to `now + ttl` and return it.
    /// `ttl` is capped at [`MAX_TTL`].
    pub fn mark(&self, key: K, ttl: Duration, now: Instant) -> Instant {
        let deadline = now + ttl.min(MAX_TTL);
        self.deadlines.insert(key, deadline);
        deadline
    }

    /// True once the recorded deadline lies strictly in the past.
    /// Untracked keys never expire.
    pub fn has_expired(&self, key: &K, now: Instant) -> bool {
        self.deadlines
            .get(key)
            .map(|deadline| *deadline < now)
            .unwrap_or(false)
    }

    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.deadlines.get(key).map(|deadline| *deadline)
    }

    /// Stop tracking `key`.
    pub fn forget(&self, key: &K) {
        self.deadlines.remove(key);
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

impl<K> Default for ExpiryIndex<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
