//! Process-wide broadcast topics.
//!
//! A [`SharedAlertQueue`] fans every published update out to the mailbox of
//! each registered subscriber and keeps it in a retention set until someone
//! consumes it. Two deadlines are tracked in one [`ExpiryIndex`]:
//!
//! - subscribers expire after `subscriber_idle_ttl` without a consume (polling
//!   is the heartbeat);
//! - updates expire after the topic's `item_ttl` if nobody consumed them, at
//!   which point the topic's [`AlertTopic::object_expired`] hook runs once.
//!
//! An update published while nobody is subscribed is never queued: the hook
//! runs immediately instead.
//!
//! Copies left in a mailbox after the update's deadline are discarded by
//! [`SharedAlertQueue::prune`] without running the hook. The hook only
//! reports updates that no subscriber ever consumed.

use crate::error::Error;
use crate::expiry::ExpiryIndex;
use crate::mailbox::Mailbox;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::*;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

pub const DEFAULT_SUBSCRIBER_IDLE_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_ITEM_TTL: Duration = Duration::from_secs(5 * 60);
/// Non-blocking attempts made to evict one idle subscriber per prune.
pub const DEFAULT_MAX_REMOVE_ATTEMPTS: usize = 5;

/// Opaque identifier of one polling client's interest in a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriptionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SubscriptionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SubscriptionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-topic behaviour of a [`SharedAlertQueue`].
pub trait AlertTopic: Send + Sync + 'static {
    type Update: Send + Sync + 'static;

    /// Name clients use to look the topic up.
    fn name(&self) -> &'static str;

    /// How long a published update may wait for its first consumer.
    fn item_ttl(&self) -> Duration {
        DEFAULT_ITEM_TTL
    }

    /// Called once for an update that nobody consumed: either nobody was
    /// subscribed when it was published, or it outlived `item_ttl`.
    fn object_expired(&self, update: &Self::Update) -> Result<(), Error> {
        let _ = update;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Tracked {
    Subscriber(u64),
    Update(u64),
}

/// One published update as it sits in a subscriber's mailbox.
struct Delivery<T> {
    id: u64,
    update: Arc<T>,
    expires_at: Instant,
}

struct Subscription<T> {
    id: u64,
    mailbox: Mailbox<Delivery<T>>,
}

enum Eviction {
    Removed(u64),
    Kept,
    Contended,
}

/// Outcome of one [`SharedAlertQueue::prune`] pass.
#[derive(Debug, Default)]
pub struct PruneReport {
    pub subscribers_evicted: usize,
    /// Idle subscribers whose entry stayed locked for every attempt.
    /// They are retried on the next prune.
    pub evictions_deferred: usize,
    pub updates_expired: usize,
    pub stale_copies_dropped: usize,
    /// Errors returned by the expiration hook. The sweep continues past them.
    pub failures: Vec<Error>,
}

impl PruneReport {
    /// True when the pass changed nothing.
    pub fn is_quiet(&self) -> bool {
        self.subscribers_evicted == 0
            && self.evictions_deferred == 0
            && self.updates_expired == 0
            && self.stale_copies_dropped == 0
            && self.failures.is_empty()
    }

    pub fn merge(&mut self, other: PruneReport) {
        self.subscribers_evicted += other.subscribers_evicted;
        self.evictions_deferred += other.evictions_deferred;
        self.updates_expired += other.updates_expired;
        self.stale_copies_dropped += other.stale_copies_dropped;
        self.failures.extend(other.failures);
    }
}

pub struct SharedAlertQueue<P: AlertTopic> {
    topic: P,
    subscriber_idle_ttl: Duration,
    max_remove_attempts: usize,
    next_id: AtomicU64,
    subscribers: DashMap<SubscriptionToken, Arc<Subscription<P::Update>>>,
    /// Published updates nobody has consumed yet.
    retained: DashMap<u64, Arc<P::Update>>,
    expiry: ExpiryIndex<Tracked>,
}

impl<P: AlertTopic> SharedAlertQueue<P> {
    pub fn new(topic: P) -> Self {
        Self {
            topic,
            subscriber_idle_ttl: DEFAULT_SUBSCRIBER_IDLE_TTL,
            max_remove_attempts: DEFAULT_MAX_REMOVE_ATTEMPTS,
            next_id: AtomicU64::new(1),
            subscribers: DashMap::new(),
            retained: DashMap::new(),
            expiry: ExpiryIndex::new(),
        }
    }

    pub fn with_subscriber_idle_ttl(mut self, ttl: Duration) -> Self {
        self.subscriber_idle_ttl = ttl;
        self
    }

    pub fn with_max_remove_attempts(mut self, attempts: usize) -> Self {
        self.max_remove_attempts = attempts.max(1);
        self
    }

    pub fn name(&self) -> &'static str {
        self.topic.name()
    }

    pub fn topic(&self) -> &P {
        &self.topic
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    pub fn is_subscribed(&self, token: &SubscriptionToken) -> bool {
        self.subscribers.contains_key(token)
    }

    /// Register `token` with an empty mailbox, replacing any previous
    /// registration under the same token.
    pub fn subscribe(&self, token: SubscriptionToken) {
        let subscription = Arc::new(Subscription {
            id: self.next_id(),
            mailbox: Mailbox::new(),
        });
        // The deadline exists before the token becomes visible.
        self.expiry.mark(
            Tracked::Subscriber(subscription.id),
            self.subscriber_idle_ttl,
            Instant::now(),
        );

        debug!("Subscribing {} to {}", token, self.name());
        if let Some(replaced) = self.subscribers.insert(token, subscription) {
            self.expiry.forget(&Tracked::Subscriber(replaced.id));
        }
    }

    /// Fan `update` out to every subscriber.
    ///
    /// With no subscribers the update is handed straight to the expiration
    /// hook, whose error is returned.
    pub fn publish(&self, update: P::Update) -> Result<(), Error> {
        let targets: Vec<Arc<Subscription<P::Update>>> = self
            .subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        if targets.is_empty() {
            debug!("No subscribers on {}, expiring update now", self.name());
            return self.topic.object_expired(&update);
        }

        let id = self.next_id();
        let expires_at = self
            .expiry
            .mark(Tracked::Update(id), self.topic.item_ttl(), Instant::now());
        let update = Arc::new(update);

        // Retain before fan-out so a consumer that wins the race can retire it.
        self.retained.insert(id, Arc::clone(&update));
        for subscription in &targets {
            subscription.mailbox.append(Delivery {
                id,
                update: Arc::clone(&update),
                expires_at,
            });
        }

        trace!(
            "Published update {} on {} to {} subscriber(s)",
            id,
            self.name(),
            targets.len()
        );
        Ok(())
    }

    /// Drain every pending update for `token`. Unknown tokens get nothing.
    pub fn consume(&self, token: &SubscriptionToken) -> Vec<Arc<P::Update>> {
        self.consume_with(token, |subscription| subscription.mailbox.drain())
    }

    /// Drain only the pending updates matching `predicate`; the rest stay
    /// queued for a later consume.
    pub fn consume_matching<F>(
        &self,
        token: &SubscriptionToken,
        mut predicate: F,
    ) -> Vec<Arc<P::Update>>
    where
        F: FnMut(&P::Update) -> bool,
    {
        self.consume_with(token, |subscription| {
            subscription
                .mailbox
                .drain_matching(|delivery| predicate(&delivery.update))
        })
    }

    /// Evict idle subscribers, expire unconsumed updates and drop stale
    /// mailbox copies. Safe to call concurrently with every other operation.
    pub fn prune(&self) -> PruneReport {
        let now = Instant::now();
        let mut report = PruneReport::default();

        self.evict_idle_subscribers(now, &mut report);
        self.expire_unconsumed_updates(now, &mut report);
        self.drop_stale_copies(now, &mut report);

        if !report.is_quiet() {
            debug!(
                "Pruned {}: evicted={}, deferred={}, expired={}, stale={}, failures={}",
                self.name(),
                report.subscribers_evicted,
                report.evictions_deferred,
                report.updates_expired,
                report.stale_copies_dropped,
                report.failures.len()
            );
        }
        report
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn consume_with<D>(&self, token: &SubscriptionToken, drain: D) -> Vec<Arc<P::Update>>
    where
        D: FnOnce(&Subscription<P::Update>) -> Vec<Delivery<P::Update>>,
    {
        let subscription = match self.subscribers.get(token) {
            Some(entry) => {
                // Renewed while the entry is held so prune cannot evict in between.
                self.expiry.mark(
                    Tracked::Subscriber(entry.id),
                    self.subscriber_idle_ttl,
                    Instant::now(),
                );
                Arc::clone(entry.value())
            }
            None => {
                trace!("Consume on {} with unknown token {}", self.name(), token);
                return Vec::new();
            }
        };

        drain(&subscription)
            .into_iter()
            .map(|delivery| {
                self.mark_consumed(delivery.id);
                delivery.update
            })
            .collect()
    }

    fn mark_consumed(&self, id: u64) {
        if self.retained.remove(&id).is_some() {
            self.expiry.forget(&Tracked::Update(id));
        }
    }

    fn evict_idle_subscribers(&self, now: Instant, report: &mut PruneReport) {
        let idle: Vec<SubscriptionToken> = self
            .subscribers
            .iter()
            .filter(|entry| {
                self.expiry
                    .has_expired(&Tracked::Subscriber(entry.value().id), now)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for token in idle {
            match self.try_evict(&token, now) {
                Eviction::Removed(id) => {
                    self.expiry.forget(&Tracked::Subscriber(id));
                    report.subscribers_evicted += 1;
                    debug!("Evicted idle subscriber {} from {}", token, self.name());
                }
                Eviction::Kept => {}
                Eviction::Contended => {
                    report.evictions_deferred += 1;
                    debug!(
                        "Subscriber {} on {} busy, eviction deferred to next prune",
                        token,
                        self.name()
                    );
                }
            }
        }
    }

    fn try_evict(&self, token: &SubscriptionToken, now: Instant) -> Eviction {
        for _ in 0..self.max_remove_attempts {
            match self.subscribers.try_entry(token.clone()) {
                Some(Entry::Occupied(entry)) => {
                    let id = entry.get().id;
                    // A consume or re-subscribe since the scan keeps it alive.
                    if !self.expiry.has_expired(&Tracked::Subscriber(id), now) {
                        return Eviction::Kept;
                    }
                    entry.remove();
                    return Eviction::Removed(id);
                }
                Some(Entry::Vacant(_)) => return Eviction::Kept,
                None => std::thread::yield_now(),
            }
        }
        Eviction::Contended
    }

    fn expire_unconsumed_updates(&self, now: Instant, report: &mut PruneReport) {
        let expired: Vec<u64> = self
            .retained
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| self.expiry.has_expired(&Tracked::Update(*id), now))
            .collect();

        for id in expired {
            // Whoever takes it out of `retained` owns the single hook call.
            let update = match self.retained.remove(&id) {
                Some((_, update)) => update,
                None => continue,
            };
            self.expiry.forget(&Tracked::Update(id));
            report.updates_expired += 1;

            if let Err(err) = self.topic.object_expired(&update) {
                warn!("Expiration hook on {} failed: {err}", self.name());
                report.failures.push(err);
            }
        }
    }

    fn drop_stale_copies(&self, now: Instant, report: &mut PruneReport) {
        let subscriptions: Vec<Arc<Subscription<P::Update>>> = self
            .subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for subscription in subscriptions {
            let stale = subscription
                .mailbox
                .drain_matching(|delivery| delivery.expires_at < now);
            report.stale_copies_dropped += stale.len();
        }
    }

    #[cfg(test)]
    fn tracked_deadlines(&self) -> usize {
        self.expiry.len()
    }
}
