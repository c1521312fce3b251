//! Page-scoped alert routes.
//!
//! A page that displays one object (for example a booking request dashboard)
//! opens a route: a [`PersonalAlertQueue`] bound to the object's id and
//! reachable by a generated token. Producers append page updates to every
//! open route watching that object. Routes that stop polling are dropped by
//! [`PageRoutes::prune`].

use crate::error::Error;
use crate::expiry::ExpiryIndex;
use crate::mailbox::{ObjectId, PersonalAlertQueue};
use crate::shared::SubscriptionToken;
use crate::topics::{BookingRequestUpdate, BOOKING_REQUEST_UPDATES_QUEUE};
use dashmap::DashMap;
use log::*;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

pub const DEFAULT_PAGE_ROUTE_IDLE_TTL: Duration = Duration::from_secs(15 * 60);

/// The kinds of page queue a client can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageQueue {
    BookingRequestUpdates,
}

impl PageQueue {
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            BOOKING_REQUEST_UPDATES_QUEUE => Ok(PageQueue::BookingRequestUpdates),
            _ => Err(Error::unknown_topic(name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageQueue::BookingRequestUpdates => BOOKING_REQUEST_UPDATES_QUEUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageUpdate {
    BookingRequest(BookingRequestUpdate),
}

impl PageUpdate {
    pub fn queue(&self) -> PageQueue {
        match self {
            PageUpdate::BookingRequest(_) => PageQueue::BookingRequestUpdates,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            PageUpdate::BookingRequest(update) => update.booking_request_id,
        }
    }
}

struct PageRoute {
    queue: PageQueue,
    updates: PersonalAlertQueue<Arc<PageUpdate>>,
}

pub struct PageRoutes {
    idle_ttl: Duration,
    routes: DashMap<SubscriptionToken, Arc<PageRoute>>,
    expiry: ExpiryIndex<SubscriptionToken>,
}

impl PageRoutes {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            idle_ttl,
            routes: DashMap::new(),
            expiry: ExpiryIndex::new(),
        }
    }

    /// Open a route for updates about `object_id` and return its token.
    pub fn open(&self, queue: PageQueue, object_id: ObjectId) -> SubscriptionToken {
        let token = SubscriptionToken::new();
        self.expiry.mark(token.clone(), self.idle_ttl, Instant::now());
        self.routes.insert(
            token.clone(),
            Arc::new(PageRoute {
                queue,
                updates: PersonalAlertQueue::new(object_id),
            }),
        );

        debug!("Opened {} route for object {}", queue.name(), object_id);
        token
    }

    /// Drain the route behind `token`, renewing its idle deadline.
    pub fn read(&self, token: &SubscriptionToken) -> Result<Vec<Arc<PageUpdate>>, Error> {
        let route = match self.routes.get(token) {
            Some(entry) => {
                self.expiry.mark(token.clone(), self.idle_ttl, Instant::now());
                Arc::clone(entry.value())
            }
            None => return Err(Error::unknown_route()),
        };
        Ok(route.updates.drain())
    }

    /// Append `update` to every open route watching its object.
    /// Returns the number of routes it was delivered to.
    pub fn append(&self, update: PageUpdate) -> usize {
        let update = Arc::new(update);
        let mut delivered = 0;
        for entry in self.routes.iter() {
            let route = entry.value();
            if route.queue == update.queue() && route.updates.object_id() == update.object_id() {
                route.updates.append(Arc::clone(&update));
                delivered += 1;
            }
        }
        delivered
    }

    pub fn close(&self, token: &SubscriptionToken) -> bool {
        let closed = self.routes.remove(token).is_some();
        self.expiry.forget(token);
        closed
    }

    /// Drop routes that have not been read within the idle TTL.
    /// Returns the number of routes removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let idle: Vec<SubscriptionToken> = self
            .routes
            .iter()
            .filter(|entry| self.expiry.has_expired(entry.key(), now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for token in idle {
            if self
                .routes
                .remove_if(&token, |key, _| self.expiry.has_expired(key, now))
                .is_some()
            {
                self.expiry.forget(&token);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Pruned {removed} idle page route(s)");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for PageRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_ROUTE_IDLE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertErrorKind;
    use tokio::time::advance;

    fn booking_update(id: ObjectId, summary: &str) -> PageUpdate {
        PageUpdate::BookingRequest(BookingRequestUpdate {
            booking_request_id: id,
            summary: summary.to_string(),
        })
    }

    #[test]
    fn test_page_queue_lookup_by_name() {
        assert_eq!(
            PageQueue::from_name("BookingRequestUpdatesQueue").unwrap(),
            PageQueue::BookingRequestUpdates
        );
        let err = PageQueue::from_name("Nope").unwrap_err();
        assert_eq!(err.error_kind, AlertErrorKind::UnknownTopic("Nope".to_string()));
    }

    #[tokio::test]
    async fn test_updates_reach_only_routes_for_the_same_object() {
        let routes = PageRoutes::default();
        let watching = routes.open(PageQueue::BookingRequestUpdates, 10);
        let other = routes.open(PageQueue::BookingRequestUpdates, 11);

        assert_eq!(routes.append(booking_update(10, "new email")), 1);

        let updates = routes.read(&watching).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(*updates[0], booking_update(10, "new email"));
        assert!(routes.read(&watching).unwrap().is_empty());
        assert!(routes.read(&other).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_closed_route_is_an_error() {
        let routes = PageRoutes::default();
        let token = routes.open(PageQueue::BookingRequestUpdates, 1);
        assert!(routes.close(&token));
        assert!(!routes.close(&token));

        let err = routes.read(&token).unwrap_err();
        assert_eq!(err.error_kind, AlertErrorKind::UnknownRoute);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_routes_are_pruned_and_active_ones_kept() {
        let routes = PageRoutes::new(Duration::from_secs(60));
        let idle = routes.open(PageQueue::BookingRequestUpdates, 1);
        let active = routes.open(PageQueue::BookingRequestUpdates, 2);

        advance(Duration::from_secs(45)).await;
        routes.read(&active).unwrap();
        advance(Duration::from_secs(30)).await;

        assert_eq!(routes.prune(), 1);
        assert!(routes.read(&idle).is_err());
        assert!(routes.read(&active).is_ok());
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn test_page_update_serializes_without_a_tag() {
        let json = serde_json::to_value(booking_update(4, "state changed")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"booking_request_id": 4, "summary": "state changed"})
        );
    }
}
