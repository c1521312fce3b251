use crate::audience::{Audience, Viewer};
use crate::error::Error;
use crate::fallback::FallbackSender;
use crate::routes::{PageRoutes, DEFAULT_PAGE_ROUTE_IDLE_TTL};
use crate::shared::{
    AlertTopic, PruneReport, SharedAlertQueue, SubscriptionToken, DEFAULT_ITEM_TTL,
    DEFAULT_MAX_REMOVE_ATTEMPTS, DEFAULT_SUBSCRIBER_IDLE_TTL,
};
use crate::topics::{
    HighPriorityIncidentsTopic, NewBookingRequestForUserTopic, BOOKING_REQUEST_UPDATES_QUEUE,
};
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;

/// Request-layer view of a shared topic, independent of its update type.
pub trait SharedTopic: Send + Sync {
    fn name(&self) -> &'static str;

    fn subscribe(&self, token: SubscriptionToken);

    /// Drain the updates pending for `token` that `viewer` may see, as JSON.
    /// Updates meant for someone else stay queued.
    fn consume_for(&self, token: &SubscriptionToken, viewer: &Viewer) -> Result<Vec<Value>, Error>;

    fn prune(&self) -> PruneReport;

    fn subscriber_count(&self) -> usize;
}

impl<P> SharedTopic for SharedAlertQueue<P>
where
    P: AlertTopic,
    P::Update: Serialize + Audience,
{
    fn name(&self) -> &'static str {
        SharedAlertQueue::name(self)
    }

    fn subscribe(&self, token: SubscriptionToken) {
        SharedAlertQueue::subscribe(self, token)
    }

    fn consume_for(&self, token: &SubscriptionToken, viewer: &Viewer) -> Result<Vec<Value>, Error> {
        let updates = self.consume_matching(token, |update| update.is_visible_to(viewer));
        let mut values = Vec::with_capacity(updates.len());
        for update in updates {
            values.push(serde_json::to_value(update.as_ref())?);
        }
        Ok(values)
    }

    fn prune(&self) -> PruneReport {
        SharedAlertQueue::prune(self)
    }

    fn subscriber_count(&self) -> usize {
        SharedAlertQueue::subscriber_count(self)
    }
}

/// Tunables shared by every queue in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    pub subscriber_idle_ttl: Duration,
    pub item_ttl: Duration,
    pub page_route_idle_ttl: Duration,
    pub max_remove_attempts: usize,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            subscriber_idle_ttl: DEFAULT_SUBSCRIBER_IDLE_TTL,
            item_ttl: DEFAULT_ITEM_TTL,
            page_route_idle_ttl: DEFAULT_PAGE_ROUTE_IDLE_TTL,
            max_remove_attempts: DEFAULT_MAX_REMOVE_ATTEMPTS,
        }
    }
}

/// Every alert queue of the process, built once at start-up and shared
/// through application state.
pub struct AlertQueues {
    booking_requests: Arc<SharedAlertQueue<NewBookingRequestForUserTopic>>,
    incidents: Arc<SharedAlertQueue<HighPriorityIncidentsTopic>>,
    topics: HashMap<&'static str, Arc<dyn SharedTopic>>,
    pages: PageRoutes,
}

impl AlertQueues {
    pub fn new(settings: &AlertSettings, fallback: FallbackSender) -> Self {
        let booking_requests = Arc::new(
            SharedAlertQueue::new(
                NewBookingRequestForUserTopic::new(fallback).with_item_ttl(settings.item_ttl),
            )
            .with_subscriber_idle_ttl(settings.subscriber_idle_ttl)
            .with_max_remove_attempts(settings.max_remove_attempts),
        );
        let incidents = Arc::new(
            SharedAlertQueue::new(
                HighPriorityIncidentsTopic::new().with_item_ttl(settings.item_ttl),
            )
            .with_subscriber_idle_ttl(settings.subscriber_idle_ttl)
            .with_max_remove_attempts(settings.max_remove_attempts),
        );

        let mut topics: HashMap<&'static str, Arc<dyn SharedTopic>> = HashMap::new();
        topics.insert(booking_requests.name(), booking_requests.clone());
        topics.insert(incidents.name(), incidents.clone());

        info!(
            "Alert queues ready: subscriber_idle={}s, item_ttl={}s, page_route_idle={}s",
            settings.subscriber_idle_ttl.as_secs(),
            settings.item_ttl.as_secs(),
            settings.page_route_idle_ttl.as_secs()
        );

        Self {
            booking_requests,
            incidents,
            topics,
            pages: PageRoutes::new(settings.page_route_idle_ttl),
        }
    }

    /// Look a shared topic up by the name clients use.
    pub fn topic(&self, name: &str) -> Result<Arc<dyn SharedTopic>, Error> {
        self.topics
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_topic(name))
    }

    pub fn topic_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.topics.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn booking_requests(&self) -> &SharedAlertQueue<NewBookingRequestForUserTopic> {
        &self.booking_requests
    }

    pub fn incidents(&self) -> &SharedAlertQueue<HighPriorityIncidentsTopic> {
        &self.incidents
    }

    pub fn pages(&self) -> &PageRoutes {
        &self.pages
    }

    /// Prune every shared topic and the page routes.
    /// Page route evictions are reported as evicted subscribers.
    pub fn prune_all(&self) -> Vec<(&'static str, PruneReport)> {
        let mut reports: Vec<(&'static str, PruneReport)> = self
            .topic_names()
            .into_iter()
            .filter_map(|name| self.topics.get(name).map(|topic| (name, topic.prune())))
            .collect();

        reports.push((
            BOOKING_REQUEST_UPDATES_QUEUE,
            PruneReport {
                subscribers_evicted: self.pages.prune(),
                ..PruneReport::default()
            },
        ));
        reports
    }
}
