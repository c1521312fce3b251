use crate::registry::AlertQueues;
use crate::routes::PageUpdate;
use crate::topics::{BookingRequestUpdate, HighPriorityIncident, NewBookingRequestForUser};
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by queueing the matching alerts.
///
/// This handler is responsible for:
/// 1. Converting domain events into alert updates
/// 2. Publishing user and role scoped alerts to the shared topics
/// 3. Appending page updates to the routes watching the affected object
///
/// Expiration fallbacks that fail while publishing are logged here; the
/// workflow that raised the event is never failed because of an alert.
pub struct AlertEventHandler {
    queues: Arc<AlertQueues>,
}

impl AlertEventHandler {
    pub fn new(queues: Arc<AlertQueues>) -> Self {
        Self { queues }
    }
}

#[async_trait]
impl EventHandler for AlertEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::BookingRequestAssigned {
                booking_request_id,
                booker_id,
            } => {
                debug!(
                    "Handling BookingRequestAssigned event for booking request {}",
                    booking_request_id
                );

                let update = NewBookingRequestForUser {
                    booking_request_id: *booking_request_id,
                    user_id: booker_id.clone(),
                };
                if let Err(e) = self.queues.booking_requests().publish(update) {
                    warn!("Failed to queue assignment alert for {booking_request_id}: {e}");
                }
            }

            DomainEvent::BookingRequestUpdated {
                booking_request_id,
                summary,
            } => {
                let delivered =
                    self.queues
                        .pages()
                        .append(PageUpdate::BookingRequest(BookingRequestUpdate {
                            booking_request_id: *booking_request_id,
                            summary: summary.clone(),
                        }));

                debug!(
                    "Sent booking request {} update to {} page(s)",
                    booking_request_id, delivered
                );
            }

            DomainEvent::HighPriorityIncidentCreated { incident_id } => {
                debug!(
                    "Handling HighPriorityIncidentCreated event for incident {}",
                    incident_id
                );

                let update = HighPriorityIncident {
                    incident_id: *incident_id,
                };
                if let Err(e) = self.queues.incidents().publish(update) {
                    warn!("Failed to queue incident alert for {incident_id}: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::Viewer;
    use crate::fallback::{self, FallbackNotice};
    use crate::registry::AlertSettings;
    use crate::routes::PageQueue;
    use crate::shared::SubscriptionToken;
    use crate::topics::NEW_BOOKING_REQUEST_FOR_USER_QUEUE;
    use events::EventPublisher;
    use serde_json::json;

    #[tokio::test]
    async fn test_assignment_event_reaches_the_booker() {
        let (tx, _rx) = fallback::channel();
        let queues = Arc::new(AlertQueues::new(&AlertSettings::default(), tx));
        let publisher =
            EventPublisher::new().with_handler(Arc::new(AlertEventHandler::new(queues.clone())));

        let topic = queues.topic(NEW_BOOKING_REQUEST_FOR_USER_QUEUE).unwrap();
        let token = SubscriptionToken::new();
        topic.subscribe(token.clone());

        publisher
            .publish(DomainEvent::BookingRequestAssigned {
                booking_request_id: 31,
                booker_id: "booker-7".to_string(),
            })
            .await;

        assert_eq!(
            topic.consume_for(&token, &Viewer::user("booker-7")).unwrap(),
            vec![json!({"booking_request_id": 31, "user_id": "booker-7"})]
        );
    }

    #[tokio::test]
    async fn test_assignment_with_nobody_online_falls_back() {
        let (tx, mut rx) = fallback::channel();
        let queues = Arc::new(AlertQueues::new(&AlertSettings::default(), tx));
        let handler = AlertEventHandler::new(queues);

        handler
            .handle(&DomainEvent::BookingRequestAssigned {
                booking_request_id: 8,
                booker_id: "booker-1".to_string(),
            })
            .await;

        assert_eq!(
            rx.recv().await,
            Some(FallbackNotice::BookingRequestAssigned {
                booking_request_id: 8,
                user_id: "booker-1".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_booking_request_update_reaches_watching_pages() {
        let (tx, _rx) = fallback::channel();
        let queues = Arc::new(AlertQueues::new(&AlertSettings::default(), tx));
        let handler = AlertEventHandler::new(queues.clone());
        let token = queues.pages().open(PageQueue::BookingRequestUpdates, 4);

        handler
            .handle(&DomainEvent::BookingRequestUpdated {
                booking_request_id: 4,
                summary: "customer replied".to_string(),
            })
            .await;
        handler
            .handle(&DomainEvent::BookingRequestUpdated {
                booking_request_id: 5,
                summary: "unrelated".to_string(),
            })
            .await;

        let updates = queues.pages().read(&token).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].object_id(), 4);
    }

    #[tokio::test]
    async fn test_incident_event_is_queued_for_admins() {
        let (tx, _rx) = fallback::channel();
        let queues = Arc::new(AlertQueues::new(&AlertSettings::default(), tx));
        let handler = AlertEventHandler::new(queues.clone());
        let token = SubscriptionToken::new();
        queues.incidents().subscribe(token.clone());

        handler
            .handle(&DomainEvent::HighPriorityIncidentCreated { incident_id: 99 })
            .await;

        let updates = queues.incidents().consume(&token);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].incident_id, 99);
    }
}
