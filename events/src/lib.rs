//! Domain event infrastructure for the alert broker.
//!
//! Workflow code emits [`DomainEvent`]s through an [`EventPublisher`]; typed
//! handlers registered on the publisher turn them into side effects such as
//! alert fan-out. Handlers are registered explicitly at start-up rather than
//! discovered at runtime.
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing the workflow events that produce alerts
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on other workspace crates, so any layer can
//! publish without creating a dependency cycle.

use async_trait::async_trait;
use std::sync::Arc;

/// Identifier of a workflow record (booking request, incident, ...).
pub type Id = i64;

/// Workflow events that can produce user-facing alerts.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A booking request has been assigned to a booker.
    /// Produces a user-scoped alert for the booker.
    BookingRequestAssigned {
        booking_request_id: Id,
        /// Id of the user the request was assigned to.
        booker_id: String,
    },
    /// Something changed on a booking request (new email, state change).
    /// Only pages currently displaying this booking request are notified.
    BookingRequestUpdated {
        booking_request_id: Id,
        /// Short human readable description of the change.
        summary: String,
    },
    /// A high priority incident was detected. Admins are alerted.
    HighPriorityIncidentCreated { incident_id: Id },
}

impl DomainEvent {
    /// Stable name of the event, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookingRequestAssigned { .. } => "booking_request_assigned",
            DomainEvent::BookingRequestUpdated { .. } => "booking_request_updated",
            DomainEvent::HighPriorityIncidentCreated { .. } => "high_priority_incident_created",
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like queueing alerts,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers.
    /// Handlers are called sequentially. Handlers own their error handling;
    /// one handler cannot stop the remaining ones from running.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
