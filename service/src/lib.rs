use alerts::{AlertEventHandler, AlertQueues};
use config::Config;
use events::EventPublisher;
use log::info;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub alert_queues: Arc<AlertQueues>,
    pub event_publisher: Arc<EventPublisher>,
    pub config: Config,
}

impl AppState {
    /// Wires the alert queues into the event publisher so that every
    /// published domain event is routed onto the matching queue.
    pub fn new(app_config: Config, alert_queues: &Arc<AlertQueues>) -> Self {
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(AlertEventHandler::new(Arc::clone(alert_queues))));

        info!(
            "Application state ready with {} event handler(s)",
            event_publisher.handler_count()
        );

        Self {
            alert_queues: Arc::clone(alert_queues),
            event_publisher: Arc::new(event_publisher),
            config: app_config,
        }
    }

    pub fn alert_queues_ref(&self) -> &AlertQueues {
        self.alert_queues.as_ref()
    }
}
