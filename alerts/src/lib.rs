//! In-process alert queues for pushing short-lived notices to polling clients.
//!
//! Clients do not keep a connection open. They subscribe to a named queue,
//! receive a token, and poll with it. Every alert has a deadline: if nobody
//! consumes it in time, the queue's expiration hook runs exactly once so the
//! alert can be handed to a slower channel (email) or dropped.
//!
//! # Architecture
//!
//! - **Shared topics**: one [`SharedAlertQueue`] per topic. Each subscriber
//!   gets its own mailbox, so one client draining its alerts never hides them
//!   from another.
//! - **Page routes**: [`PageRoutes`] hands out per-page mailboxes bound to a
//!   single object id (one booking request, one incident).
//! - **Expiry index**: subscribers and undelivered alerts share the same
//!   deadline bookkeeping ([`ExpiryIndex`]). Deadlines are renewed on every
//!   poll and forgotten when the tracked thing goes away.
//! - **Pruning**: a background [`PruneDriver`] sweeps every queue on a fixed
//!   period. Sweeps never block a poller and never abort on a failing hook.
//!
//! # Message Flow
//!
//! 1. A workflow publishes a [`events::DomainEvent`]
//! 2. [`AlertEventHandler`] turns it into a topic update or page update
//! 3. The update is appended to every current subscriber's mailbox
//! 4. A client polls with its token and drains the updates it may see
//! 5. Alerts that nobody consumed expire on the next prune and run the hook
//!
//! # Example: Publishing an alert
//!
//! ```rust,ignore
//! use alerts::topics::HighPriorityIncident;
//!
//! app_state
//!     .alert_queues
//!     .incidents()
//!     .publish(HighPriorityIncident { incident_id })?;
//! ```
//!
//! # Modules
//!
//! - `audience`: who may see an update ([`Viewer`], [`Audience`])
//! - `domain_event_handler`: routes domain events onto queues
//! - `driver`: periodic pruning task
//! - `error`: crate error type
//! - `expiry`: deadline index shared by subscribers, alerts and routes
//! - `fallback`: channel for alerts that expired unseen
//! - `mailbox`: per-subscriber and per-page update buffers
//! - `registry`: the process-wide set of queues, looked up by name
//! - `routes`: page-scoped routes
//! - `shared`: the generic shared alert queue
//! - `topics`: concrete topics and their update types

pub mod audience;
pub mod domain_event_handler;
pub mod driver;
pub mod error;
pub mod expiry;
pub mod fallback;
pub mod mailbox;
pub mod registry;
pub mod routes;
pub mod shared;
pub mod topics;

pub use audience::{Audience, Viewer};
pub use domain_event_handler::AlertEventHandler;
pub use driver::PruneDriver;
pub use error::{AlertErrorKind, Error};
pub use expiry::ExpiryIndex;
pub use registry::{AlertQueues, AlertSettings, SharedTopic};
pub use routes::{PageQueue, PageRoutes, PageUpdate};
pub use shared::{AlertTopic, PruneReport, SharedAlertQueue, SubscriptionToken};
