//! Concrete alert queues and the updates they carry.
//!
//! Shared topics:
//!
//! - `NewBookingRequestForUserQueue`: a booking request was assigned to a
//!   booker. Only that booker sees it; if it is never seen on screen the
//!   booker gets an email through the fallback channel.
//! - `HighPriorityIncidentsQueue`: visible to admins. Unseen incidents are
//!   simply dropped.
//!
//! Page queue:
//!
//! - `BookingRequestUpdatesQueue`: changes to one booking request, delivered
//!   to pages displaying it.

use crate::audience::{Audience, Viewer};
use crate::error::{AlertErrorKind, Error};
use crate::fallback::{FallbackNotice, FallbackSender};
use crate::shared::{AlertTopic, DEFAULT_ITEM_TTL};
use events::Id;
use serde::Serialize;
use tokio::time::Duration;

pub const NEW_BOOKING_REQUEST_FOR_USER_QUEUE: &str = "NewBookingRequestForUserQueue";
pub const HIGH_PRIORITY_INCIDENTS_QUEUE: &str = "HighPriorityIncidentsQueue";
pub const BOOKING_REQUEST_UPDATES_QUEUE: &str = "BookingRequestUpdatesQueue";

pub const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBookingRequestForUser {
    pub booking_request_id: Id,
    pub user_id: String,
}

impl Audience for NewBookingRequestForUser {
    fn is_visible_to(&self, viewer: &Viewer) -> bool {
        viewer.is_user(&self.user_id)
    }
}

pub struct NewBookingRequestForUserTopic {
    item_ttl: Duration,
    fallback: FallbackSender,
}

impl NewBookingRequestForUserTopic {
    pub fn new(fallback: FallbackSender) -> Self {
        Self {
            item_ttl: DEFAULT_ITEM_TTL,
            fallback,
        }
    }

    pub fn with_item_ttl(mut self, item_ttl: Duration) -> Self {
        self.item_ttl = item_ttl;
        self
    }
}

impl AlertTopic for NewBookingRequestForUserTopic {
    type Update = NewBookingRequestForUser;

    fn name(&self) -> &'static str {
        NEW_BOOKING_REQUEST_FOR_USER_QUEUE
    }

    fn item_ttl(&self) -> Duration {
        self.item_ttl
    }

    fn object_expired(&self, update: &NewBookingRequestForUser) -> Result<(), Error> {
        self.fallback
            .send(FallbackNotice::BookingRequestAssigned {
                booking_request_id: update.booking_request_id,
                user_id: update.user_id.clone(),
            })
            .map_err(|err| Error {
                source: Some(Box::new(err)),
                error_kind: AlertErrorKind::Expiration(format!(
                    "fallback channel closed for booking request {}",
                    update.booking_request_id
                )),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighPriorityIncident {
    pub incident_id: Id,
}

impl HighPriorityIncident {
    pub fn role_names(&self) -> &'static [&'static str] {
        &[ADMIN_ROLE]
    }
}

impl Audience for HighPriorityIncident {
    fn is_visible_to(&self, viewer: &Viewer) -> bool {
        viewer.has_any_role(self.role_names())
    }
}

pub struct HighPriorityIncidentsTopic {
    item_ttl: Duration,
}

impl HighPriorityIncidentsTopic {
    pub fn new() -> Self {
        Self {
            item_ttl: DEFAULT_ITEM_TTL,
        }
    }

    pub fn with_item_ttl(mut self, item_ttl: Duration) -> Self {
        self.item_ttl = item_ttl;
        self
    }
}

impl Default for HighPriorityIncidentsTopic {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertTopic for HighPriorityIncidentsTopic {
    type Update = HighPriorityIncident;

    fn name(&self) -> &'static str {
        HIGH_PRIORITY_INCIDENTS_QUEUE
    }

    fn item_ttl(&self) -> Duration {
        self.item_ttl
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequestUpdate {
    pub booking_request_id: Id,
    pub summary: String,
}
