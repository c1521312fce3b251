use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use events::Id;

/// Query string carried by every poll.
#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct UpdatesParams {
    /// Token returned when the subscription was created.
    pub(crate) token: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct PageSubscriptionParams {
    /// Id of the object the page displays.
    pub(crate) object_id: Id,
}

/// Body returned after subscribing to a topic or opening a page route.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct Subscription {
    pub(crate) event_name: String,
    pub(crate) token: String,
}

/// Rejects blank path and query values before they reach the queues.
pub(crate) fn require_non_empty<'a>(field: &str, value: &'a str) -> crate::Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(crate::Error::BadRequest(format!("{field} must not be empty")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty_trims_and_rejects_blank_values() {
        assert_eq!(require_non_empty("token", " abc ").unwrap(), "abc");
        assert!(matches!(
            require_non_empty("token", "   "),
            Err(crate::Error::BadRequest(_))
        ));
    }
}
