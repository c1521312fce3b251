//! Error types for the `alerts` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level alerts error type.
///
/// Most broker operations cannot fail: unknown subscribers yield empty
/// results and a topic without subscribers expires the update instead of
/// erroring. The remaining failures are lookups the request layer made with a
/// bad name or token, and expiration hooks whose fallback could not be
/// handed off. `web` maps the `error_kind` to an HTTP status.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: AlertErrorKind,
}

/// Enum representing the kinds of errors that can occur in the `alerts` layer.
#[derive(Debug, PartialEq)]
pub enum AlertErrorKind {
    /// No shared topic or page queue is registered under this name.
    UnknownTopic(String),
    /// The page route token is not (or no longer) open.
    UnknownRoute,
    /// An expiration hook failed to run its fallback.
    Expiration(String),
    Other(String),
}

impl Error {
    pub fn unknown_topic(name: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: AlertErrorKind::UnknownTopic(name.into()),
        }
    }

    pub fn unknown_route() -> Self {
        Error {
            source: None,
            error_kind: AlertErrorKind::UnknownRoute,
        }
    }

    pub fn expiration(reason: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: AlertErrorKind::Expiration(reason.into()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            AlertErrorKind::UnknownTopic(name) => write!(f, "unknown alert queue `{name}`"),
            AlertErrorKind::UnknownRoute => write!(f, "unknown page route"),
            AlertErrorKind::Expiration(reason) => write!(f, "expiration hook failed: {reason}"),
            AlertErrorKind::Other(reason) => write!(f, "alerts error: {reason}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: AlertErrorKind::Other("failed to serialize alert update".to_string()),
        }
    }
}
