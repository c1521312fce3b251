use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use alerts::error::{AlertErrorKind, Error as AlertError};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Raised by the alert queues.
    Alert(AlertError),
    /// The request is well-formed HTTP but its values are unusable.
    BadRequest(String),
    /// The request did not say who is polling.
    Unauthenticated,
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Alert(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::Alert(err) => write!(fmt, "{err}"),
            Error::BadRequest(reason) => write!(fmt, "Bad request: {reason}"),
            Error::Unauthenticated => write!(fmt, "Unauthenticated"),
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Alert(err) => match &err.error_kind {
                AlertErrorKind::UnknownTopic(_) | AlertErrorKind::UnknownRoute => {
                    debug!("Rejecting alert request: {err}");
                    (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
                }
                AlertErrorKind::Expiration(_) | AlertErrorKind::Other(_) => {
                    error!("Alert request failed: {err}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            Error::BadRequest(reason) => {
                debug!("Rejecting alert request: {reason}");
                (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
            }
            Error::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response(),
        }
    }
}

impl From<AlertError> for Error {
    fn from(err: AlertError) -> Self {
        Self::Alert(err)
    }
}
