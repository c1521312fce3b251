use crate::Error;
use alerts::Viewer;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use log::*;

pub(crate) const USER_ID_HEADER: &str = "x-user-id";
pub(crate) const USER_ROLES_HEADER: &str = "x-user-roles";

/// The polling user, as asserted by the upstream gateway.
pub(crate) struct AuthenticatedViewer(pub Viewer);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedViewer
where
    S: Send + Sync,
{
    type Rejection = Error;

    // Requires a non-empty user id header. Roles are optional and comma separated.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match viewer_from_headers(&parts.headers) {
            Some(viewer) => Ok(AuthenticatedViewer(viewer)),
            None => {
                trace!("Request without {USER_ID_HEADER} header rejected");
                Err(Error::Unauthenticated)
            }
        }
    }
}

fn viewer_from_headers(headers: &HeaderMap) -> Option<Viewer> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    let roles: Vec<String> = headers
        .get(USER_ROLES_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Viewer::user(user_id).with_roles(roles))
}
