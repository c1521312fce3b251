use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::controller::ApiResponse;
use crate::extractors::viewer::AuthenticatedViewer;
use crate::params::alert::{require_non_empty, Subscription, UpdatesParams};
use crate::{AppState, Error};
use alerts::SubscriptionToken;
use log::*;

/// POST subscribe to a shared alert topic
#[utoipa::path(
    post,
    path = "/alerts/topics/{event_name}/subscriptions",
    params(
        ("event_name" = String, Path, description = "Name of the shared alert topic"),
    ),
    responses(
        (status = 201, description = "Subscribed; poll for updates with the returned token", body = Subscription),
        (status = 400, description = "Unknown or empty topic name"),
    )
)]
pub async fn subscribe(
    State(app_state): State<AppState>,
    Path(event_name): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let event_name = require_non_empty("event_name", &event_name)?;
    let topic = app_state.alert_queues_ref().topic(event_name)?;

    let token = SubscriptionToken::new();
    topic.subscribe(token.clone());
    debug!(
        "POST subscribed to {} ({} subscriber(s))",
        topic.name(),
        topic.subscriber_count()
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED.into(),
            Subscription {
                event_name: topic.name().to_string(),
                token: token.to_string(),
            },
        )),
    ))
}

/// GET drain the alerts pending for a subscription
///
/// Only alerts meant for the caller are returned; anything addressed to
/// someone else stays queued for them. Unknown or evicted tokens yield an
/// empty list.
#[utoipa::path(
    get,
    path = "/alerts/topics/{event_name}/updates",
    params(
        ("event_name" = String, Path, description = "Name of the shared alert topic"),
        UpdatesParams,
    ),
    responses(
        (status = 200, description = "Alerts pending for this subscription"),
        (status = 400, description = "Unknown topic or empty token"),
        (status = 401, description = "Missing x-user-id header"),
    )
)]
pub async fn updates(
    State(app_state): State<AppState>,
    Path(event_name): Path<String>,
    Query(params): Query<UpdatesParams>,
    AuthenticatedViewer(viewer): AuthenticatedViewer,
) -> Result<impl IntoResponse, Error> {
    let event_name = require_non_empty("event_name", &event_name)?;
    let token = require_non_empty("token", &params.token)?;
    let topic = app_state.alert_queues_ref().topic(event_name)?;

    let updates = topic.consume_for(&SubscriptionToken::from(token), &viewer)?;
    trace!("GET {} returned {} alert(s)", topic.name(), updates.len());

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), updates)))
}
