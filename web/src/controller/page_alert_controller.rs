use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::controller::ApiResponse;
use crate::params::alert::{require_non_empty, PageSubscriptionParams, Subscription, UpdatesParams};
use crate::{AppState, Error};
use alerts::{PageQueue, PageUpdate, SubscriptionToken};
use log::*;

/// POST open a page route for one object
#[utoipa::path(
    post,
    path = "/alerts/pages/{event_name}/subscriptions",
    params(
        ("event_name" = String, Path, description = "Name of the page queue"),
        PageSubscriptionParams,
    ),
    responses(
        (status = 201, description = "Route opened; poll for updates with the returned token", body = Subscription),
        (status = 400, description = "Unknown or empty page queue name"),
    )
)]
pub async fn subscribe(
    State(app_state): State<AppState>,
    Path(event_name): Path<String>,
    Query(params): Query<PageSubscriptionParams>,
) -> Result<impl IntoResponse, Error> {
    let event_name = require_non_empty("event_name", &event_name)?;
    let queue = PageQueue::from_name(event_name)?;

    let token = app_state
        .alert_queues_ref()
        .pages()
        .open(queue, params.object_id);
    debug!("POST opened {} route for {}", queue.name(), params.object_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED.into(),
            Subscription {
                event_name: queue.name().to_string(),
                token: token.to_string(),
            },
        )),
    ))
}

/// GET drain the updates pending for a page route
#[utoipa::path(
    get,
    path = "/alerts/pages/updates",
    params(UpdatesParams),
    responses(
        (status = 200, description = "Updates pending for this page"),
        (status = 400, description = "Unknown, expired or empty route token"),
    )
)]
pub async fn updates(
    State(app_state): State<AppState>,
    Query(params): Query<UpdatesParams>,
) -> Result<impl IntoResponse, Error> {
    let token = require_non_empty("token", &params.token)?;
    let updates = app_state
        .alert_queues_ref()
        .pages()
        .read(&SubscriptionToken::from(token))?;

    let updates: Vec<PageUpdate> = updates
        .iter()
        .map(|update| PageUpdate::clone(update))
        .collect();
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), updates)))
}
