use crate::controller::{alert_controller, health_check_controller, page_alert_controller};
use crate::{params, AppState};
use axum::{
    routing::{get, post},
    Json, Router,
};

use utoipa::OpenApi;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Alert Broker API"
        ),
        paths(
            alert_controller::subscribe,
            alert_controller::updates,
            page_alert_controller::subscribe,
            page_alert_controller::updates,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                params::alert::Subscription,
            )
        ),
        tags(
            (name = "alert_broker", description = "Polling alert queues")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(topic_routes(app_state.clone()))
        .merge(page_routes(app_state))
        .merge(health_routes())
        .route("/api-docs/openapi.json", get(openapi_json))
}

fn topic_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/alerts/topics/:event_name/subscriptions",
            post(alert_controller::subscribe),
        )
        .route(
            "/alerts/topics/:event_name/updates",
            get(alert_controller::updates),
        )
        .with_state(app_state)
}

fn page_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/alerts/pages/updates", get(page_alert_controller::updates))
        .route(
            "/alerts/pages/:event_name/subscriptions",
            post(page_alert_controller::subscribe),
        )
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::viewer::{USER_ID_HEADER, USER_ROLES_HEADER};
    use alerts::fallback::{self, FallbackReceiver};
    use alerts::topics::{HighPriorityIncident, NewBookingRequestForUser};
    use alerts::{AlertQueues, PageUpdate};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use clap::Parser;
    use serde_json::{json, Value};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState, FallbackReceiver) {
        let config = Config::parse_from(["alert_broker_rs"]);
        let (tx, rx) = fallback::channel();
        let queues = Arc::new(AlertQueues::new(&config.alert_settings(), tx));
        let app_state = AppState::new(config, &queues);
        (define_routes(app_state.clone()), app_state, rx)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn subscribe(app: &Router, uri: &str) -> String {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["status_code"], 201);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn poll(uri: &str, user_id: Option<&str>, roles: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        if let Some(roles) = roles {
            builder = builder.header(USER_ROLES_HEADER, roles);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        let (app, _, _rx) = test_app();
        let response = send(&app, poll("/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_topic_subscription_receives_its_users_alerts_once() {
        let (app, app_state, _rx) = test_app();
        let token = subscribe(&app, "/alerts/topics/NewBookingRequestForUserQueue/subscriptions").await;

        app_state
            .alert_queues_ref()
            .booking_requests()
            .publish(NewBookingRequestForUser {
                booking_request_id: 42,
                user_id: "booker-1".to_string(),
            })
            .unwrap();

        let uri = format!("/alerts/topics/NewBookingRequestForUserQueue/updates?token={token}");
        let response = send(&app, poll(&uri, Some("booker-1"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "status_code": 200,
                "data": [{"booking_request_id": 42, "user_id": "booker-1"}]
            })
        );

        let response = send(&app, poll(&uri, Some("booker-1"), None)).await;
        assert_eq!(
            body_json(response).await,
            json!({"status_code": 200, "data": []})
        );
    }

    #[tokio::test]
    async fn test_incidents_are_filtered_by_role_header() {
        let (app, app_state, _rx) = test_app();
        let token = subscribe(&app, "/alerts/topics/HighPriorityIncidentsQueue/subscriptions").await;
        app_state
            .alert_queues_ref()
            .incidents()
            .publish(HighPriorityIncident { incident_id: 5 })
            .unwrap();

        let uri = format!("/alerts/topics/HighPriorityIncidentsQueue/updates?token={token}");
        let response = send(&app, poll(&uri, Some("customer-1"), None)).await;
        assert_eq!(body_json(response).await["data"], json!([]));

        let response = send(&app, poll(&uri, Some("ops-1"), Some("Booker, Admin"))).await;
        assert_eq!(body_json(response).await["data"], json!([{"incident_id": 5}]));
    }

    #[tokio::test]
    async fn test_topic_updates_require_a_user_id() {
        let (app, _, _rx) = test_app();
        let token = subscribe(&app, "/alerts/topics/HighPriorityIncidentsQueue/subscriptions").await;

        let uri = format!("/alerts/topics/HighPriorityIncidentsQueue/updates?token={token}");
        let response = send(&app, poll(&uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_topic_and_empty_token_are_bad_requests() {
        let (app, _, _rx) = test_app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/alerts/topics/NoSuchQueue/subscriptions")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            poll(
                "/alerts/topics/HighPriorityIncidentsQueue/updates?token=",
                Some("ops-1"),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_token_polls_an_empty_list() {
        let (app, _, _rx) = test_app();
        let response = send(
            &app,
            poll(
                "/alerts/topics/HighPriorityIncidentsQueue/updates?token=never-issued",
                Some("ops-1"),
                Some("Admin"),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], json!([]));
    }

    #[tokio::test]
    async fn test_page_route_receives_updates_for_its_object() {
        let (app, app_state, _rx) = test_app();
        let token = subscribe(
            &app,
            "/alerts/pages/BookingRequestUpdatesQueue/subscriptions?object_id=7",
        )
        .await;

        for (id, summary) in [(7, "customer replied"), (8, "other request")] {
            app_state
                .alert_queues_ref()
                .pages()
                .append(PageUpdate::BookingRequest(
                    alerts::topics::BookingRequestUpdate {
                        booking_request_id: id,
                        summary: summary.to_string(),
                    },
                ));
        }

        let uri = format!("/alerts/pages/updates?token={token}");
        let response = send(&app, poll(&uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["data"],
            json!([{"booking_request_id": 7, "summary": "customer replied"}])
        );
    }

    #[tokio::test]
    async fn test_page_route_errors() {
        let (app, _, _rx) = test_app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/alerts/pages/HighPriorityIncidentsQueue/subscriptions?object_id=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, poll("/alerts/pages/updates?token=closed", None, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_alert_paths() {
        let (app, _, _rx) = test_app();
        let response = send(&app, poll("/api-docs/openapi.json", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = body_json(response).await;
        assert!(doc["paths"]["/alerts/pages/updates"].is_object());
        assert!(doc["paths"]["/alerts/topics/{event_name}/updates"].is_object());
    }
}
