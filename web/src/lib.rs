use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use log::*;
use std::future::Future;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tower_http::cors::CorsLayer;

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
mod error;
mod extractors;
mod params;
pub mod router;

/// Serve the alert API until `shutdown` resolves.
pub async fn init_server(
    app_state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", host, app_state.config.port);
    let cors_layer = cors_layer(&app_state.config.allowed_origins);

    let listener = TcpListener::bind(&server_url).await?;
    info!(
        "Server starting... listening for connections on http://{} ({})",
        server_url, app_state.config.runtime_env
    );

    axum::serve(listener, router::define_routes(app_state).layer(cors_layer))
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS, Method::POST])
        .allow_credentials(true)
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(extractors::viewer::USER_ID_HEADER),
            HeaderName::from_static(extractors::viewer::USER_ROLES_HEADER),
        ])
        .allow_origin(origins)
        .max_age(Duration::from_secs(24 * 3600))
}
