use alerts::fallback;
use alerts::{AlertQueues, PruneDriver};
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting alert broker ({})", config.runtime_env());

    let shutdown = CancellationToken::new();

    let (fallback_tx, fallback_rx) = fallback::channel();
    let dispatcher = tokio::spawn(fallback::run_dispatcher(fallback_rx, shutdown.clone()));

    let alert_queues = Arc::new(AlertQueues::new(&config.alert_settings(), fallback_tx));
    let pruner = PruneDriver::spawn(
        Arc::clone(&alert_queues),
        config.prune_interval(),
        shutdown.clone(),
    );

    let app_state = AppState::new(config, &alert_queues);

    let server_shutdown = shutdown.clone();
    let server = web::init_server(app_state, async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
            _ = server_shutdown.cancelled() => {}
        }
    });

    if let Err(e) = server.await {
        error!("Server stopped with an error: {e}");
    }

    shutdown.cancel();
    if let Err(e) = pruner.await {
        warn!("Alert prune driver did not stop cleanly: {e}");
    }
    match dispatcher.await {
        Ok(sent) => info!("Fallback dispatcher handed off {sent} notice(s)"),
        Err(e) => warn!("Fallback dispatcher did not stop cleanly: {e}"),
    }
}
