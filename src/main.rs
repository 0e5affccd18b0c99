use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use freight_exchange::config::{Config, LogFormat};
use freight_exchange::engine::accounts::seed_admin;
use freight_exchange::engine::notify::{LogTransport, run_notification_worker};
use freight_exchange::error::AppError;
use freight_exchange::{api, state};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let (app_state, notification_rx) = state::AppState::new(
        config.notification_queue_size,
        config.event_buffer_size,
        chrono::Duration::hours(config.session_ttl_hours),
        Arc::new(LogTransport),
    );
    let shared_state = Arc::new(app_state);

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let admin = seed_admin(&shared_state, "Administrator", email, password)?;
        tracing::info!(admin_id = %admin.id, "admin account seeded");
    }

    tokio::spawn(run_notification_worker(
        shared_state.clone(),
        notification_rx,
    ));

    let sweeper_state = shared_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sweeper_state.sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired sessions removed");
            }
        }
    });

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
