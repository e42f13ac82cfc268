pub mod api;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use services::config_store::AppConfig;
use services::detection::FallacyDetector;
use state::AppState;

use std::sync::OnceLock;
use std::time::Instant;
use tokio::signal;
use tracing::{info, warn};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

fn startup_elapsed_ms() -> u128 {
    PROCESS_START
        .get()
        .map(|t| t.elapsed().as_millis())
        .unwrap_or(0)
}

/// Start the detection server and block until Ctrl+C or SIGTERM.
pub async fn run() -> anyhow::Result<()> {
    PROCESS_START.get_or_init(Instant::now);
    let _ = dotenvy::dotenv();

    logging::init(&logging::LogSettings::from_env());
    info!(startup_ms = startup_elapsed_ms(), "logging.initialized");

    let config = AppConfig::load();
    info!(config = ?config, "config.loaded");
    if config.uses_default_secret() {
        warn!("SECRET_KEY not set; using the built-in default");
    }

    let detector = FallacyDetector::new(&config)?;
    info!(
        endpoint = %detector.endpoint(),
        model = %config.model_name,
        dialect = detector.dialect().as_str(),
        min_text_chars = detector.min_text_chars(),
        "detector.ready"
    );

    let app = api::create_router(AppState::new(detector));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(startup_ms = startup_elapsed_ms(), "Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("=== fallacyGuard Exited ===");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
