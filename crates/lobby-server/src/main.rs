mod config;

use std::sync::Arc;

use tracing::{info, warn};

use lobby_api::{AppStateInner, router};
use lobby_gateway::Chat;
use lobby_gateway::sweep::run_expiry_loop;
use lobby_store::MessageLog;

use crate::config::{Config, DEV_JWT_SECRET};

const DEFAULT_LOG_FILTER: &str =
    "lobby_server=debug,lobby_api=debug,lobby_gateway=debug,lobby_store=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.jwt_secret == DEV_JWT_SECRET {
        warn!("LOBBY_JWT_SECRET is unset, using the development secret");
    }

    let log = MessageLog::load_or_empty(&config.history_path);
    info!("History file: {}", log.path().display());
    let chat = Chat::with_pending_limit(log, config.inactivity, config.pending_limit);

    // Background expiry sweep
    tokio::spawn(run_expiry_loop(chat.clone(), config.sweep_interval));

    let app = router(Arc::new(AppStateInner {
        chat,
        jwt_secret: config.jwt_secret,
    }));

    info!("Lobby chat server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
