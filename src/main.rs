mod auth;
mod catalog;
mod config;
mod models;
mod routes;
mod services;
mod utils;

use config::{AppConfig, ClipboardMode};
use services::clipboard::{ClipboardSink, NoClipboard, SystemClipboard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env()?;

    let webhook = Arc::new(services::webhook::WebhookClient::new(
        config.webhook_url.clone(),
        config.webhook_timeout,
    )?);
    tracing::info!(url = %webhook.url(), "generation webhook configured");

    let clipboard: Arc<dyn ClipboardSink> = match config.clipboard {
        ClipboardMode::System => match SystemClipboard::new() {
            Ok(clipboard) => Arc::new(clipboard),
            Err(e) => {
                tracing::warn!("system clipboard unavailable, copying disabled: {e:#}");
                Arc::new(NoClipboard)
            }
        },
        ClipboardMode::None => Arc::new(NoClipboard),
    };

    let sessions: routes::Sessions = Arc::new(Mutex::new(HashMap::new()));
    routes::spawn_session_sweeper(sessions.clone(), config.session_ttl);

    let app_state = routes::AppState {
        webhook,
        auth: Arc::from(auth::gate_for(config.auth_tokens.clone())),
        clipboard,
        sessions,
        image_fallback: config.image_fallback,
        body_limit: config.max_body_bytes,
    };

    let app = routes::router(app_state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
