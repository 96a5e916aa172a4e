mod app;
mod articles;
mod auth;
mod config;
mod error;
mod memory;
mod state;
mod store;
mod validation;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "articles=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;
    tracing::info!(
        blacklist = app_state.config.jwt.blacklist_enabled,
        ttl_minutes = app_state.config.jwt.ttl_minutes,
        "auth configured"
    );

    app::spawn_revocation_sweeper(&app_state);
    let app = app::build_app(app_state);
    app::serve(app).await
}
