mod admin;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod mail;
mod rate_limit;
mod state;
mod tasks;
#[cfg(test)]
mod testing;

use crate::{auth::services::ensure_admin, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "taskd=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;
    ensure_admin(state.users.as_ref(), &state.config.admin).await?;

    let app = app::build_app(state)?;
    app::serve(app).await
}
