use std::sync::Arc;

mod app;
mod auth;
mod budget;
mod catalog;
mod config;
mod db;
mod error;
mod extract;
mod records;
mod state;

use crate::auth::services::CredentialStore;
use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "parallax=debug,axum=info,tower_http=info".to_string());
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
    let db = db::connect(&config).await?;
    let state = AppState::from_pool(config.clone(), db);

    if let Some(admin) = &config.admin {
        CredentialStore::new(Arc::clone(&state.users))
            .ensure_admin(&admin.email, &admin.password)
            .await?;
    }

    app::serve(app::build_app(state), &config).await
}
