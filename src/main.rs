mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
#[cfg(test)]
mod memory;
mod products;
mod state;
mod validation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "product_api=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;
    match app_state.config.tokens.ttl_minutes {
        Some(minutes) => tracing::info!(minutes, "access tokens expire"),
        None => tracing::info!("access tokens stay valid until logout"),
    }

    app::serve(app::build_app(app_state)).await
}
