use anyhow::Context;
use sweetshop::{app, auth, config::AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "sweetshop=debug,axum=info,tower_http=info".to_string());
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
    let (host, port) = (config.host.clone(), config.port);
    let admin = config.admin.clone();

    let state = AppState::init(config).await?;

    if let Some(admin) = admin {
        auth::services::ensure_admin(state.users.as_ref(), &admin)
            .await
            .context("bootstrap admin")?;
    }

    app::serve(app::build_app(state), &host, port).await
}
