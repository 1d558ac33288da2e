use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use salesdesk::api_router::configure_api_routes;
use salesdesk::config::AppConfig;
use salesdesk::shared::state::AppState;
use salesdesk::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database.url)?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let app_state = Arc::new(AppState {
        conn: pool,
        config,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = configure_api_routes()
        .layer(cors)
        .with_state(app_state);

    info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
