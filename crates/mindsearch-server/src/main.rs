use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindsearch_server::config::ServerConfig;
use mindsearch_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mindsearch_server=info,mindsearch_stream=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let app = mindsearch_server::app_router(AppState::new(&config));

    tracing::info!(
        lang = ?config.settings.lang,
        model_format = %config.settings.model_format,
        "MindSearch server listening on {}",
        config.addr
    );

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
