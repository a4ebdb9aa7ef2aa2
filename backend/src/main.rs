use backend::config::Config;
use backend::error::ApiError;
use backend::{app, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    init_logging();
    let config = Config::from_env()?;
    let state = AppState::from_config(&config).await;
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| ApiError::Internal(format!("bind error: {err}")))?;
    info!("draw service listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .await
        .map_err(|err| ApiError::Internal(format!("server error: {err}")))?;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
