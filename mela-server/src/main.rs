use mela_server::{AppState, Config, api, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logger::init_logger(config.log_json, config.log_dir.as_deref());

    tracing::info!("Starting mela-server (env: {})", config.environment);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let (state, push_rx) = AppState::connect(config).await?;

    let push_worker = state.push_worker();
    tokio::spawn(push_worker.run(push_rx));

    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("mela-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("mela-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received");
}
