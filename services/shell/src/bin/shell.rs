//! services/shell/src/bin/shell.rs

use shell_lib::{app::build_state, config::Config, error::ShellError, web};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ShellError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting host...");
    let bind_address = config.bind_address;

    // --- 2. Storage, adapters and core services ---
    let app_state = build_state(config).await?;

    // --- 3. Biometric gate and session revalidation ---
    let surface = app_state.bootstrap.start().await;
    info!(?surface, "Initial surface selected");

    // --- 4. Start the Server ---
    let app = web::router(app_state);
    info!("Starting server on {}", bind_address);
    info!("Surface shims connect to ws://{}/bridge", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
