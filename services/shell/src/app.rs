//! services/shell/src/app.rs
//!
//! Wires the concrete adapters into the core services and builds the shared state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use webshell_core::bootstrap::AppBootstrap;
use webshell_core::navigation::{NavigationGate, NavigationPolicy};
use webshell_core::ports::LinkOpener;
use webshell_core::session::SessionStore;

use crate::adapters::{
    ExpoPushClient, HostBiometrics, HostNotifications, HttpPushRegistrar, OsLinkOpener,
    SqliteStorage,
};
use crate::config::Config;
use crate::error::ShellError;
use crate::web::state::{AppState, FRAME_CHANNEL_CAPACITY};

/// Connects storage, restores the session and assembles [`AppState`] using
/// the OS link handler.
pub async fn build_state(config: Config) -> Result<Arc<AppState>, ShellError> {
    build_state_with_opener(config, Arc::new(OsLinkOpener)).await
}

pub async fn build_state_with_opener(
    config: Config,
    opener: Arc<dyn LinkOpener>,
) -> Result<Arc<AppState>, ShellError> {
    let config = Arc::new(config);

    // --- 1. Durable storage ---
    info!("Connecting to database...");
    let storage = Arc::new(SqliteStorage::connect(&config.database_url).await?);
    info!("Running database migrations...");
    storage.run_migrations().await?;

    // --- 2. HTTP adapters ---
    let http = reqwest::Client::builder().build()?;
    let registrar = Arc::new(HttpPushRegistrar::new(
        http.clone(),
        config.native_token_endpoint(),
    ));

    let (frames, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
    let notifications = Arc::new(HostNotifications::new(
        frames.clone(),
        ExpoPushClient::new(http, config.expo_push_url.clone()),
        config.device_push_token.clone(),
    ));

    // --- 3. Core services ---
    let store = Arc::new(SessionStore::restore(storage, registrar).await);
    let biometrics = Arc::new(HostBiometrics::new(
        config.biometric_kinds.clone(),
        config.biometric_outcome.clone(),
    ));
    let bootstrap = Arc::new(AppBootstrap::new(store.clone(), biometrics, config.bootstrap()));
    let gate = Arc::new(NavigationGate::new(
        NavigationPolicy::new(config.external_patterns.iter().cloned()),
        opener,
    ));

    Ok(Arc::new(AppState {
        config,
        store,
        bootstrap,
        gate,
        notifications,
        frames,
    }))
}
