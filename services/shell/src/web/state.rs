//! services/shell/src/web/state.rs
//!
//! Defines the host's shared state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;
use webshell_core::bootstrap::AppBootstrap;
use webshell_core::bridge::BridgeOptions;
use webshell_core::navigation::NavigationGate;
use webshell_core::ports::NotificationService;
use webshell_core::session::SessionStore;

use crate::config::Config;
use crate::web::protocol::HostFrame;

/// Capacity of the frame fan-out; slow surfaces skip frames beyond this.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SessionStore>,
    pub bootstrap: Arc<AppBootstrap>,
    pub gate: Arc<NavigationGate>,
    pub notifications: Arc<dyn NotificationService>,
    /// Frames addressed to every connected surface.
    pub frames: broadcast::Sender<HostFrame>,
}

impl AppState {
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            resync_delay: self.config.auto_save_delay,
            register_push_token: self.config.push_registration,
        }
    }

    pub fn broadcast(&self, frame: HostFrame) {
        if self.frames.send(frame).is_err() {
            debug!("No surface connected; frame dropped");
        }
    }

    /// Tells every surface what to render after the login flag may have changed.
    pub async fn publish_surface(&self) {
        let surface = self.bootstrap.surface().await;
        self.broadcast(HostFrame::Surface { surface });
    }
}
