//! services/shell/src/web/ws_handler.rs
//!
//! The entry point and control loop for a surface connection on `/bridge`.
//! Frames are handled strictly in arrival order; each one finishes its side
//! effects before the next is read.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::StreamExt;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use webshell_core::bridge::BridgeDispatcher;
use webshell_core::domain::NavigationRequest;

use crate::web::{
    protocol::{HostFrame, SurfaceFrame},
    state::AppState,
    surface::SurfaceLink,
};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Per-connection state owned by the receive loop.
struct Connection {
    id: Uuid,
    link: Arc<SurfaceLink>,
    dispatcher: Arc<BridgeDispatcher>,
    /// Cancels the pending load-end resync when the page reloads or the socket closes.
    load_end: Option<CancellationToken>,
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let id = Uuid::new_v4();
    info!(connection_id = %id, "Surface connected");

    let (sender, mut receiver) = socket.split();
    let link = Arc::new(SurfaceLink::new(
        Arc::new(Mutex::new(sender)),
        app_state.config.camera_permission,
        app_state.config.gallery_permission,
    ));

    // Subscribe before the first surface frame so no broadcast is missed in between.
    let mut frames = app_state.frames.subscribe();
    let forward = {
        let link = link.clone();
        tokio::spawn(async move {
            loop {
                match frames.recv().await {
                    Ok(frame) => {
                        if link.send(&frame).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(connection_id = %id, skipped, "Surface lagging; frames skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    let surface = app_state.bootstrap.surface().await;
    if let Err(e) = link.send(&HostFrame::Surface { surface }).await {
        warn!(connection_id = %id, error = %e, "Surface closed before the first frame");
        forward.abort();
        return;
    }

    let dispatcher = Arc::new(BridgeDispatcher::new(
        app_state.store.clone(),
        link.clone(),
        link.clone(),
        app_state.notifications.clone(),
        app_state.bridge_options(),
    ));
    let mut connection = Connection {
        id,
        link,
        dispatcher,
        load_end: None,
    };

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text_frame(text.as_str(), &app_state, &mut connection).await;
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %id, "Surface sent close frame");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(connection_id = %id, error = %e, "Surface connection error");
                break;
            }
        }
    }

    // --- Cleanup ---
    if let Some(token) = connection.load_end.take() {
        token.cancel();
    }
    forward.abort();
    info!(connection_id = %id, "Surface disconnected");
}

async fn handle_text_frame(text: &str, app_state: &Arc<AppState>, connection: &mut Connection) {
    let frame = match serde_json::from_str::<SurfaceFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(connection_id = %connection.id, error = %e, "Failed to deserialize surface frame");
            return;
        }
    };

    match frame {
        SurfaceFrame::Message { data } => {
            let outcome = connection.dispatcher.handle(&data).await;
            debug!(connection_id = %connection.id, ?outcome, "Bridge message handled");
            if outcome.affects_session() {
                app_state.publish_surface().await;
            }
        }
        SurfaceFrame::LoadEnd => {
            if let Some(previous) = connection.load_end.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            connection.dispatcher.spawn_load_end(token.clone());
            connection.load_end = Some(token);
        }
        SurfaceFrame::NavigationRequest { url } => {
            let request = NavigationRequest::new(url);
            let load_in_place = app_state.gate.should_load_in_place(&request).await;
            let decision = HostFrame::NavigationDecision {
                url: request.url,
                load_in_place,
            };
            if let Err(e) = connection.link.send(&decision).await {
                warn!(connection_id = %connection.id, error = %e, "Failed to send navigation decision");
            }
        }
        SurfaceFrame::AppState { state } => {
            if let Some(surface) = app_state.bootstrap.on_lifecycle(state).await {
                app_state.broadcast(HostFrame::Surface { surface });
            }
        }
    }
}
