//! services/shell/src/web/surface.rs
//!
//! One connected surface shim, seen from the core as the script injector and
//! the device. Device actions are forwarded as frames; permission answers
//! come from the host configuration.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, SinkExt};
use tokio::sync::Mutex;
use tracing::{debug, info};
use webshell_core::domain::{MediaAsset, MediaSource, Permission, PermissionStatus};
use webshell_core::ports::{DeviceService, PortError, PortResult, ScriptInjector};

use crate::web::protocol::{DeviceAction, HostFrame};

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

pub struct SurfaceLink {
    sender: WsSender,
    camera: PermissionStatus,
    gallery: PermissionStatus,
}

impl SurfaceLink {
    pub fn new(sender: WsSender, camera: PermissionStatus, gallery: PermissionStatus) -> Self {
        Self {
            sender,
            camera,
            gallery,
        }
    }

    pub async fn send(&self, frame: &HostFrame) -> PortResult<()> {
        self.sender
            .lock()
            .await
            .send(Message::Text(frame.to_json().into()))
            .await
            .map_err(|e| PortError::SurfaceClosed(e.to_string()))
    }
}

#[async_trait]
impl ScriptInjector for SurfaceLink {
    async fn inject_javascript(&self, script: &str) -> PortResult<()> {
        self.send(&HostFrame::InjectJavascript {
            script: script.to_string(),
        })
        .await
    }
}

#[async_trait]
impl DeviceService for SurfaceLink {
    async fn vibrate(&self) -> PortResult<()> {
        self.send(&HostFrame::DeviceAction {
            action: DeviceAction::Vibrate,
        })
        .await
    }

    async fn request_permission(&self, permission: Permission) -> PortResult<PermissionStatus> {
        let status = match permission {
            Permission::Camera => self.camera,
            Permission::MediaLibrary => self.gallery,
        };
        debug!(?permission, ?status, "Permission answered from configuration");
        Ok(status)
    }

    /// The selected image reaches the page through the shim, never through the host.
    async fn launch_picker(&self, source: MediaSource) -> PortResult<Option<MediaAsset>> {
        info!(?source, "Launching picker on the surface");
        self.send(&HostFrame::DeviceAction {
            action: DeviceAction::LaunchPicker { source },
        })
        .await?;
        Ok(None)
    }

    async fn alert(&self, title: &str, message: &str) -> PortResult<()> {
        self.send(&HostFrame::Alert {
            title: title.to_string(),
            message: message.to_string(),
        })
        .await
    }
}
