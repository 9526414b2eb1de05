//! crates/webshell_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core logic talks to.
//! These traits form the boundary of the hexagonal architecture: durable
//! storage, the embedded surface, the OS and the device are all injected,
//! so the core stays independent of any platform.

use async_trait::async_trait;

use crate::domain::{
    BiometricKind, BiometricOutcome, LocalNotification, MediaAsset, MediaSource,
    NativeTokenRegistration, Permission, PermissionStatus, PushMessage,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (storage, network, device).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Request rejected with status {0}")]
    Rejected(u16),
    #[error("Surface unavailable: {0}")]
    SurfaceClosed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable key/value storage surviving process restarts.
#[async_trait]
pub trait DurableStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove_item(&self, key: &str) -> PortResult<()>;
}

/// Native → web direction of the bridge.
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Evaluates `script` inside the embedded surface. Fire-and-forget.
    async fn inject_javascript(&self, script: &str) -> PortResult<()>;
}

/// Hands a locator to the operating system's default handler.
#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open_url(&self, url: &str) -> PortResult<()>;
}

#[async_trait]
pub trait DeviceService: Send + Sync {
    async fn vibrate(&self) -> PortResult<()>;

    async fn request_permission(&self, permission: Permission) -> PortResult<PermissionStatus>;

    /// Launches the camera or the photo picker. `None` when the user cancelled
    /// or the selection is delivered out of band.
    async fn launch_picker(&self, source: MediaSource) -> PortResult<Option<MediaAsset>>;

    /// Shows a blocking alert.
    async fn alert(&self, title: &str, message: &str) -> PortResult<()>;
}

#[async_trait]
pub trait BiometricService: Send + Sync {
    async fn has_hardware(&self) -> PortResult<bool>;

    async fn supported_kinds(&self) -> PortResult<Vec<BiometricKind>>;

    async fn authenticate(&self, prompt: &str) -> PortResult<BiometricOutcome>;
}

/// Registers the device push token against the signed-in user.
#[async_trait]
pub trait PushRegistrar: Send + Sync {
    async fn register_native_token(
        &self,
        bearer_token: &str,
        registration: &NativeTokenRegistration,
    ) -> PortResult<()>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn schedule_local(&self, notification: LocalNotification) -> PortResult<()>;

    async fn send_push(&self, message: &PushMessage) -> PortResult<()>;

    /// The push token issued to this device, if one is known.
    async fn device_push_token(&self) -> Option<String>;
}
