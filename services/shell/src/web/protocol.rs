//! services/shell/src/web/protocol.rs
//!
//! Defines the WebSocket frame protocol between the surface shim (the
//! process hosting the embedded web view) and the host on `/bridge`.

use serde::{Deserialize, Serialize};
use webshell_core::domain::{AppLifecycle, LocalNotification, MediaSource, Surface};

//=========================================================================================
// Frames Sent FROM the Surface Shim TO the Host
//=========================================================================================

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceFrame {
    /// A raw payload the page posted through its message channel.
    Message { data: String },

    /// The page finished loading.
    LoadEnd,

    /// The page wants to follow a locator; answered with `navigation_decision`.
    NavigationRequest { url: String },

    /// An OS lifecycle transition observed by the shim.
    AppState { state: AppLifecycle },
}

//=========================================================================================
// Frames Sent FROM the Host TO the Surface Shim
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAction {
    Vibrate,
    LaunchPicker { source: MediaSource },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostFrame {
    /// Evaluate `script` inside the page.
    InjectJavascript { script: String },

    NavigationDecision { url: String, load_in_place: bool },

    DeviceAction { action: DeviceAction },

    Alert { title: String, message: String },

    /// The surface the shim should render now.
    Surface { surface: Surface },

    /// A local notification that came due.
    Notification { notification: LocalNotification },
}

impl HostFrame {
    pub fn to_json(&self) -> String {
        // Every variant is plain data; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
