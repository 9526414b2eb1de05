//! crates/webshell_core/src/domain.rs
//!
//! Defines the core data structures shared by the session store, the bridge
//! dispatcher and the host. Serialized field names follow what the embedded
//! web application and the persisted store already use.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Local-storage key the web application reads the token from.
pub const STORAGE_KEY_TOKEN: &str = "auth_token";
/// Local-storage key the web application reads the JSON-encoded user from.
pub const STORAGE_KEY_USER: &str = "auth_user";
/// Durable-storage key holding the whole persisted session.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

/// The authenticated user profile handed over by the web application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Backends disagree on whether ids are strings or numbers; both land as a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    })
}

/// The authenticated identity held by the app.
///
/// `is_logged_in` implies `token.is_some()`; the session store keeps that true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_logged_in: bool,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none() && !self.is_logged_in
    }
}

/// Wire envelope of the persisted session, `{"state": {...}, "version": 0}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: Session,
    #[serde(default)]
    pub version: u32,
}

/// An outgoing locator the embedded surface wants to follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub url: String,
}

impl NavigationRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Where a navigation request ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    LoadInPlace,
    HandOffToOs,
}

// --- Device capabilities ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Camera,
    MediaLibrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Which picker to launch for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Camera,
    Library,
}

/// An image returned by a capture or picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricKind {
    Fingerprint,
    FacialRecognition,
    Iris,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BiometricOutcome {
    Success,
    Cancelled,
    Failed { reason: String },
    Unavailable,
}

impl BiometricOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BiometricOutcome::Success)
    }
}

// --- Push registration and notifications ---

/// Body of `POST /api/users/native-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenRegistration {
    pub user_id: String,
    pub native_token: String,
}

/// A notification shown by the device after `delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(with = "duration_secs")]
    pub delay: Duration,
}

/// A push message addressed to a device push token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
}

impl PushMessage {
    pub fn new(to: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            sound: "default".to_string(),
            title: title.into(),
            body: body.into(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

// --- Surfaces ---

/// One entry of the main tab bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub name: String,
    pub title: String,
    pub url: String,
}

/// What the app renders: the full-screen login page or the tabbed main surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Surface {
    Locked,
    Authentication { url: String },
    Main { tabs: Vec<Tab> },
}

/// OS-level lifecycle transitions the host forwards to the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
}
