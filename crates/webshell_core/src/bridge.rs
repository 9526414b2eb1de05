//! crates/webshell_core/src/bridge.rs
//!
//! Inbound side of the bridge: classifies what the embedded surface posts,
//! mutates the session store and mirrors the result back into the surface.
//!
//! Two protocols share the channel. A JSON object tagged by `type` is the
//! structured protocol; anything that is not JSON is matched against the
//! closed set of legacy plain-string commands and otherwise ignored.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{MediaAsset, MediaSource, Permission, User};
use crate::ports::{DeviceService, NotificationService, ScriptInjector};
use crate::scripts;
use crate::session::SessionStore;

/// Delay before the load-end resync pushes the session into the page.
pub const DEFAULT_RESYNC_DELAY: Duration = Duration::from_millis(500);

//=========================================================================================
// Messages Sent FROM the Embedded Surface TO the Native Layer
//=========================================================================================

/// The structured protocol, discriminated by `type`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebMessage {
    SetToken {
        #[serde(default)]
        token: Option<String>,
    },
    SetUser {
        #[serde(default)]
        user: Option<User>,
    },
    /// Requires both fields; a partial login is dropped.
    LoginSuccess {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        user: Option<User>,
    },
    GetToken {},
    GetUser {},
    ClearAuth {},
}

/// `type` values of [`WebMessage`] as they appear on the wire.
const STRUCTURED_TYPES: &[&str] = &[
    "SET_TOKEN",
    "SET_USER",
    "LOGIN_SUCCESS",
    "GET_TOKEN",
    "GET_USER",
    "CLEAR_AUTH",
];

/// The legacy plain-string commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCommand {
    Logout,
    Vibrate,
    OpenCamera,
    OpenGallery,
}

impl FromStr for LegacyCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logout" => Ok(Self::Logout),
            "vibrate" => Ok(Self::Vibrate),
            "openCamera" => Ok(Self::OpenCamera),
            "openGallery" => Ok(Self::OpenGallery),
            _ => Err(()),
        }
    }
}

/// Result of classifying one raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Structured(WebMessage),
    /// Valid JSON that is not a known structured message; carries the `type` if any.
    Unrecognized(Option<String>),
    /// A known `type` whose fields did not decode.
    Malformed { kind: String, reason: String },
    Legacy(LegacyCommand),
    Ignored,
}

/// Structured decode first, then the legacy literals, otherwise ignored.
pub fn classify(raw: &str) -> Inbound {
    let decode_error = match serde_json::from_str::<WebMessage>(raw) {
        Ok(message) => return Inbound::Structured(message),
        Err(e) => e,
    };

    match serde_json::from_str::<JsonValue>(raw) {
        // `null` has no fields to read and falls through like non-JSON text.
        Ok(JsonValue::Null) | Err(_) => raw
            .parse::<LegacyCommand>()
            .map(Inbound::Legacy)
            .unwrap_or(Inbound::Ignored),
        Ok(value) => match value.get("type") {
            Some(JsonValue::String(kind)) if STRUCTURED_TYPES.contains(&kind.as_str()) => {
                Inbound::Malformed {
                    kind: kind.clone(),
                    reason: decode_error.to_string(),
                }
            }
            other => Inbound::Unrecognized(
                other.map(|t| t.as_str().map(str::to_owned).unwrap_or_else(|| t.to_string())),
            ),
        },
    }
}

//=========================================================================================
// Dispatch
//=========================================================================================

/// What handling one message did.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    TokenStored,
    UserStored,
    LoggedIn { push_registration: bool },
    TokenPushed,
    UserPushed,
    AuthCleared,
    LoggedOut,
    Vibrated,
    MediaLaunched {
        source: MediaSource,
        asset: Option<MediaAsset>,
    },
    PermissionDenied(Permission),
    DeviceError,
    /// A known structured message missing a required field.
    Incomplete(&'static str),
    /// A known structured `type` with a field of the wrong shape.
    Malformed(String),
    Unrecognized(Option<String>),
    Ignored,
}

impl DispatchOutcome {
    /// Whether the login flag may have changed, so the host re-selects the surface.
    pub fn affects_session(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::TokenStored
                | DispatchOutcome::LoggedIn { .. }
                | DispatchOutcome::AuthCleared
                | DispatchOutcome::LoggedOut
        )
    }
}

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub resync_delay: Duration,
    /// Register the device push token after `LOGIN_SUCCESS`.
    pub register_push_token: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            resync_delay: DEFAULT_RESYNC_DELAY,
            register_push_token: true,
        }
    }
}

/// One dispatcher per embedded surface.
pub struct BridgeDispatcher {
    store: Arc<SessionStore>,
    surface: Arc<dyn ScriptInjector>,
    device: Arc<dyn DeviceService>,
    notifications: Arc<dyn NotificationService>,
    options: BridgeOptions,
}

impl BridgeDispatcher {
    pub fn new(
        store: Arc<SessionStore>,
        surface: Arc<dyn ScriptInjector>,
        device: Arc<dyn DeviceService>,
        notifications: Arc<dyn NotificationService>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            store,
            surface,
            device,
            notifications,
            options,
        }
    }

    pub async fn handle(&self, raw: &str) -> DispatchOutcome {
        debug!(len = raw.len(), "Bridge message received");
        match classify(raw) {
            Inbound::Structured(message) => self.handle_structured(message).await,
            Inbound::Legacy(command) => self.handle_legacy(command).await,
            Inbound::Unrecognized(kind) => {
                info!(kind = ?kind, "Unknown bridge message type");
                DispatchOutcome::Unrecognized(kind)
            }
            Inbound::Malformed { kind, reason } => {
                warn!(kind = %kind, reason = %reason, "Malformed bridge message");
                DispatchOutcome::Malformed(kind)
            }
            Inbound::Ignored => DispatchOutcome::Ignored,
        }
    }

    async fn handle_structured(&self, message: WebMessage) -> DispatchOutcome {
        match message {
            WebMessage::SetToken { token } => match non_empty(token) {
                Some(token) => {
                    self.inject(&scripts::store_token(&token)).await;
                    self.store.set_token(token).await;
                    DispatchOutcome::TokenStored
                }
                None => DispatchOutcome::Incomplete("token"),
            },
            WebMessage::SetUser { user } => match user {
                Some(user) => {
                    self.inject(&scripts::store_user(&user)).await;
                    self.store.set_user(user).await;
                    DispatchOutcome::UserStored
                }
                None => DispatchOutcome::Incomplete("user"),
            },
            WebMessage::LoginSuccess { token, user } => match (non_empty(token), user) {
                (Some(token), Some(user)) => {
                    self.inject(&scripts::store_login(&token, &user)).await;
                    self.store.login(token, user).await;
                    let push_registration = self.spawn_push_registration().await;
                    DispatchOutcome::LoggedIn { push_registration }
                }
                (None, _) => DispatchOutcome::Incomplete("token"),
                (_, None) => DispatchOutcome::Incomplete("user"),
            },
            WebMessage::GetToken {} => {
                let script = match self.store.token().await {
                    Some(token) => scripts::store_token(&token),
                    None => scripts::remove_token(),
                };
                self.inject(&script).await;
                DispatchOutcome::TokenPushed
            }
            WebMessage::GetUser {} => {
                let script = match self.store.user().await {
                    Some(user) => scripts::store_user(&user),
                    None => scripts::store_empty_user(),
                };
                self.inject(&script).await;
                DispatchOutcome::UserPushed
            }
            WebMessage::ClearAuth {} => {
                self.store.logout().await;
                self.inject(&scripts::clear_auth()).await;
                DispatchOutcome::AuthCleared
            }
        }
    }

    async fn handle_legacy(&self, command: LegacyCommand) -> DispatchOutcome {
        match command {
            LegacyCommand::Logout => {
                self.store.logout().await;
                DispatchOutcome::LoggedOut
            }
            LegacyCommand::Vibrate => match self.device.vibrate().await {
                Ok(()) => DispatchOutcome::Vibrated,
                Err(e) => {
                    warn!(error = %e, "Vibration failed");
                    DispatchOutcome::DeviceError
                }
            },
            LegacyCommand::OpenCamera => {
                self.launch_media(
                    Permission::Camera,
                    MediaSource::Camera,
                    "Camera access is required.",
                )
                .await
            }
            LegacyCommand::OpenGallery => {
                self.launch_media(
                    Permission::MediaLibrary,
                    MediaSource::Library,
                    "Photo library access is required.",
                )
                .await
            }
        }
    }

    async fn launch_media(
        &self,
        permission: Permission,
        source: MediaSource,
        denial_message: &str,
    ) -> DispatchOutcome {
        let status = match self.device.request_permission(permission).await {
            Ok(status) => status,
            Err(e) => {
                error!(?permission, error = %e, "Permission request failed");
                return DispatchOutcome::DeviceError;
            }
        };

        if !status.is_granted() {
            info!(?permission, ?status, "Permission not granted");
            if let Err(e) = self.device.alert("Permission required", denial_message).await {
                warn!(error = %e, "Failed to show permission alert");
            }
            return DispatchOutcome::PermissionDenied(permission);
        }

        match self.device.launch_picker(source).await {
            Ok(asset) => {
                if let Some(asset) = &asset {
                    info!(?source, uri = %asset.uri, "Image selected");
                }
                DispatchOutcome::MediaLaunched { source, asset }
            }
            Err(e) => {
                error!(?source, error = %e, "Failed to launch picker");
                DispatchOutcome::DeviceError
            }
        }
    }

    /// Detached: the caller never waits for the registration result.
    async fn spawn_push_registration(&self) -> bool {
        if !self.options.register_push_token {
            return false;
        }
        let Some(push_token) = self.notifications.device_push_token().await else {
            debug!("No device push token; skipping registration");
            return false;
        };

        let store = self.store.clone();
        tokio::spawn(async move {
            if !store.update_native_token(&push_token).await {
                warn!("Push token registration did not succeed");
            }
        });
        true
    }

    /// Pushes the current token and user into the page's storage.
    pub async fn resync(&self) {
        let session = self.store.snapshot().await;
        if let Some(token) = &session.token {
            self.inject(&scripts::store_token(token)).await;
        }
        match &session.user {
            Some(user) => self.inject(&scripts::store_user(user)).await,
            None => debug!("No user to resync"),
        }
    }

    /// Resync after the page finished loading, once the configured delay has passed.
    pub async fn on_load_end(&self) {
        tokio::time::sleep(self.options.resync_delay).await;
        self.resync().await;
    }

    /// [`on_load_end`](Self::on_load_end) on its own task, abandoned when `cancel` fires.
    pub fn spawn_load_end(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Load-end resync cancelled"),
                _ = this.on_load_end() => {}
            }
        })
    }

    async fn inject(&self, script: &str) {
        if let Err(e) = self.surface.inject_javascript(script).await {
            warn!(error = %e, "Script injection failed");
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PermissionStatus;
    use crate::testing::{
        DeviceCall, FakeDevice, FakeNotifications, MemoryStorage, RecordingInjector,
        RecordingRegistrar,
    };

    struct Harness {
        dispatcher: Arc<BridgeDispatcher>,
        store: Arc<SessionStore>,
        surface: Arc<RecordingInjector>,
        device: Arc<FakeDevice>,
        registrar: Arc<RecordingRegistrar>,
    }

    fn harness_with(device: FakeDevice, notifications: FakeNotifications) -> Harness {
        let registrar = Arc::new(RecordingRegistrar::default());
        let store = Arc::new(SessionStore::new(
            Default::default(),
            Arc::new(MemoryStorage::default()),
            registrar.clone(),
        ));
        let surface = Arc::new(RecordingInjector::default());
        let device = Arc::new(device);
        let dispatcher = Arc::new(BridgeDispatcher::new(
            store.clone(),
            surface.clone(),
            device.clone(),
            Arc::new(notifications),
            BridgeOptions {
                resync_delay: Duration::from_millis(10),
                register_push_token: true,
            },
        ));
        Harness {
            dispatcher,
            store,
            surface,
            device,
            registrar,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeDevice::granting(), FakeNotifications::default())
    }

    const LOGIN: &str =
        r#"{"type":"LOGIN_SUCCESS","token":"x","user":{"id":"1","email":"a@b.c","name":"A"}}"#;

    #[test]
    fn classify_tiers() {
        assert!(matches!(classify(LOGIN), Inbound::Structured(WebMessage::LoginSuccess { .. })));
        assert_eq!(classify("vibrate"), Inbound::Legacy(LegacyCommand::Vibrate));
        assert_eq!(classify("garbage"), Inbound::Ignored);
        assert_eq!(
            classify(r#"{"type":"PING"}"#),
            Inbound::Unrecognized(Some("PING".into()))
        );
        assert_eq!(classify("42"), Inbound::Unrecognized(None));
        assert_eq!(classify("null"), Inbound::Ignored);
    }

    #[test]
    fn known_type_with_bad_fields_is_malformed() {
        let login = r#"{"type":"LOGIN_SUCCESS","token":"x","user":{"email":"a@b.c","name":"A"}}"#;
        assert!(matches!(
            classify(login),
            Inbound::Malformed { kind, .. } if kind == "LOGIN_SUCCESS"
        ));
        assert!(matches!(
            classify(r#"{"type":"SET_TOKEN","token":42}"#),
            Inbound::Malformed { kind, .. } if kind == "SET_TOKEN"
        ));
        // lowercase is not a known type
        assert_eq!(
            classify(r#"{"type":"set_token","token":42}"#),
            Inbound::Unrecognized(Some("set_token".into()))
        );
    }

    #[test]
    fn legacy_matching_is_exact() {
        assert_eq!(classify("Vibrate"), Inbound::Ignored);
        assert_eq!(classify(" logout"), Inbound::Ignored);
        // a JSON string is JSON, not a legacy command
        assert_eq!(classify(r#""logout""#), Inbound::Unrecognized(None));
    }

    #[tokio::test]
    async fn login_success_sets_session() {
        let h = harness();
        let outcome = h.dispatcher.handle(LOGIN).await;
        assert_eq!(outcome, DispatchOutcome::LoggedIn { push_registration: false });

        let session = h.store.snapshot().await;
        assert_eq!(session.token.as_deref(), Some("x"));
        assert_eq!(session.user, Some(User::new("1", "a@b.c", "A")));
        assert!(session.is_logged_in);

        let scripts = h.surface.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains(r#"localStorage.setItem("auth_token", "x");"#));
        assert!(scripts[0].contains(r#""auth_user""#));
    }

    #[tokio::test]
    async fn login_without_token_changes_nothing() {
        let h = harness();
        let outcome = h
            .dispatcher
            .handle(r#"{"type":"LOGIN_SUCCESS","user":{"id":"1","email":"a@b.c","name":"A"}}"#)
            .await;
        assert_eq!(outcome, DispatchOutcome::Incomplete("token"));
        assert!(h.store.snapshot().await.is_empty());
        assert!(h.surface.scripts().is_empty());
    }

    #[tokio::test]
    async fn login_without_user_changes_nothing() {
        let h = harness();
        let outcome = h.dispatcher.handle(r#"{"type":"LOGIN_SUCCESS","token":"x"}"#).await;
        assert_eq!(outcome, DispatchOutcome::Incomplete("user"));
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn login_registers_push_token_in_background() {
        let h = harness_with(
            FakeDevice::granting(),
            FakeNotifications::with_token("ExponentPushToken[abc]"),
        );
        let outcome = h.dispatcher.handle(LOGIN).await;
        assert_eq!(outcome, DispatchOutcome::LoggedIn { push_registration: true });

        for _ in 0..10 {
            if !h.registrar.calls().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let calls = h.registrar.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "x");
        assert_eq!(calls[0].1.native_token, "ExponentPushToken[abc]");
    }

    #[tokio::test]
    async fn set_token_and_set_user() {
        let h = harness();
        assert_eq!(
            h.dispatcher.handle(r#"{"type":"SET_TOKEN","token":"t"}"#).await,
            DispatchOutcome::TokenStored
        );
        assert!(h.store.is_logged_in().await);

        assert_eq!(
            h.dispatcher
                .handle(r#"{"type":"SET_USER","user":{"id":2,"email":"e","name":"n"}}"#)
                .await,
            DispatchOutcome::UserStored
        );
        assert_eq!(h.store.user().await, Some(User::new("2", "e", "n")));
        assert_eq!(h.surface.scripts().len(), 2);
    }

    #[tokio::test]
    async fn empty_token_is_ignored() {
        let h = harness();
        assert_eq!(
            h.dispatcher.handle(r#"{"type":"SET_TOKEN","token":""}"#).await,
            DispatchOutcome::Incomplete("token")
        );
        assert!(!h.store.is_logged_in().await);
    }

    #[tokio::test]
    async fn get_user_without_user_writes_empty_object() {
        let h = harness();
        assert_eq!(
            h.dispatcher.handle(r#"{"type":"GET_USER"}"#).await,
            DispatchOutcome::UserPushed
        );
        let scripts = h.surface.scripts();
        assert!(scripts[0].contains(r#"localStorage.setItem("auth_user", "{}");"#));
    }

    #[tokio::test]
    async fn get_token_writes_current_token() {
        let h = harness();
        h.store.set_token("abc".into()).await;
        h.dispatcher.handle(r#"{"type":"GET_TOKEN"}"#).await;
        assert!(h.surface.scripts()[0].contains(r#"localStorage.setItem("auth_token", "abc");"#));
    }

    #[tokio::test]
    async fn get_token_without_token_removes_key() {
        let h = harness();
        h.dispatcher.handle(r#"{"type":"GET_TOKEN"}"#).await;
        assert!(h.surface.scripts()[0].contains(r#"localStorage.removeItem("auth_token");"#));
    }

    #[tokio::test]
    async fn clear_auth_logs_out_and_clears_storage() {
        let h = harness();
        h.dispatcher.handle(LOGIN).await;
        assert_eq!(
            h.dispatcher.handle(r#"{"type":"CLEAR_AUTH"}"#).await,
            DispatchOutcome::AuthCleared
        );
        assert!(h.store.snapshot().await.is_empty());
        let last = h.surface.scripts().pop().unwrap();
        assert!(last.contains(r#"localStorage.removeItem("auth_token");"#));
        assert!(last.contains(r#"localStorage.removeItem("auth_user");"#));
    }

    #[tokio::test]
    async fn unknown_type_is_logged_only() {
        let h = harness();
        h.dispatcher.handle(LOGIN).await;
        let before = h.store.snapshot().await;
        let outcome = h.dispatcher.handle(r#"{"type":"REFRESH","token":"y"}"#).await;
        assert_eq!(outcome, DispatchOutcome::Unrecognized(Some("REFRESH".into())));
        assert_eq!(h.store.snapshot().await, before);
    }

    #[tokio::test]
    async fn malformed_login_is_reported_without_mutation() {
        let h = harness();
        h.dispatcher.handle(LOGIN).await;
        let before = h.store.snapshot().await;
        let scripts_before = h.surface.scripts().len();

        let outcome = h
            .dispatcher
            .handle(r#"{"type":"LOGIN_SUCCESS","token":"y","user":{"name":"B"}}"#)
            .await;
        assert_eq!(outcome, DispatchOutcome::Malformed("LOGIN_SUCCESS".into()));
        assert!(!outcome.affects_session());

        let outcome = h.dispatcher.handle(r#"{"type":"SET_TOKEN","token":7}"#).await;
        assert_eq!(outcome, DispatchOutcome::Malformed("SET_TOKEN".into()));

        assert_eq!(h.store.snapshot().await, before);
        assert_eq!(h.surface.scripts().len(), scripts_before);
    }

    #[tokio::test]
    async fn vibrate_has_no_session_effect() {
        let h = harness();
        assert_eq!(h.dispatcher.handle("vibrate").await, DispatchOutcome::Vibrated);
        assert_eq!(h.device.calls(), vec![DeviceCall::Vibrate]);
        assert!(h.store.snapshot().await.is_empty());
        assert!(h.surface.scripts().is_empty());
    }

    #[tokio::test]
    async fn garbage_does_nothing() {
        let h = harness();
        h.dispatcher.handle(LOGIN).await;
        let before = h.store.snapshot().await;
        let scripts_before = h.surface.scripts().len();

        assert_eq!(h.dispatcher.handle("garbage").await, DispatchOutcome::Ignored);
        assert_eq!(h.store.snapshot().await, before);
        assert!(h.device.calls().is_empty());
        assert_eq!(h.surface.scripts().len(), scripts_before);
    }

    #[tokio::test]
    async fn legacy_logout_clears_session() {
        let h = harness();
        h.dispatcher.handle(LOGIN).await;
        assert_eq!(h.dispatcher.handle("logout").await, DispatchOutcome::LoggedOut);
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn camera_launches_when_granted() {
        let h = harness();
        let outcome = h.dispatcher.handle("openCamera").await;
        assert!(matches!(
            outcome,
            DispatchOutcome::MediaLaunched {
                source: MediaSource::Camera,
                asset: Some(_)
            }
        ));
        assert_eq!(
            h.device.calls(),
            vec![
                DeviceCall::Permission(Permission::Camera),
                DeviceCall::Picker(MediaSource::Camera)
            ]
        );
    }

    #[tokio::test]
    async fn gallery_denial_alerts_and_aborts() {
        let h = harness_with(
            FakeDevice::with(PermissionStatus::Granted, PermissionStatus::Denied),
            FakeNotifications::default(),
        );
        let outcome = h.dispatcher.handle("openGallery").await;
        assert_eq!(outcome, DispatchOutcome::PermissionDenied(Permission::MediaLibrary));
        assert_eq!(
            h.device.calls(),
            vec![
                DeviceCall::Permission(Permission::MediaLibrary),
                DeviceCall::Alert(
                    "Permission required".into(),
                    "Photo library access is required.".into()
                )
            ]
        );
    }

    #[tokio::test]
    async fn load_end_resyncs_after_delay() {
        let h = harness();
        h.store.login("x".into(), User::new("1", "a@b.c", "A")).await;

        h.dispatcher.on_load_end().await;
        let scripts = h.surface.scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains(r#""auth_token", "x""#));
        assert!(scripts[1].contains(r#""auth_user""#));
    }

    #[tokio::test]
    async fn cancelled_load_end_injects_nothing() {
        let h = harness();
        h.store.login("x".into(), User::new("1", "a@b.c", "A")).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        h.dispatcher.spawn_load_end(cancel).await.unwrap();
        assert!(h.surface.scripts().is_empty());
    }

    #[test]
    fn session_affecting_outcomes() {
        assert!(DispatchOutcome::AuthCleared.affects_session());
        assert!(DispatchOutcome::LoggedIn { push_registration: false }.affects_session());
        assert!(!DispatchOutcome::UserPushed.affects_session());
        assert!(!DispatchOutcome::Vibrated.affects_session());
    }
}
