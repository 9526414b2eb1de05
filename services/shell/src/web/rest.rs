//! services/shell/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST control API and the master
//! definition for the OpenAPI specification.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use webshell_core::domain::{AppLifecycle, LocalNotification, Surface, User};
use webshell_core::notify::Notifier;
use webshell_core::ports::PortError;
use webshell_core::{scripts, token};

use crate::web::{protocol::HostFrame, state::AppState};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        session_handler,
        surface_handler,
        lifecycle_handler,
        logout_handler,
        local_notification_handler,
        push_notification_handler,
    ),
    components(
        schemas(
            HealthResponse,
            SessionView,
            UserView,
            SurfaceView,
            TabView,
            LifecycleState,
            LifecycleRequest,
            LifecycleResponse,
            LocalNotificationRequest,
            ScheduledResponse,
            PushRequest,
            PushResponse,
        )
    ),
    tags(
        (name = "Web Shell Host API", description = "Control endpoints for the session and surfaces of the web shell host.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserView {
    id: String,
    email: String,
    name: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// The session as seen from outside; the token itself is never returned.
#[derive(Serialize, ToSchema)]
pub struct SessionView {
    is_logged_in: bool,
    has_token: bool,
    token_expired: Option<bool>,
    /// `userId` claim of the token, when it carries one.
    token_user_id: Option<String>,
    user: Option<UserView>,
}

#[derive(Serialize, ToSchema)]
pub struct TabView {
    name: String,
    title: String,
    url: String,
}

#[derive(Serialize, ToSchema)]
pub struct SurfaceView {
    /// `locked`, `authentication` or `main`.
    kind: String,
    url: Option<String>,
    tabs: Vec<TabView>,
}

impl From<Surface> for SurfaceView {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::Locked => Self {
                kind: "locked".to_string(),
                url: None,
                tabs: Vec::new(),
            },
            Surface::Authentication { url } => Self {
                kind: "authentication".to_string(),
                url: Some(url),
                tabs: Vec::new(),
            },
            Surface::Main { tabs } => Self {
                kind: "main".to_string(),
                url: None,
                tabs: tabs
                    .into_iter()
                    .map(|t| TabView {
                        name: t.name,
                        title: t.title,
                        url: t.url,
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Deserialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Active,
    Inactive,
    Background,
}

impl From<LifecycleState> for AppLifecycle {
    fn from(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Active => AppLifecycle::Active,
            LifecycleState::Inactive => AppLifecycle::Inactive,
            LifecycleState::Background => AppLifecycle::Background,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LifecycleRequest {
    state: LifecycleState,
}

#[derive(Serialize, ToSchema)]
pub struct LifecycleResponse {
    /// Whether the session was revalidated.
    revalidated: bool,
    surface: SurfaceView,
}

/// Every field is optional; an empty object schedules the sample notification.
#[derive(Deserialize, ToSchema, Default)]
pub struct LocalNotificationRequest {
    title: Option<String>,
    body: Option<String>,
    delay_secs: Option<u64>,
    #[schema(value_type = Object)]
    data: Option<serde_json::Value>,
}

#[derive(Serialize, ToSchema)]
pub struct ScheduledResponse {
    title: String,
    delay_secs: u64,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct PushRequest {
    title: Option<String>,
    body: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PushResponse {
    to: String,
    title: String,
    body: String,
}

async fn session_view(app_state: &AppState) -> SessionView {
    let session = app_state.store.snapshot().await;
    SessionView {
        is_logged_in: session.is_logged_in,
        has_token: session.token.is_some(),
        token_expired: session.token.as_deref().map(token::is_expired),
        token_user_id: session
            .token
            .as_deref()
            .and_then(token::identity_from_token)
            .and_then(|identity| identity.user_id),
        user: session.user.map(UserView::from),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The host is running", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Current session state.
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn session_handler(State(app_state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(session_view(&app_state).await)
}

/// The surface the shim should currently render.
#[utoipa::path(
    get,
    path = "/surface",
    responses((status = 200, description = "Current surface", body = SurfaceView))
)]
pub async fn surface_handler(State(app_state): State<Arc<AppState>>) -> Json<SurfaceView> {
    Json(app_state.bootstrap.surface().await.into())
}

/// Forwards an OS lifecycle transition. `active` revalidates the session.
#[utoipa::path(
    post,
    path = "/lifecycle",
    request_body = LifecycleRequest,
    responses((status = 200, description = "Transition applied", body = LifecycleResponse))
)]
pub async fn lifecycle_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<LifecycleRequest>,
) -> Json<LifecycleResponse> {
    let response = match app_state.bootstrap.on_lifecycle(request.state.into()).await {
        Some(surface) => {
            app_state.broadcast(HostFrame::Surface {
                surface: surface.clone(),
            });
            LifecycleResponse {
                revalidated: true,
                surface: surface.into(),
            }
        }
        None => LifecycleResponse {
            revalidated: false,
            surface: app_state.bootstrap.surface().await.into(),
        },
    };
    Json(response)
}

/// Logs out from the native side and clears every connected page's storage.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses((status = 200, description = "Session cleared", body = SessionView))
)]
pub async fn logout_handler(State(app_state): State<Arc<AppState>>) -> Json<SessionView> {
    app_state.store.logout().await;
    app_state.broadcast(HostFrame::InjectJavascript {
        script: scripts::clear_auth(),
    });
    app_state.publish_surface().await;
    info!("Session cleared through the control API");
    Json(session_view(&app_state).await)
}

/// Schedules a local notification, delivered to connected surfaces when due.
#[utoipa::path(
    post,
    path = "/notifications/local",
    request_body = LocalNotificationRequest,
    responses(
        (status = 202, description = "Notification scheduled", body = ScheduledResponse),
        (status = 500, description = "Scheduling failed")
    )
)]
pub async fn local_notification_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<LocalNotificationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sample = LocalNotification::sample();
    let notification = LocalNotification {
        title: request.title.unwrap_or(sample.title),
        body: request.body.unwrap_or(sample.body),
        data: request.data.unwrap_or(sample.data),
        delay: request.delay_secs.map(Duration::from_secs).unwrap_or(sample.delay),
    };
    let response = ScheduledResponse {
        title: notification.title.clone(),
        delay_secs: notification.delay.as_secs(),
    };

    Notifier::new(app_state.notifications.clone())
        .schedule(notification)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to schedule local notification");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Sends a push message to this device's push token.
#[utoipa::path(
    post,
    path = "/notifications/push",
    request_body = PushRequest,
    responses(
        (status = 200, description = "Push accepted by the push service", body = PushResponse),
        (status = 404, description = "No device push token is configured"),
        (status = 502, description = "The push service rejected the message")
    )
)]
pub async fn push_notification_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<PushRequest>,
) -> Result<Json<PushResponse>, (StatusCode, String)> {
    let title = request.title.unwrap_or_else(|| "Push test".to_string());
    let body = request
        .body
        .unwrap_or_else(|| "Sent straight from the app.".to_string());

    let message = Notifier::new(app_state.notifications.clone())
        .push_to_self(&title, &body)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            other => {
                error!(error = %other, "Push delivery failed");
                (StatusCode::BAD_GATEWAY, other.to_string())
            }
        })?;

    Ok(Json(PushResponse {
        to: message.to,
        title: message.title,
        body: message.body,
    }))
}
