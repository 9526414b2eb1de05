pub mod protocol;
pub mod rest;
pub mod state;
pub mod surface;
pub mod ws_handler;

use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use rest::ApiDoc;
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Builds the full router: `/bridge`, the control API and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);
    match HeaderValue::from_str(&app_state.config.web_base_url) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => warn!(error = %e, "Web base URL is not a valid origin; CORS left closed"),
    }

    let api_router = Router::new()
        .route("/bridge", get(ws_handler))
        .route("/health", get(rest::health_handler))
        .route("/session", get(rest::session_handler))
        .route("/session/logout", post(rest::logout_handler))
        .route("/surface", get(rest::surface_handler))
        .route("/lifecycle", post(rest::lifecycle_handler))
        .route("/notifications/local", post(rest::local_notification_handler))
        .route("/notifications/push", post(rest::push_notification_handler))
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
