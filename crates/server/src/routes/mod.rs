use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::errors::ServiceError;

use crate::errors::ApiError;
use crate::openapi::ApiDoc;

pub mod auth;
pub mod tickets;
pub mod users;

use auth::ServerState;

/// Liveness plus a database ping.
#[utoipa::path(get, path = "/health", tag = "health",
    responses((status = 200, description = "OK"), (status = 500, description = "DB unreachable")))]
pub async fn health(State(state): State<ServerState>) -> Result<Json<Health>, ApiError> {
    state
        .db
        .ping()
        .await
        .map_err(|e| ApiError(ServiceError::Repository(e.to_string())))?;
    Ok(Json(Health { status: "ok" }))
}

/// Shared JSON body parsing for the action-dispatch handlers.
pub(crate) fn parse_body<T: DeserializeOwned>(
    body: Option<Json<serde_json::Value>>,
) -> Result<T, ApiError> {
    let Json(value) =
        body.ok_or_else(|| ApiError(ServiceError::validation("request body required")))?;
    serde_json::from_value(value)
        .map_err(|e| ApiError(ServiceError::validation(format!("invalid request body: {e}"))))
}

/// Build the full application router: public auth endpoints, session-gated
/// ticket routes and admin-gated user routes.
pub fn build_router(cors: CorsLayer, state: ServerState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth", axum::routing::post(auth::dispatch));

    let session_required = Router::new()
        .route("/auth/session", get(auth::current_session))
        .route(
            "/tickets",
            get(tickets::index)
                .post(tickets::dispatch)
                .delete(tickets::remove)
                .patch(tickets::patch_status),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    let admin = Router::new()
        .route("/users", get(users::index).post(users::dispatch))
        // admin gate runs after the session middleware has resolved the context
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    public
        .merge(session_required)
        .merge(admin)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
