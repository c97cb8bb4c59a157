use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use service::auth::domain::AuthContext;
use service::users::domain::SaveUserInput;

use super::parse_body;
use crate::errors::ApiError;
use crate::routes::auth::ServerState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    #[default]
    Save,
    Status,
    Delete,
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    #[serde(default)]
    pub action: UserAction,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    id: Uuid,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct IdBody {
    id: Uuid,
}

/// GET /users: all live accounts, or one when `id` is given. Admin only.
#[utoipa::path(get, path = "/users", tag = "users",
    params(("id" = Option<Uuid>, Query, description = "fetch a single user")),
    responses(
        (status = 200, description = "OK"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ))]
pub async fn index(
    State(state): State<ServerState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match params.id {
        Some(id) => {
            let user = state.users.get(id).await?;
            Ok(Json(json!({"success": true, "user": user})))
        }
        None => {
            let users = state.users.list().await?;
            Ok(Json(json!({"success": true, "users": users})))
        }
    }
}

/// POST /users?action=save|status|delete (default save). Admin only.
#[utoipa::path(post, path = "/users", tag = "users",
    params(("action" = Option<String>, Query, description = "save | status | delete")),
    responses(
        (status = 200, description = "OK"),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Conflict")
    ))]
pub async fn dispatch(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<UserParams>,
    body: Option<Json<serde_json::Value>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match params.action {
        UserAction::Save => {
            let input: SaveUserInput = parse_body(body)?;
            let user = state.users.save(&ctx, input).await?;
            Ok(Json(json!({"success": true, "user": user})))
        }
        UserAction::Status => {
            let req: StatusBody = parse_body(body)?;
            state.users.set_active(&ctx, req.id, req.is_active).await?;
            Ok(Json(json!({"success": true})))
        }
        UserAction::Delete => {
            let req: IdBody = parse_body(body)?;
            state.users.delete(&ctx, req.id).await?;
            Ok(Json(json!({"success": true})))
        }
    }
}
