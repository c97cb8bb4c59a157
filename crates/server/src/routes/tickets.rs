use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use service::auth::domain::AuthContext;
use service::tickets::domain::SaveTicketInput;

use super::parse_body;
use crate::errors::ApiError;
use crate::routes::auth::ServerState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketAction {
    #[default]
    Save,
    Delete,
    Status,
    Assign,
    Unassign,
}

#[derive(Debug, Deserialize)]
pub struct TicketParams {
    #[serde(default)]
    pub action: TicketAction,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub id: Option<Uuid>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveBody {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(flatten)]
    input: SaveTicketInput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdBody {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    id: Uuid,
    status: String,
}

#[derive(Debug, Deserialize)]
struct AssignBody {
    id: Uuid,
    assigned_to: Uuid,
}

/// GET /tickets: list visible tickets, or fetch one when `id` is given.
#[utoipa::path(get, path = "/tickets", tag = "tickets",
    params(
        ("id" = Option<Uuid>, Query, description = "fetch a single ticket"),
        ("q" = Option<String>, Query, description = "substring filter")
    ),
    responses(
        (status = 200, description = "OK"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found")
    ))]
pub async fn index(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match params.id {
        Some(id) => {
            let ticket = state.tickets.get(&ctx, id).await?;
            Ok(Json(json!({"success": true, "ticket": ticket})))
        }
        None => {
            let tickets = state.tickets.list(&ctx, params.q.as_deref()).await?;
            Ok(Json(json!({"success": true, "tickets": tickets})))
        }
    }
}

/// POST /tickets?action=save|delete|status|assign|unassign (default save)
#[utoipa::path(post, path = "/tickets", tag = "tickets",
    params(("action" = Option<String>, Query, description = "save | delete | status | assign | unassign")),
    responses(
        (status = 200, description = "OK"),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ))]
pub async fn dispatch(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<TicketParams>,
    body: Option<Json<serde_json::Value>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match params.action {
        TicketAction::Save => {
            let save: SaveBody = parse_body(body)?;
            let ticket = match save.id {
                None => state.tickets.create(&ctx, save.input).await?,
                Some(id) => state.tickets.update(&ctx, id, save.input).await?,
            };
            Ok(Json(json!({"success": true, "id": ticket.id})))
        }
        TicketAction::Delete => {
            let req: IdBody = parse_body(body)?;
            state.tickets.delete(&ctx, req.id).await?;
            Ok(Json(json!({"success": true})))
        }
        TicketAction::Status => {
            let req: StatusBody = parse_body(body)?;
            state.tickets.set_status(&ctx, req.id, &req.status).await?;
            Ok(Json(json!({"success": true})))
        }
        TicketAction::Assign => {
            let req: AssignBody = parse_body(body)?;
            state.tickets.assign(&ctx, req.id, req.assigned_to).await?;
            Ok(Json(json!({"success": true})))
        }
        TicketAction::Unassign => {
            let req: IdBody = parse_body(body)?;
            state.tickets.unassign(&ctx, req.id).await?;
            Ok(Json(json!({"success": true})))
        }
    }
}

/// DELETE /tickets: same soft delete as POST action=delete.
#[utoipa::path(delete, path = "/tickets", tag = "tickets",
    params(("id" = Uuid, Query, description = "ticket to delete")),
    responses(
        (status = 200, description = "OK"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ))]
pub async fn remove(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(req): Query<IdBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.tickets.delete(&ctx, req.id).await?;
    Ok(Json(json!({"success": true})))
}

/// PATCH /tickets: status transition, same as POST action=status.
#[utoipa::path(patch, path = "/tickets", tag = "tickets",
    responses(
        (status = 200, description = "OK"),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ))]
pub async fn patch_status(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<StatusBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.tickets.set_status(&ctx, req.id, &req.status).await?;
    Ok(Json(json!({"success": true})))
}
