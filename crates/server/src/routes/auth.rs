use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use service::auth::domain::{AuthContext, LoginInput, RegisterInput, Role};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::{AuthService, AuthSettings};
use service::errors::ServiceError;
use service::tickets::repo::seaorm::SeaOrmTicketRepository;
use service::tickets::service::TicketService;
use service::users::repo::seaorm::SeaOrmUserRepository;
use service::users::service::UserAdminService;

use super::parse_body;
use crate::errors::ApiError;

pub const SESSION_COOKIE: &str = "session_token";

pub type AuthSvc = AuthService<SeaOrmAuthRepository>;
pub type TicketSvc = TicketService<SeaOrmTicketRepository>;
pub type UserSvc = UserAdminService<SeaOrmUserRepository>;

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthSvc>,
    pub tickets: Arc<TicketSvc>,
    pub users: Arc<UserSvc>,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, auth_cfg: &configs::AuthConfig) -> Self {
        let settings = AuthSettings {
            session_ttl_hours: auth_cfg.session_ttl_hours,
            min_password_len: auth_cfg.min_password_len,
        };
        let auth_repo = Arc::new(SeaOrmAuthRepository { db: db.clone() });
        let ticket_repo = Arc::new(SeaOrmTicketRepository { db: db.clone() });
        let user_repo = Arc::new(SeaOrmUserRepository { db: db.clone() });
        Self {
            auth: Arc::new(AuthService::new(auth_repo, settings)),
            tickets: Arc::new(TicketService::new(ticket_repo)),
            users: Arc::new(UserAdminService::new(user_repo, auth_cfg.min_password_len)),
            db,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Register,
    Login,
    Logout,
}

#[derive(Debug, Deserialize)]
pub struct AuthParams {
    pub action: AuthAction,
}

fn session_token(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE).and_then(|c| Uuid::parse_str(c.value()).ok())
}

fn session_cookie(token: Uuid) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

/// POST /auth?action=register|login|logout
#[utoipa::path(post, path = "/auth", tag = "auth",
    params(("action" = String, Query, description = "register | login | logout")),
    responses(
        (status = 200, description = "OK"),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Conflict")
    ))]
pub async fn dispatch(
    State(state): State<ServerState>,
    Query(params): Query<AuthParams>,
    jar: CookieJar,
    body: Option<Json<serde_json::Value>>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    match params.action {
        AuthAction::Register => {
            let input: RegisterInput = parse_body(body)?;
            let user = state.auth.register(input).await?;
            Ok((jar, Json(json!({"success": true, "user": user}))))
        }
        AuthAction::Login => {
            let input: LoginInput = parse_body(body)?;
            let (token, user) = state.auth.login(input).await?;
            // Replaces any existing session cookie.
            let jar = jar.add(session_cookie(token));
            Ok((jar, Json(json!({"success": true, "user": user}))))
        }
        AuthAction::Logout => {
            if let Some(token) = session_token(&jar) {
                state.auth.logout(token).await?;
            }
            let jar = jar.remove(Cookie::from(SESSION_COOKIE));
            Ok((jar, Json(json!({"success": true}))))
        }
    }
}

/// GET /auth/session
#[utoipa::path(get, path = "/auth/session", tag = "auth",
    responses((status = 200, description = "OK"), (status = 401, description = "Unauthorized")))]
pub async fn current_session(
    Extension(ctx): Extension<AuthContext>,
) -> Json<serde_json::Value> {
    Json(json!({"success": true, "user_id": ctx.user_id, "role": ctx.role}))
}

/// Middleware: resolve the session cookie into a request-scoped
/// [`AuthContext`] or reject with 401.
pub async fn require_session(
    State(state): State<ServerState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&jar)
        .ok_or_else(|| ApiError(ServiceError::unauthenticated("authentication required")))?;
    let ctx = state.auth.resolve_session(token).await?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Middleware: admin gate, runs after [`require_session`].
pub async fn require_admin(
    Extension(ctx): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    ctx.require_role(Role::Admin)?;
    Ok(next.run(req).await)
}
