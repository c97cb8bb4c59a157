use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema)]
pub struct SaveTicketRequest {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub file_path: Option<String>,
}

#[derive(ToSchema)]
pub struct TicketStatusRequest {
    pub id: Uuid,
    pub status: String,
}

#[derive(ToSchema)]
pub struct AssignTicketRequest {
    pub id: Uuid,
    pub assigned_to: Uuid,
}

#[derive(ToSchema)]
pub struct SaveUserRequest {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(ToSchema)]
pub struct UserStatusRequest {
    pub id: Uuid,
    pub is_active: bool,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::dispatch,
        crate::routes::auth::current_session,
        crate::routes::tickets::index,
        crate::routes::tickets::dispatch,
        crate::routes::tickets::remove,
        crate::routes::tickets::patch_status,
        crate::routes::users::index,
        crate::routes::users::dispatch,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            SaveTicketRequest,
            TicketStatusRequest,
            AssignTicketRequest,
            SaveUserRequest,
            UserStatusRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "tickets"),
        (name = "users")
    )
)]
pub struct ApiDoc;
