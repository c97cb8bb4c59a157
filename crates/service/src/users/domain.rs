use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::domain::Role;

/// Account view for administrators. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// Create (no `id`) or update (`id` set) payload. On update an absent or
/// empty password leaves the stored hash untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveUserInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
