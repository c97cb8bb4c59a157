use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Fixed role hierarchy; compared by rank for minimum-role gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::User => 1,
            Self::Staff => 2,
            Self::Admin => 3,
        }
    }
}

/// Request-scoped authorization context, resolved once per request from the
/// session token. Replaces any ambient session state.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn require_role(&self, min: Role) -> Result<(), ServiceError> {
        if self.role.rank() < min.rank() {
            return Err(ServiceError::forbidden(format!(
                "permission denied. requires {} access",
                min.as_str()
            )));
        }
        Ok(())
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login input
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Authenticated user (business view, no password hash)
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Account row as the auth store sees it, hash included.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub password_hash: String,
}

/// Session row (token plus the role cached on first resolution).
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: Uuid,
    pub user_id: Uuid,
    pub cached_role: Option<String>,
}
