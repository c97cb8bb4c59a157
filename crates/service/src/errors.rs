use std::collections::HashMap;

use thiserror::Error;

/// Business errors shared by all services. The server crate maps these onto
/// HTTP statuses; `Repository` never reaches clients verbatim.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{message}")]
    Validation {
        message: String,
        fields: Option<HashMap<String, String>>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl ServiceError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), fields: None }
    }

    pub fn field_errors(message: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self::Validation { message: message.into(), fields: Some(fields) }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<models::errors::ModelError> for ServiceError {
    fn from(err: models::errors::ModelError) -> Self {
        match err {
            models::errors::ModelError::Validation(msg) => ServiceError::validation(msg),
            models::errors::ModelError::NotFound(entity) => ServiceError::NotFound(entity),
            models::errors::ModelError::Db(msg) => ServiceError::Repository(msg),
        }
    }
}
