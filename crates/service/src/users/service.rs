use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::domain::{SaveUserInput, UserAccount};
use super::repository::UserRepository;
use crate::auth::domain::{AuthContext, Role};
use crate::errors::ServiceError;
use crate::password;

/// Admin-only account management. Role gating happens in the server
/// middleware; the acting context is still needed for the self-lockout
/// checks.
pub struct UserAdminService<R: UserRepository> {
    repo: Arc<R>,
    min_password_len: usize,
}

impl<R: UserRepository> UserAdminService<R> {
    pub fn new(repo: Arc<R>, min_password_len: usize) -> Self {
        Self { repo, min_password_len }
    }

    pub async fn list(&self) -> Result<Vec<UserAccount>, ServiceError> {
        self.repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<UserAccount, ServiceError> {
        self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("user"))
    }

    /// Create (no id) or update (id set).
    #[instrument(skip(self, _actor, input), fields(target = ?input.id))]
    pub async fn save(
        &self,
        _actor: &AuthContext,
        input: SaveUserInput,
    ) -> Result<UserAccount, ServiceError> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();

        let mut fields = HashMap::new();
        if name.chars().count() < 2 {
            fields.insert("name".into(), "name must be at least 2 characters".into());
        }
        if models::user::validate_email(&email).is_err() {
            fields.insert("email".into(), "invalid email address".into());
        }
        let role = match &input.role {
            None => Some(Role::User),
            Some(raw) => {
                let parsed = Role::parse(raw);
                if parsed.is_none() {
                    fields.insert("role".into(), "invalid role".into());
                }
                parsed
            }
        };

        // Empty password on update means "keep the current one".
        let password = input.password.as_deref().filter(|p| !p.is_empty());
        let creating = input.id.is_none();
        if creating && password.is_none() {
            fields.insert("password".into(), "password required".into());
        }
        if let Some(p) = password {
            if p.chars().count() < self.min_password_len {
                fields.insert(
                    "password".into(),
                    format!("password must be at least {} characters", self.min_password_len),
                );
            }
        }
        if !fields.is_empty() {
            return Err(ServiceError::field_errors("validation failed", fields));
        }
        let role = role.unwrap_or(Role::User);

        if self.repo.email_in_use(&email, input.id).await? {
            return Err(ServiceError::conflict("email already in use"));
        }

        let saved = match input.id {
            None => {
                let hash = match password {
                    Some(p) => password::hash(p)?,
                    None => return Err(ServiceError::validation("password required")),
                };
                let account = self.repo.create(&name, &email, &hash, role).await?;
                info!(user_id = %account.id, "user created");
                account
            }
            Some(id) => {
                self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("user"))?;
                let hash = password.map(password::hash).transpose()?;
                let account = self.repo.update(id, &name, &email, role, hash).await?;
                info!(user_id = %account.id, "user updated");
                account
            }
        };
        Ok(saved)
    }

    /// Activation toggle; admins cannot lock themselves out.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, target = %id))]
    pub async fn set_active(
        &self,
        actor: &AuthContext,
        id: Uuid,
        is_active: bool,
    ) -> Result<(), ServiceError> {
        if id == actor.user_id {
            return Err(ServiceError::forbidden("cannot change your own active status"));
        }
        self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("user"))?;
        self.repo.set_active(id, is_active).await?;
        info!(is_active, "user activation changed");
        Ok(())
    }

    /// Soft delete plus deactivation; self-deletion is refused.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, target = %id))]
    pub async fn delete(&self, actor: &AuthContext, id: Uuid) -> Result<(), ServiceError> {
        if id == actor.user_id {
            return Err(ServiceError::forbidden("cannot delete your own account"));
        }
        self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("user"))?;
        self.repo.soft_delete(id).await?;
        info!("user deleted");
        Ok(())
    }
}
