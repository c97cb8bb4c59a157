use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::auth::domain::{AuthAccount, SessionRecord};
use crate::auth::repository::AuthRepository;
use crate::errors::ServiceError;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn to_account(u: models::user::Model) -> AuthAccount {
    AuthAccount {
        id: u.id,
        name: u.name,
        email: u.email,
        role: u.role,
        is_active: u.is_active,
        password_hash: u.password_hash,
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_live_by_email(&self, email: &str) -> Result<Option<AuthAccount>, ServiceError> {
        let found = models::user::find_live_by_email(&self.db, email).await?;
        Ok(found.map(to_account))
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AuthAccount, ServiceError> {
        let created = models::user::create(&self.db, name, email, password_hash, "user").await?;
        Ok(to_account(created))
    }

    async fn user_role(&self, user_id: Uuid) -> Result<Option<String>, ServiceError> {
        let found = models::user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| ServiceError::Repository(e.to_string()))?;
        Ok(found.map(|u| u.role))
    }

    async fn create_session(&self, user_id: Uuid, ttl_hours: i64) -> Result<Uuid, ServiceError> {
        let created = models::session::create(&self.db, user_id, ttl_hours).await?;
        Ok(created.id)
    }

    async fn find_session(&self, token: Uuid) -> Result<Option<SessionRecord>, ServiceError> {
        let found = models::session::find_valid(&self.db, token).await?;
        Ok(found.map(|s| SessionRecord {
            token: s.id,
            user_id: s.user_id,
            cached_role: s.cached_role,
        }))
    }

    async fn cache_session_role(&self, token: Uuid, role: &str) -> Result<(), ServiceError> {
        models::session::cache_role(&self.db, token, role).await?;
        Ok(())
    }

    async fn delete_session(&self, token: Uuid) -> Result<(), ServiceError> {
        models::session::delete(&self.db, token).await?;
        Ok(())
    }
}
