use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::auth::domain::Role;
use crate::errors::ServiceError;
use crate::users::domain::UserAccount;
use crate::users::repository::UserRepository;

pub struct SeaOrmUserRepository {
    pub db: DatabaseConnection,
}

fn db_err(e: sea_orm::DbErr) -> ServiceError {
    ServiceError::Repository(e.to_string())
}

fn to_account(u: models::user::Model) -> Result<UserAccount, ServiceError> {
    let role = Role::parse(&u.role)
        .ok_or_else(|| ServiceError::Repository(format!("unknown role {:?}", u.role)))?;
    Ok(UserAccount {
        id: u.id,
        name: u.name,
        email: u.email,
        role,
        is_active: u.is_active,
        created_at: u.created_at,
        updated_at: u.updated_at,
    })
}

#[async_trait::async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn list(&self) -> Result<Vec<UserAccount>, ServiceError> {
        let rows = models::user::Entity::find()
            .filter(models::user::Column::DeletedAt.is_null())
            .order_by_desc(models::user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(to_account).collect()
    }

    async fn find(&self, id: Uuid) -> Result<Option<UserAccount>, ServiceError> {
        let found = models::user::Entity::find_by_id(id)
            .filter(models::user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        found.map(to_account).transpose()
    }

    async fn email_in_use(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
        let mut query = models::user::Entity::find()
            .filter(models::user::Column::Email.eq(email.trim().to_lowercase()))
            .filter(models::user::Column::DeletedAt.is_null());
        if let Some(id) = exclude {
            query = query.filter(models::user::Column::Id.ne(id));
        }
        let count = query.count(&self.db).await.map_err(db_err)?;
        Ok(count > 0)
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserAccount, ServiceError> {
        let created =
            models::user::create(&self.db, name, email, password_hash, role.as_str()).await?;
        to_account(created)
    }

    async fn update(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        role: Role,
        password_hash: Option<String>,
    ) -> Result<UserAccount, ServiceError> {
        let found = models::user::Entity::find_by_id(id)
            .filter(models::user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let mut am: models::user::ActiveModel = found.into();
        am.name = Set(name.to_string());
        am.email = Set(email.trim().to_lowercase());
        am.role = Set(role.as_str().to_string());
        if let Some(hash) = password_hash {
            am.password_hash = Set(hash);
        }
        am.updated_at = Set(Utc::now().into());
        let saved = am.update(&self.db).await.map_err(db_err)?;
        to_account(saved)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), ServiceError> {
        let found = models::user::Entity::find_by_id(id)
            .filter(models::user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let mut am: models::user::ActiveModel = found.into();
        am.is_active = Set(is_active);
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError> {
        models::user::soft_delete(&self.db, id).await?;
        Ok(())
    }
}
