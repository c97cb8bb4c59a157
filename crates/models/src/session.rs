use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::user;

/// Server-side session row; the row id doubles as the opaque session token.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub cached_role: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(
    db: &DatabaseConnection,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<Model, errors::ModelError> {
    let now = Utc::now();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        cached_role: Set(None),
        created_at: Set(now.into()),
        expires_at: Set((now + Duration::hours(ttl_hours)).into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Returns the session only while it has not expired.
pub async fn find_valid(
    db: &DatabaseConnection,
    token: Uuid,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find_by_id(token)
        .filter(Column::ExpiresAt.gt(Utc::now()))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn cache_role(
    db: &DatabaseConnection,
    token: Uuid,
    role: &str,
) -> Result<(), errors::ModelError> {
    let Some(found) = Entity::find_by_id(token)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?
    else {
        return Ok(());
    };
    let mut am: ActiveModel = found.into();
    am.cached_role = Set(Some(role.to_string()));
    am.update(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}

/// Idempotent: deleting an unknown token is not an error.
pub async fn delete(db: &DatabaseConnection, token: Uuid) -> Result<(), errors::ModelError> {
    Entity::delete_by_id(token)
        .exec(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}
