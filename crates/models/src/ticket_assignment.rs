use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::ticket;
use crate::user;

/// One row per delegation; rows with `unassigned_at` set are history, the
/// open row (if any) is the current assignment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket_assignment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub assigned_to: Uuid,
    pub assigned_at: DateTimeWithTimeZone,
    pub unassigned_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Ticket,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Ticket => Entity::belongs_to(ticket::Entity)
                .from(Column::TicketId)
                .to(ticket::Column::Id)
                .into(),
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::AssignedTo)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_open(
    db: &DatabaseConnection,
    ticket_id: Uuid,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::TicketId.eq(ticket_id))
        .filter(Column::UnassignedAt.is_null())
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub fn open_row(ticket_id: Uuid, assigned_to: Uuid) -> ActiveModel {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        ticket_id: Set(ticket_id),
        assigned_to: Set(assigned_to),
        assigned_at: Set(Utc::now().into()),
        unassigned_at: Set(None),
    }
}
