use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::tickets::domain::{Ticket, TicketStatus, TicketSummary};
use crate::tickets::repository::{TicketRepository, MAX_LIST_ROWS, NO_ASSIGNEE};

pub struct SeaOrmTicketRepository {
    pub db: DatabaseConnection,
}

fn db_err(e: sea_orm::DbErr) -> ServiceError {
    ServiceError::Repository(e.to_string())
}

fn to_ticket(m: models::ticket::Model) -> Result<Ticket, ServiceError> {
    let status = TicketStatus::parse(&m.status)
        .ok_or_else(|| ServiceError::Repository(format!("unknown ticket status {:?}", m.status)))?;
    Ok(Ticket {
        id: m.id,
        title: m.title,
        description: m.description,
        status,
        file_path: m.file_path,
        created_by: m.created_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
        completed_at: m.completed_at,
        deleted_at: m.deleted_at,
    })
}

#[derive(FromQueryResult)]
struct SummaryRow {
    id: Uuid,
    title: String,
    status: String,
    created_by: Uuid,
    created_at: DateTime<FixedOffset>,
    updated_at: DateTime<FixedOffset>,
    author_name: String,
}

#[derive(FromQueryResult)]
struct OpenAssigneeRow {
    ticket_id: Uuid,
    name: String,
}

impl SeaOrmTicketRepository {
    /// Open-assignee names for a set of tickets, keyed by ticket id.
    async fn open_assignee_names(
        &self,
        ticket_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        if ticket_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = models::ticket_assignment::Entity::find()
            .filter(models::ticket_assignment::Column::TicketId.is_in(ticket_ids.to_vec()))
            .filter(models::ticket_assignment::Column::UnassignedAt.is_null())
            .join(JoinType::InnerJoin, models::ticket_assignment::Relation::User.def())
            .select_only()
            .column(models::ticket_assignment::Column::TicketId)
            .column_as(models::user::Column::Name, "name")
            .into_model::<OpenAssigneeRow>()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(|r| (r.ticket_id, r.name)).collect())
    }
}

#[async_trait::async_trait]
impl TicketRepository for SeaOrmTicketRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Ticket>, ServiceError> {
        let found = models::ticket::Entity::find_by_id(id)
            .filter(models::ticket::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        found.map(to_ticket).transpose()
    }

    async fn current_assignee(&self, ticket_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
        let open = models::ticket_assignment::find_open(&self.db, ticket_id).await?;
        Ok(open.map(|a| a.assigned_to))
    }

    async fn list_visible(
        &self,
        user_id: Uuid,
        q: Option<&str>,
    ) -> Result<Vec<TicketSummary>, ServiceError> {
        let open_for_user = Query::select()
            .column(models::ticket_assignment::Column::TicketId)
            .from(models::ticket_assignment::Entity)
            .and_where(Expr::col(models::ticket_assignment::Column::AssignedTo).eq(user_id))
            .and_where(Expr::col(models::ticket_assignment::Column::UnassignedAt).is_null())
            .to_owned();

        let mut query = models::ticket::Entity::find()
            .filter(models::ticket::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(models::ticket::Column::CreatedBy.eq(user_id))
                    .add(models::ticket::Column::Id.in_subquery(open_for_user)),
            )
            .join(JoinType::InnerJoin, models::ticket::Relation::Author.def());

        if let Some(q) = q.map(str::trim).filter(|s| !s.is_empty()) {
            let needle = format!("%{}%", q.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            models::ticket::Entity,
                            models::ticket::Column::Title,
                        ))))
                        .like(needle.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            models::ticket::Entity,
                            models::ticket::Column::Description,
                        ))))
                        .like(needle.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            models::user::Entity,
                            models::user::Column::Name,
                        ))))
                        .like(needle),
                    ),
            );
        }

        let rows = query
            .select_only()
            .column(models::ticket::Column::Id)
            .column(models::ticket::Column::Title)
            .column(models::ticket::Column::Status)
            .column(models::ticket::Column::CreatedBy)
            .column(models::ticket::Column::CreatedAt)
            .column(models::ticket::Column::UpdatedAt)
            .column_as(models::user::Column::Name, "author_name")
            .order_by_desc(models::ticket::Column::CreatedAt)
            .limit(MAX_LIST_ROWS)
            .into_model::<SummaryRow>()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let assignees = self.open_assignee_names(&ids).await?;

        rows.into_iter()
            .map(|r| {
                let status = TicketStatus::parse(&r.status).ok_or_else(|| {
                    ServiceError::Repository(format!("unknown ticket status {:?}", r.status))
                })?;
                let assignee_name =
                    assignees.get(&r.id).cloned().unwrap_or_else(|| NO_ASSIGNEE.into());
                Ok(TicketSummary {
                    id: r.id,
                    title: r.title,
                    status,
                    created_by: r.created_by,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    author_name: r.author_name,
                    assignee_name,
                })
            })
            .collect()
    }

    async fn user_name(&self, id: Uuid) -> Result<Option<String>, ServiceError> {
        let found = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(found.map(|u| u.name))
    }

    async fn is_live_user(&self, id: Uuid) -> Result<bool, ServiceError> {
        let found = models::user::Entity::find_by_id(id)
            .filter(models::user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    async fn create(
        &self,
        created_by: Uuid,
        title: &str,
        description: &str,
        file_path: Option<String>,
    ) -> Result<Ticket, ServiceError> {
        let created =
            models::ticket::create(&self.db, title, description, file_path, created_by).await?;
        to_ticket(created)
    }

    async fn update(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        file_path: Option<String>,
    ) -> Result<Ticket, ServiceError> {
        let found = models::ticket::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ServiceError::not_found("ticket"))?;
        let mut am: models::ticket::ActiveModel = found.into();
        am.title = Set(title.trim().to_string());
        am.description = Set(description.trim().to_string());
        am.file_path = Set(file_path);
        am.updated_at = Set(Utc::now().into());
        let saved = am.update(&self.db).await.map_err(db_err)?;
        to_ticket(saved)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError> {
        models::ticket::soft_delete(&self.db, id).await?;
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        completed_at: Option<DateTime<FixedOffset>>,
    ) -> Result<(), ServiceError> {
        let found = models::ticket::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ServiceError::not_found("ticket"))?;
        let mut am: models::ticket::ActiveModel = found.into();
        am.status = Set(status.as_str().to_string());
        am.completed_at = Set(completed_at);
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn assign(&self, ticket_id: Uuid, assigned_to: Uuid) -> Result<(), ServiceError> {
        // Close-then-open in one transaction; the partial unique index on
        // open rows catches any concurrent writer.
        let txn = self.db.begin().await.map_err(db_err)?;
        models::ticket_assignment::Entity::update_many()
            .col_expr(
                models::ticket_assignment::Column::UnassignedAt,
                Expr::value(Utc::now()),
            )
            .filter(models::ticket_assignment::Column::TicketId.eq(ticket_id))
            .filter(models::ticket_assignment::Column::UnassignedAt.is_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;
        models::ticket_assignment::open_row(ticket_id, assigned_to)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn unassign(&self, ticket_id: Uuid) -> Result<(), ServiceError> {
        models::ticket_assignment::Entity::update_many()
            .col_expr(
                models::ticket_assignment::Column::UnassignedAt,
                Expr::value(Utc::now()),
            )
            .filter(models::ticket_assignment::Column::TicketId.eq(ticket_id))
            .filter(models::ticket_assignment::Column::UnassignedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
