use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::domain::{Assignee, SaveTicketInput, Ticket, TicketDetail, TicketStatus, TicketSummary};
use super::policy;
use super::repository::{TicketRepository, NO_ASSIGNEE};
use crate::auth::domain::AuthContext;
use crate::errors::ServiceError;

/// Ticket CRUD, status transitions and delegation. Every operation takes the
/// acting [`AuthContext`] and enforces the visibility policy itself.
pub struct TicketService<R: TicketRepository> {
    repo: Arc<R>,
}

impl<R: TicketRepository> TicketService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Author-only gate for mutations. Existence is checked first so a
    /// missing ticket reads the same as a hidden one.
    async fn load_for_author(&self, ctx: &AuthContext, id: Uuid) -> Result<Ticket, ServiceError> {
        let ticket = self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("ticket"))?;
        if !policy::is_author(&ticket, ctx.user_id) {
            return Err(ServiceError::forbidden("only the ticket author may do this"));
        }
        Ok(ticket)
    }

    pub async fn list(
        &self,
        ctx: &AuthContext,
        q: Option<&str>,
    ) -> Result<Vec<TicketSummary>, ServiceError> {
        self.repo.list_visible(ctx.user_id, q).await
    }

    /// Hidden tickets read as missing so existence does not leak.
    pub async fn get(&self, ctx: &AuthContext, id: Uuid) -> Result<TicketDetail, ServiceError> {
        let ticket = self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("ticket"))?;
        let assignee_id = self.repo.current_assignee(ticket.id).await?;
        if !policy::is_visible(&ticket, assignee_id, ctx.user_id) {
            return Err(ServiceError::not_found("ticket"));
        }

        let author_name = self
            .repo
            .user_name(ticket.created_by)
            .await?
            .unwrap_or_else(|| NO_ASSIGNEE.into());
        let assignee = match assignee_id {
            Some(id) => self.repo.user_name(id).await?.map(|name| Assignee { id, name }),
            None => None,
        };

        Ok(TicketDetail {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            file_path: ticket.file_path,
            created_by: ticket.created_by,
            author_name,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            completed_at: ticket.completed_at,
            assignee,
        })
    }

    #[instrument(skip(self, ctx, input), fields(user_id = %ctx.user_id))]
    pub async fn create(
        &self,
        ctx: &AuthContext,
        input: SaveTicketInput,
    ) -> Result<Ticket, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::validation("title required"));
        }
        let description = input.description.unwrap_or_default();
        let ticket = self
            .repo
            .create(ctx.user_id, &input.title, &description, input.file_path)
            .await?;
        info!(ticket_id = %ticket.id, "ticket created");
        Ok(ticket)
    }

    #[instrument(skip(self, ctx, input), fields(user_id = %ctx.user_id, ticket_id = %id))]
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        input: SaveTicketInput,
    ) -> Result<Ticket, ServiceError> {
        let existing = self.load_for_author(ctx, id).await?;
        if input.title.trim().is_empty() {
            return Err(ServiceError::validation("title required"));
        }
        let description = input.description.unwrap_or(existing.description);
        // An omitted attachment reference keeps the stored one.
        let file_path = input.file_path.or(existing.file_path);
        self.repo.update(id, &input.title, &description, file_path).await
    }

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, ticket_id = %id))]
    pub async fn delete(&self, ctx: &AuthContext, id: Uuid) -> Result<(), ServiceError> {
        self.load_for_author(ctx, id).await?;
        self.repo.soft_delete(id).await?;
        info!("ticket deleted");
        Ok(())
    }

    /// Status changes are the assignee's, not the author's.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, ticket_id = %id))]
    pub async fn set_status(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        status: &str,
    ) -> Result<(), ServiceError> {
        let status = TicketStatus::parse(status)
            .ok_or_else(|| ServiceError::validation("invalid status"))?;
        self.repo.find(id).await?.ok_or_else(|| ServiceError::not_found("ticket"))?;
        let assignee = self.repo.current_assignee(id).await?;
        if !policy::is_assignee(assignee, ctx.user_id) {
            return Err(ServiceError::forbidden("only the current assignee may change status"));
        }
        let completed_at =
            if status == TicketStatus::Completed { Some(Utc::now().into()) } else { None };
        self.repo.set_status(id, status, completed_at).await?;
        info!(status = status.as_str(), "ticket status changed");
        Ok(())
    }

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, ticket_id = %id, target = %target))]
    pub async fn assign(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        target: Uuid,
    ) -> Result<(), ServiceError> {
        self.load_for_author(ctx, id).await?;
        if !self.repo.is_live_user(target).await? {
            return Err(ServiceError::not_found("user"));
        }
        self.repo.assign(id, target).await?;
        info!("ticket assigned");
        Ok(())
    }

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, ticket_id = %id))]
    pub async fn unassign(&self, ctx: &AuthContext, id: Uuid) -> Result<(), ServiceError> {
        self.load_for_author(ctx, id).await?;
        self.repo.unassign(id).await?;
        info!("ticket unassigned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::Role;
    use crate::tickets::repository::mock::MockTicketRepository;
    use crate::tickets::repository::MAX_LIST_ROWS;

    fn ctx(user_id: Uuid) -> AuthContext {
        AuthContext { user_id, role: Role::User }
    }

    fn setup() -> (TicketService<MockTicketRepository>, Arc<MockTicketRepository>) {
        let repo = Arc::new(MockTicketRepository::default());
        (TicketService::new(repo.clone()), repo)
    }

    fn save_input(title: &str) -> SaveTicketInput {
        SaveTicketInput { title: title.into(), description: Some("details".into()), file_path: None }
    }

    #[tokio::test]
    async fn create_defaults_to_pending_with_caller_as_author() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);

        let ticket = svc.create(&ctx(author), save_input("printer on fire")).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.created_by, author);
        assert!(ticket.completed_at.is_none());
    }

    #[tokio::test]
    async fn create_requires_a_title() {
        let (svc, _) = setup();
        let err = svc.create(&ctx(Uuid::new_v4()), save_input("   ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn get_masks_foreign_tickets_as_not_found() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        let ticket = svc.create(&ctx(author), save_input("vpn broken")).await.unwrap();

        let err = svc.get(&ctx(stranger), ticket.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(svc.get(&ctx(author), ticket.id).await.is_ok());
    }

    #[tokio::test]
    async fn assignee_can_read_but_not_edit() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let staff = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(staff, "Stan", true);
        let ticket = svc.create(&ctx(author), save_input("vpn broken")).await.unwrap();
        svc.assign(&ctx(author), ticket.id, staff).await.unwrap();

        let detail = svc.get(&ctx(staff), ticket.id).await.unwrap();
        assert_eq!(detail.assignee.as_ref().map(|a| a.id), Some(staff));
        assert_eq!(detail.author_name, "Alice");

        let err = svc.update(&ctx(staff), ticket.id, save_input("hijacked")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = svc.delete(&ctx(staff), ticket.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_preserves_file_path_unless_replaced() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        let ticket = svc
            .create(
                &ctx(author),
                SaveTicketInput {
                    title: "screenshot attached".into(),
                    description: None,
                    file_path: Some("uploads/shot.png".into()),
                },
            )
            .await
            .unwrap();

        let updated = svc.update(&ctx(author), ticket.id, save_input("new title")).await.unwrap();
        assert_eq!(updated.file_path.as_deref(), Some("uploads/shot.png"));

        let updated = svc
            .update(
                &ctx(author),
                ticket.id,
                SaveTicketInput {
                    title: "new title".into(),
                    description: None,
                    file_path: Some("uploads/other.png".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.file_path.as_deref(), Some("uploads/other.png"));
    }

    #[tokio::test]
    async fn delete_hides_the_ticket_from_everyone() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        let ticket = svc.create(&ctx(author), save_input("old issue")).await.unwrap();

        svc.delete(&ctx(author), ticket.id).await.unwrap();
        let err = svc.get(&ctx(author), ticket.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(svc.list(&ctx(author), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_change_is_assignee_only() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let staff = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(staff, "Stan", true);
        let ticket = svc.create(&ctx(author), save_input("slow laptop")).await.unwrap();

        // Author cannot change status, not even on their own ticket.
        let err = svc.set_status(&ctx(author), ticket.id, "inprogress").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        svc.assign(&ctx(author), ticket.id, staff).await.unwrap();
        svc.set_status(&ctx(staff), ticket.id, "inprogress").await.unwrap();
        let detail = svc.get(&ctx(author), ticket.id).await.unwrap();
        assert_eq!(detail.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn invalid_status_rejected_before_ownership_checks() {
        let (svc, _) = setup();
        let err = svc
            .set_status(&ctx(Uuid::new_v4()), Uuid::new_v4(), "fixed")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn completed_stamps_and_reopening_clears_completed_at() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let staff = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(staff, "Stan", true);
        let ticket = svc.create(&ctx(author), save_input("done soon")).await.unwrap();
        svc.assign(&ctx(author), ticket.id, staff).await.unwrap();

        svc.set_status(&ctx(staff), ticket.id, "completed").await.unwrap();
        let detail = svc.get(&ctx(author), ticket.id).await.unwrap();
        assert!(detail.completed_at.is_some());

        svc.set_status(&ctx(staff), ticket.id, "onhold").await.unwrap();
        let detail = svc.get(&ctx(author), ticket.id).await.unwrap();
        assert!(detail.completed_at.is_none());
    }

    #[tokio::test]
    async fn reassign_keeps_history_with_one_open_row() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(first, "Stan", true);
        repo.seed_user(second, "Sue", true);
        let ticket = svc.create(&ctx(author), save_input("handover")).await.unwrap();

        svc.assign(&ctx(author), ticket.id, first).await.unwrap();
        svc.assign(&ctx(author), ticket.id, second).await.unwrap();

        let rows = repo.assignment_rows(ticket.id);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().filter(|a| a.open).count(), 1);
        assert_eq!(rows.iter().find(|a| a.open).map(|a| a.assigned_to), Some(second));

        // The previous assignee lost visibility with the open row.
        let err = svc.get(&ctx(first), ticket.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn assign_rejects_missing_or_deleted_target() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let gone = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(gone, "Ghost", false);
        let ticket = svc.create(&ctx(author), save_input("unroutable")).await.unwrap();

        let err = svc.assign(&ctx(author), ticket.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = svc.assign(&ctx(author), ticket.id, gone).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn unassign_is_author_only_and_idempotent() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let staff = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(staff, "Stan", true);
        let ticket = svc.create(&ctx(author), save_input("take it back")).await.unwrap();
        svc.assign(&ctx(author), ticket.id, staff).await.unwrap();

        let err = svc.unassign(&ctx(staff), ticket.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        svc.unassign(&ctx(author), ticket.id).await.unwrap();
        svc.unassign(&ctx(author), ticket.id).await.unwrap();
        let rows = repo.assignment_rows(ticket.id);
        assert!(rows.iter().all(|a| !a.open));
    }

    #[tokio::test]
    async fn list_shows_placeholder_for_unassigned_and_filters_by_query() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        let staff = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        repo.seed_user(staff, "Stan", true);
        let assigned = svc.create(&ctx(author), save_input("email bounce")).await.unwrap();
        svc.create(&ctx(author), save_input("disk full")).await.unwrap();
        svc.assign(&ctx(author), assigned.id, staff).await.unwrap();

        let rows = svc.list(&ctx(author), None).await.unwrap();
        assert_eq!(rows.len(), 2);
        let by_id =
            |id: Uuid| rows.iter().find(|r| r.id == id).map(|r| r.assignee_name.clone());
        assert_eq!(by_id(assigned.id).as_deref(), Some("Stan"));
        assert!(rows.iter().any(|r| r.assignee_name == "-"));

        // Case-insensitive match on title.
        let rows = svc.list(&ctx(author), Some("DISK")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "disk full");

        // Match on author name.
        let rows = svc.list(&ctx(author), Some("alice")).await.unwrap();
        assert_eq!(rows.len(), 2);

        // Assignee sees only their open assignment.
        let rows = svc.list(&ctx(staff), None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, assigned.id);
    }

    #[tokio::test]
    async fn list_is_capped() {
        let (svc, repo) = setup();
        let author = Uuid::new_v4();
        repo.seed_user(author, "Alice", true);
        for i in 0..(MAX_LIST_ROWS + 1) {
            svc.create(&ctx(author), save_input(&format!("ticket {i}"))).await.unwrap();
        }
        let rows = svc.list(&ctx(author), None).await.unwrap();
        assert_eq!(rows.len() as u64, MAX_LIST_ROWS);
    }
}
