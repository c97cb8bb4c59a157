use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ticket: index on created_by for visibility queries
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_created_by")
                    .table(Ticket::Table)
                    .col(Ticket::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // Assignments: lookups by ticket and by assignee
        manager
            .create_index(
                Index::create()
                    .name("idx_assignment_ticket")
                    .table(TicketAssignment::Table)
                    .col(TicketAssignment::TicketId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_assignment_assigned_to")
                    .table(TicketAssignment::Table)
                    .col(TicketAssignment::AssignedTo)
                    .to_owned(),
            )
            .await?;

        // Session: index on user_id
        manager
            .create_index(
                Index::create()
                    .name("idx_session_user")
                    .table(Session::Table)
                    .col(Session::UserId)
                    .to_owned(),
            )
            .await?;

        // Partial unique indexes need raw SQL: sea-query's index builder has
        // no WHERE clause support.
        let conn = manager.get_connection();
        // Email uniqueness among non-deleted users only.
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX uniq_user_live_email ON \"user\" (LOWER(email)) WHERE deleted_at IS NULL",
        )
        .await?;
        // At most one open assignment per ticket.
        conn.execute_unprepared(
            "CREATE UNIQUE INDEX uniq_open_assignment ON ticket_assignment (ticket_id) WHERE unassigned_at IS NULL",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        conn.execute_unprepared("DROP INDEX IF EXISTS uniq_open_assignment").await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS uniq_user_live_email").await?;

        manager
            .drop_index(Index::drop().name("idx_session_user").table(Session::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_assignment_assigned_to")
                    .table(TicketAssignment::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_assignment_ticket")
                    .table(TicketAssignment::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ticket_created_by").table(Ticket::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Ticket { Table, CreatedBy }

#[derive(DeriveIden)]
enum TicketAssignment { Table, TicketId, AssignedTo }

#[derive(DeriveIden)]
enum Session { Table, UserId }
