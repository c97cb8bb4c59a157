//! Create `ticket_assignment` table with FKs to `ticket` and `user`.
//!
//! Closed rows (`unassigned_at` set) form the assignment history; the single
//! open row per ticket is enforced by a partial index in the indexes migration.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TicketAssignment::Table)
                    .if_not_exists()
                    .col(uuid(TicketAssignment::Id).primary_key())
                    .col(uuid(TicketAssignment::TicketId).not_null())
                    .col(uuid(TicketAssignment::AssignedTo).not_null())
                    .col(timestamp_with_time_zone(TicketAssignment::AssignedAt).not_null())
                    .col(
                        ColumnDef::new(TicketAssignment::UnassignedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_ticket")
                            .from(TicketAssignment::Table, TicketAssignment::TicketId)
                            .to(Ticket::Table, Ticket::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_user")
                            .from(TicketAssignment::Table, TicketAssignment::AssignedTo)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TicketAssignment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TicketAssignment { Table, Id, TicketId, AssignedTo, AssignedAt, UnassignedAt }

#[derive(DeriveIden)]
enum Ticket { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
