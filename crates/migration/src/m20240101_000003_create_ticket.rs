//! Create `ticket` table with FK to `user` (creator).
//!
//! `completed_at` is non-null only while status is `completed`; soft delete
//! via `deleted_at`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(uuid(Ticket::Id).primary_key())
                    .col(string_len(Ticket::Title, 255).not_null())
                    .col(text(Ticket::Description).not_null())
                    .col(string_len(Ticket::Status, 32).not_null())
                    .col(
                        ColumnDef::new(Ticket::FilePath)
                            .string_len(512)
                            .null(),
                    )
                    .col(uuid(Ticket::CreatedBy).not_null())
                    .col(timestamp_with_time_zone(Ticket::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Ticket::UpdatedAt).not_null())
                    .col(
                        ColumnDef::new(Ticket::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Ticket::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_creator")
                            .from(Ticket::Table, Ticket::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Ticket::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Ticket { Table, Id, Title, Description, Status, FilePath, CreatedBy, CreatedAt, UpdatedAt, CompletedAt, DeletedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
