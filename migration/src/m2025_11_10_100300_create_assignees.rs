//! Migration to create the assignees table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Assignees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignees::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assignees::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(Assignees::AccountId).text().not_null())
                    .col(ColumnDef::new(Assignees::DisplayName).text().not_null())
                    .col(ColumnDef::new(Assignees::Email).text().null())
                    .col(ColumnDef::new(Assignees::AvatarUrl).text().null())
                    .col(ColumnDef::new(Assignees::Active).boolean().null())
                    .col(
                        ColumnDef::new(Assignees::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Assignees::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignees_connection_id")
                            .from(Assignees::Table, Assignees::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assignees_connection_account_id")
                    .table(Assignees::Table)
                    .col(Assignees::ConnectionId)
                    .col(Assignees::AccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_assignees_connection_account_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Assignees::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Assignees {
    Table,
    Id,
    ConnectionId,
    AccountId,
    DisplayName,
    Email,
    AvatarUrl,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Connections {
    Table,
    Id,
}
