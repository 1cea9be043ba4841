//! Migration to create the boards table.
//!
//! Boards are keyed by the (connection_id, jira_id) natural composite key so
//! repeated syncs update rows in place instead of duplicating them.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Boards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Boards::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Boards::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(Boards::JiraId).text().not_null())
                    .col(ColumnDef::new(Boards::Name).text().not_null())
                    .col(ColumnDef::new(Boards::BoardType).text().null())
                    .col(ColumnDef::new(Boards::IsPrivate).boolean().null())
                    .col(
                        ColumnDef::new(Boards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Boards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boards_connection_id")
                            .from(Boards::Table, Boards::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_boards_connection_jira_id")
                    .table(Boards::Table)
                    .col(Boards::ConnectionId)
                    .col(Boards::JiraId)
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
                    .name("idx_boards_connection_jira_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Boards::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Boards {
    Table,
    Id,
    ConnectionId,
    JiraId,
    Name,
    BoardType,
    IsPrivate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Connections {
    Table,
    Id,
}
