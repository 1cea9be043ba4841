//! Migration to create the issues table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issues::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Issues::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(Issues::BoardId).uuid().not_null())
                    .col(ColumnDef::new(Issues::AssigneeId).uuid().null())
                    .col(ColumnDef::new(Issues::JiraId).text().not_null())
                    .col(ColumnDef::new(Issues::Key).text().not_null())
                    .col(ColumnDef::new(Issues::Summary).text().not_null())
                    .col(
                        ColumnDef::new(Issues::IssueType)
                            .text()
                            .not_null()
                            .default("Unknown"),
                    )
                    .col(
                        ColumnDef::new(Issues::Status)
                            .text()
                            .not_null()
                            .default("Unknown"),
                    )
                    .col(ColumnDef::new(Issues::StatusCategory).text().null())
                    .col(ColumnDef::new(Issues::Priority).text().null())
                    .col(
                        ColumnDef::new(Issues::JiraCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Issues::JiraUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Issues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_connection_id")
                            .from(Issues::Table, Issues::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_board_id")
                            .from(Issues::Table, Issues::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_assignee_id")
                            .from(Issues::Table, Issues::AssigneeId)
                            .to(Assignees::Table, Assignees::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_connection_jira_id")
                    .table(Issues::Table)
                    .col(Issues::ConnectionId)
                    .col(Issues::JiraId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_board_id")
                    .table(Issues::Table)
                    .col(Issues::BoardId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_issues_board_id").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_issues_connection_jira_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Issues {
    Table,
    Id,
    ConnectionId,
    BoardId,
    AssigneeId,
    JiraId,
    Key,
    Summary,
    IssueType,
    Status,
    StatusCategory,
    Priority,
    JiraCreatedAt,
    JiraUpdatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Connections {
    Table,
    Id,
}

#[derive(Iden)]
enum Boards {
    Table,
    Id,
}

#[derive(Iden)]
enum Assignees {
    Table,
    Id,
}
