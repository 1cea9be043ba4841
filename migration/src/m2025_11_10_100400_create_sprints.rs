//! Migration to create the sprints table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sprints::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sprints::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sprints::ConnectionId).uuid().not_null())
                    .col(ColumnDef::new(Sprints::BoardId).uuid().not_null())
                    .col(ColumnDef::new(Sprints::JiraId).text().not_null())
                    .col(ColumnDef::new(Sprints::Name).text().not_null())
                    .col(ColumnDef::new(Sprints::State).text().not_null())
                    .col(
                        ColumnDef::new(Sprints::StartDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Sprints::EndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Sprints::CompleteDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Sprints::Goal).text().null())
                    .col(
                        ColumnDef::new(Sprints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Sprints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sprints_connection_id")
                            .from(Sprints::Table, Sprints::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sprints_board_id")
                            .from(Sprints::Table, Sprints::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sprints_connection_jira_id")
                    .table(Sprints::Table)
                    .col(Sprints::ConnectionId)
                    .col(Sprints::JiraId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sprints_board_id")
                    .table(Sprints::Table)
                    .col(Sprints::BoardId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sprints_board_id").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sprints_connection_jira_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Sprints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Sprints {
    Table,
    Id,
    ConnectionId,
    BoardId,
    JiraId,
    Name,
    State,
    StartDate,
    EndDate,
    CompleteDate,
    Goal,
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
