//! Migration to create the connections table.
//!
//! A connection is one linked Jira Cloud site together with its encrypted
//! OAuth tokens and granted scopes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connections::CloudId).text().not_null())
                    .col(ColumnDef::new(Connections::SiteName).text().not_null())
                    .col(ColumnDef::new(Connections::SiteUrl).text().not_null())
                    .col(
                        ColumnDef::new(Connections::AccessTokenEnc)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Connections::RefreshTokenEnc)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Connections::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Connections::Scopes).json_binary().null())
                    .col(
                        ColumnDef::new(Connections::TokenType)
                            .text()
                            .not_null()
                            .default("Bearer"),
                    )
                    .col(
                        ColumnDef::new(Connections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connections::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connections_cloud_id")
                    .table(Connections::Table)
                    .col(Connections::CloudId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_connections_cloud_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Connections::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Connections {
    Table,
    Id,
    CloudId,
    SiteName,
    SiteUrl,
    AccessTokenEnc,
    RefreshTokenEnc,
    ExpiresAt,
    Scopes,
    TokenType,
    CreatedAt,
    UpdatedAt,
}
