//! Board repository for database operations

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::jira::types::BoardSummary;
use crate::models::board::{self, Entity as Board};

/// Repository for board database operations
#[derive(Debug, Clone)]
pub struct BoardRepository {
    pub db: Arc<DatabaseConnection>,
}

impl BoardRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upsert a board keyed on (connection_id, jira_id). Re-syncing the same
    /// board updates the existing row in place, keeping its local id stable.
    pub async fn upsert(
        &self,
        connection_id: &Uuid,
        remote: &BoardSummary,
    ) -> Result<board::Model> {
        let jira_id = remote.id.to_string();
        let existing = Board::find()
            .filter(board::Column::ConnectionId.eq(*connection_id))
            .filter(board::Column::JiraId.eq(jira_id.as_str()))
            .one(self.db.as_ref())
            .await
            .context("failed to look up board")?;

        let now = Utc::now();
        match existing {
            Some(model) => {
                let mut active: board::ActiveModel = model.into();
                active.name = Set(remote.name.clone());
                active.board_type = Set(remote.board_type.clone());
                active.is_private = Set(remote.is_private);
                active.updated_at = Set(now.into());
                active
                    .update(self.db.as_ref())
                    .await
                    .context("failed to update board")
            }
            None => {
                let active = board::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    connection_id: Set(*connection_id),
                    jira_id: Set(jira_id),
                    name: Set(remote.name.clone()),
                    board_type: Set(remote.board_type.clone()),
                    is_private: Set(remote.is_private),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                active
                    .insert(self.db.as_ref())
                    .await
                    .context("failed to insert board")
            }
        }
    }
}
