//! Sprint repository for database operations

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::jira::types::{SprintSummary, parse_date};
use crate::models::sprint::{self, Entity as Sprint};

/// Repository for sprint database operations
#[derive(Debug, Clone)]
pub struct SprintRepository {
    pub db: Arc<DatabaseConnection>,
}

impl SprintRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upsert a sprint keyed on (connection_id, jira_id). Sprint dates that
    /// fail to parse are stored as NULL rather than failing the sync.
    pub async fn upsert(
        &self,
        connection_id: &Uuid,
        board_id: &Uuid,
        remote: &SprintSummary,
    ) -> Result<sprint::Model> {
        let jira_id = remote.id.to_string();
        let existing = Sprint::find()
            .filter(sprint::Column::ConnectionId.eq(*connection_id))
            .filter(sprint::Column::JiraId.eq(jira_id.as_str()))
            .one(self.db.as_ref())
            .await
            .context("failed to look up sprint")?;

        let state = remote
            .state
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let start_date = parse_date(remote.start_date.as_deref());
        let end_date = parse_date(remote.end_date.as_deref());
        let complete_date = parse_date(remote.complete_date.as_deref());

        let now = Utc::now();
        match existing {
            Some(model) => {
                let mut active: sprint::ActiveModel = model.into();
                active.board_id = Set(*board_id);
                active.name = Set(remote.name.clone());
                active.state = Set(state);
                active.start_date = Set(start_date);
                active.end_date = Set(end_date);
                active.complete_date = Set(complete_date);
                active.goal = Set(remote.goal.clone());
                active.updated_at = Set(now.into());
                active
                    .update(self.db.as_ref())
                    .await
                    .context("failed to update sprint")
            }
            None => {
                let active = sprint::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    connection_id: Set(*connection_id),
                    board_id: Set(*board_id),
                    jira_id: Set(jira_id),
                    name: Set(remote.name.clone()),
                    state: Set(state),
                    start_date: Set(start_date),
                    end_date: Set(end_date),
                    complete_date: Set(complete_date),
                    goal: Set(remote.goal.clone()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                active
                    .insert(self.db.as_ref())
                    .await
                    .context("failed to insert sprint")
            }
        }
    }
}
