//! Issue repository for database operations

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::jira::types::{IssueSummary, parse_date};
use crate::models::issue::{self, Entity as Issue};

/// Repository for issue database operations
#[derive(Debug, Clone)]
pub struct IssueRepository {
    pub db: Arc<DatabaseConnection>,
}

impl IssueRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upsert an issue keyed on (connection_id, jira_id). `assignee_id` is
    /// the local assignee row, already upserted by the caller; None clears
    /// the link when the issue became unassigned.
    pub async fn upsert(
        &self,
        connection_id: &Uuid,
        board_id: &Uuid,
        assignee_id: Option<Uuid>,
        remote: &IssueSummary,
    ) -> Result<issue::Model> {
        let existing = Issue::find()
            .filter(issue::Column::ConnectionId.eq(*connection_id))
            .filter(issue::Column::JiraId.eq(remote.id.as_str()))
            .one(self.db.as_ref())
            .await
            .context("failed to look up issue")?;

        let fields = &remote.fields;
        let summary = fields.summary.clone().unwrap_or_default();
        let jira_created_at = parse_date(fields.created.as_deref());
        let jira_updated_at = parse_date(fields.updated.as_deref());

        let now = Utc::now();
        match existing {
            Some(model) => {
                let mut active: issue::ActiveModel = model.into();
                active.board_id = Set(*board_id);
                active.assignee_id = Set(assignee_id);
                active.key = Set(remote.key.clone());
                active.summary = Set(summary);
                active.issue_type = Set(fields.issue_type_name());
                active.status = Set(fields.status_name());
                active.status_category = Set(fields.status_category_name());
                active.priority = Set(fields.priority_name());
                active.jira_created_at = Set(jira_created_at);
                active.jira_updated_at = Set(jira_updated_at);
                active.updated_at = Set(now.into());
                active
                    .update(self.db.as_ref())
                    .await
                    .context("failed to update issue")
            }
            None => {
                let active = issue::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    connection_id: Set(*connection_id),
                    board_id: Set(*board_id),
                    assignee_id: Set(assignee_id),
                    jira_id: Set(remote.id.clone()),
                    key: Set(remote.key.clone()),
                    summary: Set(summary),
                    issue_type: Set(fields.issue_type_name()),
                    status: Set(fields.status_name()),
                    status_category: Set(fields.status_category_name()),
                    priority: Set(fields.priority_name()),
                    jira_created_at: Set(jira_created_at),
                    jira_updated_at: Set(jira_updated_at),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                active
                    .insert(self.db.as_ref())
                    .await
                    .context("failed to insert issue")
            }
        }
    }
}
