//! Assignee repository for database operations

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::jira::types::AssigneeSummary;
use crate::models::assignee::{self, Entity as Assignee};

/// Repository for assignee database operations
#[derive(Debug, Clone)]
pub struct AssigneeRepository {
    pub db: Arc<DatabaseConnection>,
}

impl AssigneeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Upsert an assignee keyed on (connection_id, account_id). A missing
    /// `active` flag leaves the stored value untouched so a sparse payload
    /// cannot erase what we already know.
    pub async fn upsert(
        &self,
        connection_id: &Uuid,
        remote: &AssigneeSummary,
    ) -> Result<assignee::Model> {
        let existing = Assignee::find()
            .filter(assignee::Column::ConnectionId.eq(*connection_id))
            .filter(assignee::Column::AccountId.eq(remote.account_id.as_str()))
            .one(self.db.as_ref())
            .await
            .context("failed to look up assignee")?;

        let now = Utc::now();
        match existing {
            Some(model) => {
                let mut active: assignee::ActiveModel = model.into();
                active.display_name = Set(remote.display_name_or_unknown());
                active.email = Set(remote.email_address.clone());
                active.avatar_url = Set(remote.avatar_url());
                if let Some(flag) = remote.active {
                    active.active = Set(Some(flag));
                }
                active.updated_at = Set(now.into());
                active
                    .update(self.db.as_ref())
                    .await
                    .context("failed to update assignee")
            }
            None => {
                let active = assignee::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    connection_id: Set(*connection_id),
                    account_id: Set(remote.account_id.clone()),
                    display_name: Set(remote.display_name_or_unknown()),
                    email: Set(remote.email_address.clone()),
                    avatar_url: Set(remote.avatar_url()),
                    active: Set(remote.active),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                active
                    .insert(self.db.as_ref())
                    .await
                    .context("failed to insert assignee")
            }
        }
    }
}
