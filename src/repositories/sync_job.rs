//! Sync job repository for database operations
//!
//! Enforces the job lifecycle: a row is created `running` and moves exactly
//! once to a terminal state. Terminal rows are never rewritten.

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::models::sync_job::{self, Entity as SyncJob, STATUS_FAILED, STATUS_RUNNING, STATUS_SUCCESS};

/// Repository for sync job database operations
#[derive(Debug, Clone)]
pub struct SyncJobRepository {
    pub db: Arc<DatabaseConnection>,
}

impl SyncJobRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record the start of a sync pass for a connection.
    pub async fn start_job(&self, connection_id: &Uuid) -> Result<sync_job::Model> {
        let now = Utc::now();
        let job = sync_job::ActiveModel {
            id: Set(Uuid::new_v4()),
            connection_id: Set(*connection_id),
            job_type: Set("full".to_string()),
            status: Set(STATUS_RUNNING.to_string()),
            started_at: Set(now.into()),
            finished_at: Set(None),
            error_message: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        job.insert(self.db.as_ref())
            .await
            .context("failed to create sync job")
    }

    pub async fn mark_succeeded(&self, job_id: &Uuid) -> Result<()> {
        self.finish(job_id, STATUS_SUCCESS, None).await
    }

    pub async fn mark_failed(&self, job_id: &Uuid, error_message: &str) -> Result<()> {
        self.finish(job_id, STATUS_FAILED, Some(error_message.to_string()))
            .await
    }

    async fn finish(&self, job_id: &Uuid, status: &str, error_message: Option<String>) -> Result<()> {
        let Some(job) = SyncJob::find_by_id(*job_id)
            .one(self.db.as_ref())
            .await
            .context("failed to load sync job")?
        else {
            warn!(%job_id, "sync job disappeared before completion");
            return Ok(());
        };

        if job.status != STATUS_RUNNING {
            warn!(%job_id, current = %job.status, "sync job already terminal, not rewriting");
            return Ok(());
        }

        let now = Utc::now();
        let mut active: sync_job::ActiveModel = job.into();
        active.status = Set(status.to_string());
        active.finished_at = Set(Some(now.into()));
        active.error_message = Set(error_message);
        active.updated_at = Set(now.into());
        active
            .update(self.db.as_ref())
            .await
            .context("failed to finish sync job")?;
        Ok(())
    }
}
