//! Jira sync engine
//!
//! Pulls boards, sprints, issues and assignees for every connected site and
//! mirrors them into local tables. One cycle walks all connections; each
//! connection gets its own sync job row and its failures never spill over
//! into the others.
//!
//! A 401 anywhere in a connection's pass triggers exactly one token refresh
//! followed by one retry of the whole pass. A second 401, or a refresh that
//! fails closed, makes the connection terminal for this cycle.

use anyhow::Result;
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::crypto::TokenCipher;
use crate::error::SyncError;
use crate::jira::client::JiraClient;
use crate::jira::types::{BoardSummary, IssuePage, PageResponse, SprintSummary};
use crate::models::connection;
use crate::repositories::{
    AssigneeRepository, BoardRepository, ConnectionRepository, IssueRepository, SprintRepository,
    SyncJobRepository,
};
use crate::token_refresh::TokenRefresher;

const PAGE_SIZE: u64 = 50;
const SPRINT_STATES: &str = "active,future,closed";
const ISSUE_FIELDS: &str = "summary,issuetype,status,priority,assignee,created,updated";

/// Outcome of one full cycle across all connections.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub connections: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-connection row counts, for logging.
#[derive(Debug, Default, Clone, Copy)]
struct ConnectionStats {
    boards: usize,
    sprints: usize,
    issues: usize,
}

pub struct SyncEngine {
    client: JiraClient,
    connections: ConnectionRepository,
    jobs: SyncJobRepository,
    boards: BoardRepository,
    sprints: SprintRepository,
    issues: IssueRepository,
    assignees: AssigneeRepository,
    refresher: TokenRefresher,
}

impl SyncEngine {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Result<Self> {
        let cipher = TokenCipher::from_config_key(config.crypto_key.as_ref())?;
        Ok(Self {
            client: JiraClient::new(config.jira_api_base.clone(), config.http.clone())?,
            connections: ConnectionRepository::new(db.clone(), cipher),
            jobs: SyncJobRepository::new(db.clone()),
            boards: BoardRepository::new(db.clone()),
            sprints: SprintRepository::new(db.clone()),
            issues: IssueRepository::new(db.clone()),
            assignees: AssigneeRepository::new(db),
            refresher: TokenRefresher::new(config)?,
        })
    }

    /// Run one sync pass over every connection. Always returns the summary;
    /// individual connection failures are recorded on their job rows.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let connections = self.connections.find_all().await?;
        let mut summary = CycleSummary {
            connections: connections.len(),
            ..Default::default()
        };
        metrics::counter!("jira_sync_cycles_total").increment(1);

        for conn in connections {
            let job = self.jobs.start_job(&conn.id).await?;
            match self.sync_connection(&conn).await {
                Ok(stats) => {
                    self.jobs.mark_succeeded(&job.id).await?;
                    summary.succeeded += 1;
                    info!(
                        connection_id = %conn.id,
                        site = %conn.site_name,
                        boards = stats.boards,
                        sprints = stats.sprints,
                        issues = stats.issues,
                        "connection synced"
                    );
                }
                Err(err) => {
                    self.jobs.mark_failed(&job.id, &err.to_string()).await?;
                    summary.failed += 1;
                    metrics::counter!("jira_sync_connection_failures_total").increment(1);
                    warn!(connection_id = %conn.id, site = %conn.site_name, error = %err, "connection sync failed");
                }
            }
        }

        info!(
            connections = summary.connections,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "sync cycle finished"
        );
        Ok(summary)
    }

    /// Sync one connection, refreshing the token at most once on a 401.
    async fn sync_connection(&self, conn: &connection::Model) -> Result<ConnectionStats, SyncError> {
        let access_token = self
            .connections
            .access_token(conn)
            .map_err(|e| SyncError::permanent(e.to_string()))?;

        match self.sync_site(conn, &access_token).await {
            Err(err) if err.is_unauthorized() => {
                debug!(connection_id = %conn.id, "access token rejected, attempting refresh");
                let refreshed = self
                    .refresher
                    .refresh(&self.connections, conn)
                    .await
                    .map_err(|e| SyncError::transient(e.to_string()))?;

                match refreshed {
                    Some(fresh) => self
                        .sync_site(&fresh.connection, &fresh.access_token)
                        .await
                        .map_err(|err| {
                            if err.is_unauthorized() {
                                SyncError::unauthorized(
                                    "jira rejected the refreshed token, reconnect required",
                                )
                            } else {
                                err
                            }
                        }),
                    None => Err(SyncError::unauthorized(
                        "token refresh failed, reconnect required",
                    )),
                }
            }
            other => other,
        }
    }

    /// One full pass over a site: boards, then sprints and issues per board.
    async fn sync_site(
        &self,
        conn: &connection::Model,
        access_token: &str,
    ) -> Result<ConnectionStats, SyncError> {
        let mut stats = ConnectionStats::default();

        let boards = self
            .collect_pages::<BoardSummary>(&conn.cloud_id, "/board", access_token)
            .await?;

        for remote_board in &boards {
            let board = self
                .boards
                .upsert(&conn.id, remote_board)
                .await
                .map_err(db_err)?;
            stats.boards += 1;

            stats.sprints += self
                .sync_sprints(conn, &board.id, remote_board.id, access_token)
                .await?;
            stats.issues += self
                .sync_issues(conn, &board.id, remote_board.id, access_token)
                .await?;
        }

        Ok(stats)
    }

    async fn sync_sprints(
        &self,
        conn: &connection::Model,
        board_id: &Uuid,
        remote_board_id: i64,
        access_token: &str,
    ) -> Result<usize, SyncError> {
        let path = format!("/board/{remote_board_id}/sprint?state={SPRINT_STATES}");
        let sprints = match self
            .collect_pages::<SprintSummary>(&conn.cloud_id, &path, access_token)
            .await
        {
            Ok(sprints) => sprints,
            // Kanban boards answer the sprint listing with a 400; every
            // other failure stays terminal for the connection's cycle.
            Err(err) if err.status == Some(400) => {
                debug!(connection_id = %conn.id, remote_board_id, error = %err, "board has no sprint support, skipping");
                return Ok(0);
            }
            Err(err) => return Err(err),
        };

        let mut count = 0;
        for sprint in &sprints {
            self.sprints
                .upsert(&conn.id, board_id, sprint)
                .await
                .map_err(db_err)?;
            count += 1;
        }
        Ok(count)
    }

    async fn sync_issues(
        &self,
        conn: &connection::Model,
        board_id: &Uuid,
        remote_board_id: i64,
        access_token: &str,
    ) -> Result<usize, SyncError> {
        let mut count = 0;
        let mut start_at: u64 = 0;
        loop {
            let url = self.client.agile_url(
                &conn.cloud_id,
                &format!(
                    "/board/{remote_board_id}/issue?startAt={start_at}&maxResults={PAGE_SIZE}&fields={ISSUE_FIELDS}"
                ),
            );
            let Some(page) = self.client.get::<IssuePage>(&url, access_token).await? else {
                break;
            };

            let fetched = page.issues.len() as u64;
            for issue in &page.issues {
                let assignee_id = match &issue.fields.assignee {
                    Some(remote) => Some(
                        self.assignees
                            .upsert(&conn.id, remote)
                            .await
                            .map_err(db_err)?
                            .id,
                    ),
                    None => None,
                };
                self.issues
                    .upsert(&conn.id, board_id, assignee_id, issue)
                    .await
                    .map_err(db_err)?;
                count += 1;
            }

            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }
        Ok(count)
    }

    /// Walk a paginated listing until the server reports `isLast`.
    async fn collect_pages<T: DeserializeOwned>(
        &self,
        cloud_id: &str,
        path: &str,
        access_token: &str,
    ) -> Result<Vec<T>, SyncError> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut out = Vec::new();
        let mut start_at: u64 = 0;
        loop {
            let url = self.client.agile_url(
                cloud_id,
                &format!("{path}{sep}startAt={start_at}&maxResults={PAGE_SIZE}"),
            );
            let Some(page) = self
                .client
                .get::<PageResponse<T>>(&url, access_token)
                .await?
            else {
                break;
            };

            let fetched = page.values.len() as u64;
            out.extend(page.values);
            start_at += fetched;
            if page.is_last || fetched == 0 {
                break;
            }
        }
        Ok(out)
    }
}

fn db_err(err: anyhow::Error) -> SyncError {
    SyncError::transient(format!("{err:#}"))
}
