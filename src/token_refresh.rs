//! OAuth token refresh flow
//!
//! Exchanges a stored refresh token for a new access token at the Atlassian
//! authorization server. Every failure path fails closed: the caller gets
//! `Ok(None)` and the stored tokens are left untouched, so a broken refresh
//! can never corrupt a working connection.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::connection;
use crate::repositories::ConnectionRepository;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    scope: Option<String>,
    token_type: Option<String>,
}

/// A successful refresh: the updated connection row plus the plaintext
/// access token for immediate reuse.
#[derive(Debug)]
pub struct RefreshedAccess {
    pub connection: connection::Model,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http: reqwest::Client,
    oauth_base: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl TokenRefresher {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            oauth_base: config.jira_oauth_base.clone(),
            client_id: config.jira_client_id.clone(),
            client_secret: config.jira_client_secret.clone(),
        })
    }

    /// Attempt a refresh for the connection. Returns `Ok(None)` when the
    /// connection has no refresh token, client credentials are missing, or
    /// the authorization server rejects the exchange.
    pub async fn refresh(
        &self,
        connections: &ConnectionRepository,
        connection: &connection::Model,
    ) -> Result<Option<RefreshedAccess>> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            warn!(connection_id = %connection.id, "token refresh skipped, oauth client credentials not configured");
            metrics::counter!("jira_token_refresh_failures_total").increment(1);
            return Ok(None);
        };

        let Some(refresh_token) = connections.refresh_token(connection)? else {
            warn!(connection_id = %connection.id, "token refresh skipped, connection has no refresh token");
            metrics::counter!("jira_token_refresh_failures_total").increment(1);
            return Ok(None);
        };

        let url = format!("{}/oauth/token", self.oauth_base.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                client_id,
                client_secret,
                refresh_token: &refresh_token,
            })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                warn!(connection_id = %connection.id, error = %err, "token refresh request failed");
                metrics::counter!("jira_token_refresh_failures_total").increment(1);
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                connection_id = %connection.id,
                status = status.as_u16(),
                body,
                "authorization server rejected token refresh"
            );
            metrics::counter!("jira_token_refresh_failures_total").increment(1);
            return Ok(None);
        }

        let tokens: TokenResponse = match response.json().await {
            Ok(t) => t,
            Err(err) => {
                warn!(connection_id = %connection.id, error = %err, "token refresh response was not valid JSON");
                metrics::counter!("jira_token_refresh_failures_total").increment(1);
                return Ok(None);
            }
        };

        let expires_at = Utc::now() + Duration::seconds(tokens.expires_in);
        let scopes: Vec<String> = tokens
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let updated = connections
            .apply_refreshed_tokens(
                connection.clone(),
                &tokens.access_token,
                tokens.refresh_token.as_deref(),
                expires_at.into(),
                &scopes,
                tokens.token_type.as_deref(),
            )
            .await?;

        metrics::counter!("jira_token_refresh_total").increment(1);
        info!(connection_id = %updated.id, rotated_refresh = tokens.refresh_token.is_some(), "access token refreshed");
        Ok(Some(RefreshedAccess {
            connection: updated,
            access_token: tokens.access_token,
        }))
    }
}
