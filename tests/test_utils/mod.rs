//! Test utilities for database and fixture setup.
//!
//! Provides an in-memory SQLite database with migrations applied, a test
//! configuration wired to mock servers, and helpers for seeding encrypted
//! connections.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{Duration, Utc};
use jiradash_sync::config::{AppConfig, HttpClientConfig, SyncConfig};
use jiradash_sync::crypto::{CryptoKey, TokenCipher};
use jiradash_sync::models::connection;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_KEY: [u8; 32] = [7u8; 32];

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

pub fn test_cipher() -> TokenCipher {
    TokenCipher::new(CryptoKey::new(TEST_KEY.to_vec()).expect("valid test key"))
}

/// Test configuration pointing the Jira API and OAuth bases at mock servers.
/// Retry delays are near-zero so retry paths stay fast under test.
pub fn test_config(api_base: &str, oauth_base: &str) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        log_level: "debug".to_string(),
        log_format: "pretty".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 5,
        db_acquire_timeout_ms: 1_000,
        crypto_key: Some(TEST_KEY.to_vec()),
        jira_client_id: Some("test-client-id".to_string()),
        jira_client_secret: Some("test-client-secret".to_string()),
        jira_oauth_base: oauth_base.to_string(),
        jira_api_base: api_base.to_string(),
        sync: SyncConfig {
            enabled: true,
            interval_minutes: 10,
        },
        http: HttpClientConfig {
            max_retries: 2,
            min_delay_ms: 1,
            max_delay_ms: 5,
            timeout_ms: 5_000,
        },
    }
}

/// Insert a connection row with encrypted tokens.
pub async fn insert_connection(
    db: &DatabaseConnection,
    cloud_id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Result<connection::Model> {
    let cipher = test_cipher();
    let now = Utc::now();
    let refresh_enc = match refresh_token {
        Some(token) => Some(cipher.encrypt(token)?.to_json()),
        None => None,
    };
    let model = connection::ActiveModel {
        id: Set(Uuid::new_v4()),
        cloud_id: Set(cloud_id.to_string()),
        site_name: Set(format!("{cloud_id} site")),
        site_url: Set(format!("https://{cloud_id}.atlassian.net")),
        access_token_enc: Set(cipher.encrypt(access_token)?.to_json()),
        refresh_token_enc: Set(refresh_enc),
        expires_at: Set((now + Duration::hours(1)).into()),
        scopes: Set(Some(serde_json::json!([
            "offline_access",
            "read:jira-user",
            "read:jira-work"
        ]))),
        token_type: Set("Bearer".to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Ok(model.insert(db).await?)
}
