//! Connection repository for database operations
//!
//! Wraps the connections table and the token vault so callers only ever see
//! plaintext tokens in memory.

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

use crate::crypto::{EncryptedToken, TokenCipher};
use crate::models::connection::{self, Entity as Connection};

/// Repository for connection database operations
#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    pub db: Arc<DatabaseConnection>,
    cipher: TokenCipher,
}

impl ConnectionRepository {
    pub fn new(db: Arc<DatabaseConnection>, cipher: TokenCipher) -> Self {
        Self { db, cipher }
    }

    /// All connected sites, in creation order.
    pub async fn find_all(&self) -> Result<Vec<connection::Model>> {
        Connection::find()
            .all(self.db.as_ref())
            .await
            .context("failed to load connections")
    }

    /// Decrypt the access token for a connection. Fails closed when the
    /// bundle is malformed or the key does not match.
    pub fn access_token(&self, connection: &connection::Model) -> Result<String> {
        let bundle = EncryptedToken::from_json(&connection.access_token_enc)?;
        self.cipher
            .decrypt(&bundle)
            .with_context(|| format!("cannot decrypt access token for connection {}", connection.id))
    }

    /// Decrypt the refresh token; `None` when the site never granted one.
    pub fn refresh_token(&self, connection: &connection::Model) -> Result<Option<String>> {
        let Some(raw) = &connection.refresh_token_enc else {
            return Ok(None);
        };
        let bundle = EncryptedToken::from_json(raw)?;
        let token = self
            .cipher
            .decrypt(&bundle)
            .with_context(|| format!("cannot decrypt refresh token for connection {}", connection.id))?;
        Ok(Some(token))
    }

    /// Persist a freshly refreshed token set. The stored refresh token is
    /// only replaced when the authorization server rotated it.
    pub async fn apply_refreshed_tokens(
        &self,
        connection: connection::Model,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTimeWithTimeZone,
        scopes: &[String],
        token_type: Option<&str>,
    ) -> Result<connection::Model> {
        let access_enc = self.cipher.encrypt(access_token)?;

        let mut active: connection::ActiveModel = connection.into();
        active.access_token_enc = Set(access_enc.to_json());
        if let Some(refresh) = refresh_token {
            let refresh_enc = self.cipher.encrypt(refresh)?;
            active.refresh_token_enc = Set(Some(refresh_enc.to_json()));
        }
        active.expires_at = Set(expires_at);
        if !scopes.is_empty() {
            active.scopes = Set(Some(serde_json::json!(scopes)));
        }
        if let Some(token_type) = token_type {
            active.token_type = Set(token_type.to_string());
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db.as_ref())
            .await
            .context("failed to persist refreshed tokens")
    }
}
