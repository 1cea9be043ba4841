//! Connection entity model
//!
//! One row per linked Jira Cloud site, holding the encrypted OAuth token
//! bundles and the granted scopes.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Atlassian cloud id of the connected site
    pub cloud_id: String,

    pub site_name: String,

    pub site_url: String,

    /// Encrypted access token bundle `{iv, authTag, cipherText}`
    #[sea_orm(column_type = "JsonBinary")]
    pub access_token_enc: JsonValue,

    /// Encrypted refresh token bundle; absent means refresh is impossible
    #[sea_orm(column_type = "JsonBinary")]
    pub refresh_token_enc: Option<JsonValue>,

    /// Access token expiry
    pub expires_at: DateTimeWithTimeZone,

    /// Granted OAuth scopes, stored as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub scopes: Option<JsonValue>,

    pub token_type: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sync_job::Entity")]
    SyncJob,
    #[sea_orm(has_many = "super::board::Entity")]
    Board,
}

impl Related<super::sync_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncJob.def()
    }
}

impl Related<super::board::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
