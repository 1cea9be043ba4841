//! # Jira Dashboard Sync
//!
//! Background service that mirrors Jira Cloud boards, sprints, issues and
//! assignees into a local database for every connected site. OAuth tokens
//! are held encrypted at rest and refreshed automatically when they expire.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod jira;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod sync;
pub mod telemetry;
pub mod token_refresh;

pub use migration;
