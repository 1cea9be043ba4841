//! Sync error classification
//!
//! Failures from the Jira API are classified so the sync engine can decide
//! between refreshing credentials, backing off, and giving up for the cycle.

use crate::jira::client::ClientError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Token was rejected; the engine may refresh once and retry the pass.
    Unauthorized,
    /// Remote asked us to slow down.
    RateLimited { retry_after_secs: Option<u64> },
    /// Something that may succeed on a later cycle.
    Transient,
    /// A bug or bad data; retrying will not help.
    Permanent,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct SyncError {
    pub kind: SyncErrorKind,
    pub message: String,
    /// HTTP status that produced this error, when one exists.
    pub status: Option<u16>,
}

impl SyncError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: SyncErrorKind::Unauthorized,
            message: message.into(),
            status: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: SyncErrorKind::Permanent,
            message: message.into(),
            status: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SyncErrorKind::Transient,
            message: message.into(),
            status: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == SyncErrorKind::Unauthorized
    }
}

impl From<ClientError> for SyncError {
    fn from(err: ClientError) -> Self {
        let status = match &err {
            ClientError::Status { status, .. } => Some(status.as_u16()),
            _ => None,
        };
        let kind = match &err {
            ClientError::Status { status, .. } => match status.as_u16() {
                401 => SyncErrorKind::Unauthorized,
                429 => SyncErrorKind::RateLimited {
                    retry_after_secs: None,
                },
                s if s >= 500 => SyncErrorKind::Transient,
                _ => SyncErrorKind::Permanent,
            },
            ClientError::Timeout { .. } | ClientError::Network { .. } => SyncErrorKind::Transient,
            ClientError::Decode { .. } => SyncErrorKind::Permanent,
        };
        Self {
            kind,
            message: err.to_string(),
            status,
        }
    }
}
