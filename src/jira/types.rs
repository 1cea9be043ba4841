//! Wire types for the Jira Agile REST API

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Generic paginated envelope used by the board and sprint listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub is_last: bool,
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    pub total: Option<u64>,
}

/// The board issue listing uses a different envelope, terminated by `total`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePage {
    #[serde(default = "Vec::new")]
    pub issues: Vec<IssueSummary>,
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSummary {
    pub id: i64,
    pub name: String,
    pub state: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub complete_date: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueSummary {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub issuetype: Option<NamedField>,
    pub status: Option<IssueStatus>,
    pub priority: Option<NamedField>,
    pub assignee: Option<AssigneeSummary>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedField {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStatus {
    pub name: Option<String>,
    pub status_category: Option<NamedField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeSummary {
    pub account_id: String,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    pub avatar_urls: Option<AvatarUrls>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarUrls {
    #[serde(rename = "48x48")]
    pub large: Option<String>,
}

impl IssueFields {
    /// Missing issue type collapses to "Unknown".
    pub fn issue_type_name(&self) -> String {
        self.issuetype
            .as_ref()
            .and_then(|t| t.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Missing status collapses to "Unknown".
    pub fn status_name(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn status_category_name(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|s| s.status_category.as_ref())
            .and_then(|c| c.name.clone())
    }

    pub fn priority_name(&self) -> Option<String> {
        self.priority.as_ref().and_then(|p| p.name.clone())
    }
}

impl AssigneeSummary {
    /// Missing display name collapses to "Unknown".
    pub fn display_name_or_unknown(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.avatar_urls.as_ref().and_then(|a| a.large.clone())
    }
}

/// Parse a Jira timestamp; anything unparsable becomes None rather than
/// failing the sync.
pub fn parse_date(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_rfc3339() {
        let parsed = parse_date(Some("2025-11-10T09:30:00.000+00:00"));
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_date_jira_offset_format() {
        // Jira omits the colon in the offset
        let parsed = parse_date(Some("2025-11-10T09:30:00.000+0200"));
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_date_garbage_is_none() {
        assert!(parse_date(Some("next tuesday")).is_none());
        assert!(parse_date(Some("")).is_none());
        assert!(parse_date(None).is_none());
    }

    #[test]
    fn test_issue_fields_defaults() {
        let fields = IssueFields::default();
        assert_eq!(fields.issue_type_name(), "Unknown");
        assert_eq!(fields.status_name(), "Unknown");
        assert!(fields.status_category_name().is_none());
        assert!(fields.priority_name().is_none());
    }

    #[test]
    fn test_assignee_display_name_fallback() {
        let assignee = AssigneeSummary {
            account_id: "abc123".to_string(),
            display_name: None,
            email_address: None,
            avatar_urls: None,
            active: None,
        };
        assert_eq!(assignee.display_name_or_unknown(), "Unknown");
    }

    #[test]
    fn test_issue_page_deserializes() {
        let page: IssuePage = serde_json::from_str(
            r#"{"issues":[{"id":"10001","key":"PROJ-1","fields":{"summary":"Fix login","issuetype":{"name":"Bug"},"status":{"name":"In Progress","statusCategory":{"name":"In Progress"}}}}],"startAt":0,"maxResults":50,"total":1}"#,
        )
        .unwrap();
        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.issues[0].fields.issue_type_name(), "Bug");
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_board_page_deserializes() {
        let page: PageResponse<BoardSummary> = serde_json::from_str(
            r#"{"values":[{"id":1,"name":"Team Alpha","type":"scrum"}],"isLast":true,"startAt":0,"maxResults":50}"#,
        )
        .unwrap();
        assert!(page.is_last);
        assert_eq!(page.values[0].board_type.as_deref(), Some("scrum"));
    }
}
