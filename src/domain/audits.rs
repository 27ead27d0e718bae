//! Audit domain types
//!
//! An audit is a stored scan result for a project's URL. The crawler service
//! owns the scan itself and reports status over a webhook; this module owns
//! the status vocabulary translation and the CSV rendering of a report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Translate the crawler service's status vocabulary onto ours.
    ///
    /// The crawler has drifted between releases, so several synonyms map to
    /// each local status. Unknown values are rejected rather than guessed.
    pub fn from_crawler(s: &str) -> Option<Self> {
        match s {
            "queued" | "pending" | "accepted" => Some(Self::Pending),
            "crawling" | "running" | "in_progress" | "processing" => Some(Self::Processing),
            "done" | "complete" | "completed" | "success" => Some(Self::Completed),
            "error" | "failed" | "timeout" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Request DTO for starting an audit
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateAuditRequest {
    /// Crawl depth and similar knobs, forwarded opaquely to the crawler
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

/// Response DTO for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub url: String,
    pub status: AuditStatus,
    pub score: Option<i32>,
    pub report: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Webhook payload posted by the crawler service on status changes
#[derive(Debug, Clone, Deserialize)]
pub struct AuditWebhookPayload {
    pub audit_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub report: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A single issue inside an audit report payload.
///
/// Reports are stored as opaque JSONB; this is the lenient projection used
/// for CSV export and todo generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportIssue {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Extract the issue list from a stored report, tolerating missing fields
pub fn report_issues(report: &serde_json::Value) -> Vec<ReportIssue> {
    report
        .get("issues")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Extract the recommendation strings from a stored report
pub fn report_recommendations(report: &serde_json::Value) -> Vec<String> {
    report
        .get("recommendations")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Render an audit summary plus its issues as a CSV document
pub fn render_csv(audit: &AuditResponse) -> String {
    let mut out = String::new();

    out.push_str("audit_id,url,status,score,created_at\n");
    out.push_str(&format!(
        "{},{},{},{},{}\n",
        audit.id,
        csv_escape(&audit.url),
        audit.status.as_str(),
        audit
            .score
            .map(|s| s.to_string())
            .unwrap_or_default(),
        audit.created_at.to_rfc3339(),
    ));

    out.push('\n');
    out.push_str("category,severity,title,description,page_url\n");

    if let Some(report) = &audit.report {
        for issue in report_issues(report) {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_escape(issue.category.as_deref().unwrap_or("")),
                csv_escape(issue.severity.as_deref().unwrap_or("")),
                csv_escape(&issue.title),
                csv_escape(issue.description.as_deref().unwrap_or("")),
                csv_escape(issue.url.as_deref().unwrap_or("")),
            ));
        }
    }

    out
}

/// Quote a CSV field when it contains a delimiter, quote, or newline
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn crawler_status_vocabulary_maps_onto_local_enum() {
        assert_eq!(AuditStatus::from_crawler("queued"), Some(AuditStatus::Pending));
        assert_eq!(
            AuditStatus::from_crawler("crawling"),
            Some(AuditStatus::Processing)
        );
        assert_eq!(
            AuditStatus::from_crawler("done"),
            Some(AuditStatus::Completed)
        );
        assert_eq!(AuditStatus::from_crawler("error"), Some(AuditStatus::Failed));
        assert_eq!(AuditStatus::from_crawler("exploded"), None);
    }

    #[test]
    fn report_issue_extraction_tolerates_sparse_entries() {
        let report = json!({
            "issues": [
                {"title": "Missing meta description", "severity": "high"},
                {"no_title": true},
                {"title": "Broken link", "url": "https://example.com/a"}
            ]
        });

        let issues = report_issues(&report);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].title, "Missing meta description");
        assert_eq!(issues[1].url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn recommendations_default_to_empty() {
        assert!(report_recommendations(&json!({})).is_empty());
        assert_eq!(
            report_recommendations(&json!({"recommendations": ["Add alt text"]})),
            vec!["Add alt text".to_string()]
        );
    }

    #[test]
    fn csv_escapes_embedded_delimiters() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_contains_summary_and_issue_rows() {
        let audit = AuditResponse {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            url: "https://example.com".to_string(),
            status: AuditStatus::Completed,
            score: Some(87),
            report: Some(json!({
                "issues": [{"title": "Slow page, needs work", "category": "performance"}]
            })),
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let csv = render_csv(&audit);
        assert!(csv.starts_with("audit_id,url,status,score,created_at\n"));
        assert!(csv.contains("completed,87"));
        assert!(csv.contains("performance,,\"Slow page, needs work\""));
    }
}
