//! Competitor domain types
//!
//! A competitor is a tracked rival site; analysis snapshots are produced by
//! the crawler service and stored in `competitor_data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Analysis status for a competitor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompetitorStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CompetitorStatus {
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
}

/// Request DTO for adding a competitor to a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompetitorRequest {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response DTO for competitor
#[derive(Debug, Clone, Serialize)]
pub struct CompetitorResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub url: String,
    pub name: Option<String>,
    pub status: CompetitorStatus,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One stored analysis snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CompetitorSnapshot {
    pub id: Uuid,
    pub competitor_id: Uuid,
    pub snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
