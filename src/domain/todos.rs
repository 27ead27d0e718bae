//! Todo domain types
//!
//! Todos are task items generated from audit recommendations or created
//! manually. Batch operations partition the requested ids into owned and
//! not-owned subsets; only the owned subset is ever mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Todo status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// Todo priority enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TodoPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

/// Request DTO for creating a todo
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub audit_id: Option<Uuid>,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default)]
    pub priority: TodoPriority,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Request DTO for updating a todo
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TodoStatus>,
    #[serde(default)]
    pub priority: Option<TodoPriority>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Query params for listing todos
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TodoQuery {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<TodoStatus>,
    #[serde(default)]
    pub priority: Option<TodoPriority>,
}

/// Response DTO for todo
#[derive(Debug, Clone, Serialize)]
pub struct TodoResponse {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub audit_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Batch operations
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BatchAssignRequest {
    pub todo_ids: Vec<Uuid>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchDeleteRequest {
    pub todo_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchStatusRequest {
    pub todo_ids: Vec<Uuid>,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchDueDateRequest {
    pub todo_ids: Vec<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Outcome of a batch mutation: which ids were touched and which were
/// rejected because the caller does not own them
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub success: bool,
    pub updated: Vec<Uuid>,
    pub unauthorized: Vec<Uuid>,
}

/// Split requested ids into (owned, unauthorized), preserving request order
/// and dropping duplicates
pub fn partition_owned(requested: &[Uuid], owned: &HashSet<Uuid>) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut seen = HashSet::new();
    let mut mine = Vec::new();
    let mut other = Vec::new();

    for id in requested {
        if !seen.insert(*id) {
            continue;
        }
        if owned.contains(id) {
            mine.push(*id);
        } else {
            other.push(*id);
        }
    }

    (mine, other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_separates_owned_from_unauthorized() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let owned: HashSet<Uuid> = [a, c].into_iter().collect();

        let (mine, other) = partition_owned(&[a, b, c], &owned);
        assert_eq!(mine, vec![a, c]);
        assert_eq!(other, vec![b]);
    }

    #[test]
    fn partition_drops_duplicates_and_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let owned: HashSet<Uuid> = [a].into_iter().collect();

        let (mine, other) = partition_owned(&[b, a, a, b], &owned);
        assert_eq!(mine, vec![a]);
        assert_eq!(other, vec![b]);
    }

    #[test]
    fn partition_of_empty_request_is_empty() {
        let owned: HashSet<Uuid> = HashSet::new();
        let (mine, other) = partition_owned(&[], &owned);
        assert!(mine.is_empty());
        assert!(other.is_empty());
    }
}
