//! Team domain types
//!
//! Team members are invited by email, hold a permission level, and become
//! active once the invitation token is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission level for a team member
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TeamPermission {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl TeamPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "editor" => Self::Editor,
            "admin" => Self::Admin,
            _ => Self::Viewer,
        }
    }
}

/// Membership lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Active,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            _ => Self::Pending,
        }
    }
}

/// Request DTO for inviting a member
#[derive(Debug, Clone, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
    #[serde(default)]
    pub permission: TeamPermission,
}

/// Request DTO for updating a member's permission
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRequest {
    pub permission: TeamPermission,
}

/// Request DTO for accepting an invitation
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
}

/// Response DTO for team member
#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberResponse {
    pub id: Uuid,
    pub email: String,
    pub member_user_id: Option<Uuid>,
    pub permission: TeamPermission,
    pub status: MemberStatus,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}
