//! Domain model: user and task records, the closed status set, and the
//! status transition table.
//!
//! Serialized field names stay camelCase (`photoUrl`, `createdBy`,
//! `adminComment`) so state exported from the original browser deployment
//! loads unchanged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Generate a new ULID string. Time-ordered, unique within the process.
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// Account role. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

// ─── TaskStatus ──────────────────────────────────────────────────────────────

/// The finite set of states a task can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Submitted,
    Approved,
    Rejected,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the owner may still edit content and progress.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in-progress" => Ok(Self::InProgress),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// Valid task status transitions. Everything else is rejected by the engine.
///
/// `rejected → pending` is the reopen edge: the owner may take a rejected
/// task back into editing and resubmit. `approved` is terminal.
pub fn valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (InProgress, Pending)
            | (Pending, Submitted)
            | (InProgress, Submitted)
            | (Submitted, Approved)
            | (Submitted, Rejected)
            | (Rejected, Pending)
    )
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub mobile: String,
    pub role: Role,
    pub photo_url: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Always within 0..=100; the engine clamps every write path.
    pub progress: u8,
    pub deadline: NaiveDate,
    pub status: TaskStatus,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,
}

/// Fields a caller supplies when creating a task. Everything else
/// (id, status, progress, owner) is engine-assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub photos: Vec<String>,
}

// ─── Seed data ───────────────────────────────────────────────────────────────

/// Demo accounts seeded on first run.
pub fn seed_users() -> Vec<User> {
    vec![
        User {
            id: "1".to_string(),
            name: "Admin User".to_string(),
            mobile: "+1234567890".to_string(),
            role: Role::Admin,
            photo_url: "/placeholder.svg".to_string(),
        },
        User {
            id: "2".to_string(),
            name: "Regular User".to_string(),
            mobile: "+0987654321".to_string(),
            role: Role::User,
            photo_url: "/placeholder.svg".to_string(),
        },
    ]
}

/// Sample tasks seeded on first run, owned by the regular demo user.
pub fn seed_tasks() -> Vec<Task> {
    let seed = |id: &str, title: &str, description: &str, progress: u8, deadline: (i32, u32, u32), status: TaskStatus| Task {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        progress,
        deadline: NaiveDate::from_ymd_opt(deadline.0, deadline.1, deadline.2).unwrap_or_default(),
        status,
        photos: Vec::new(),
        created_by: "2".to_string(),
        admin_comment: None,
    };
    vec![
        seed("1", "Project Docs", "Write them up.", 75, (2025, 4, 20), TaskStatus::InProgress),
        seed("2", "Landing Page Design", "Create mockups.", 30, (2025, 4, 30), TaskStatus::Pending),
        seed("3", "Review Pull Requests", "Check recent code.", 100, (2025, 4, 15), TaskStatus::Submitted),
    ]
}

// ─── Tests ───────────────────────────────────────────────────────────────────
