//! Session/task records reported by vendor agents.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of session states shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    /// Map a vendor status string (Devin, GitHub Actions, local stubs) onto
    /// the closed set. Returns `None` for strings no vendor is known to send.
    pub fn from_vendor(raw: &str) -> Option<Self> {
        let status = match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" | "waiting" | "requested" | "suspended" | "suspend_requested"
            | "resume_requested" | "workflow_created" => SessionStatus::Pending,
            "running" | "working" | "blocked" | "resumed" | "in_progress" | "triggered" => {
                SessionStatus::Running
            }
            "completed" | "finished" | "success" | "succeeded" => SessionStatus::Completed,
            "failed" | "failure" | "error" | "not_found" | "timed_out" => SessionStatus::Failed,
            "cancelled" | "canceled" | "expired" | "stopped" => SessionStatus::Cancelled,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal sessions get no mutating actions in the UI.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSession {
    #[error("Session data is required")]
    Missing,

    #[error("Session {0} is required")]
    MissingField(&'static str),
}

/// Loosely-typed session payload as received from a vendor or a card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    /// Free-text progress note
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A validated session: the four required fields are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: String,
    /// `None` when the vendor sent a status outside the closed set
    pub status: Option<SessionStatus>,
    /// What users see: the mapped status name, or the vendor's own string
    pub status_label: String,
    pub task: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub completed_at: Option<String>,
    pub progress: Option<u8>,
    pub detail: Option<String>,
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub url: Option<String>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, InvalidSession> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(InvalidSession::MissingField(name))
}

impl TryFrom<SessionData> for SessionRecord {
    type Error = InvalidSession;

    fn try_from(data: SessionData) -> Result<Self, Self::Error> {
        let id = required(data.id, "ID")?;
        let raw_status = required(data.status, "status")?;
        let task = required(data.task, "task")?;
        let created_at = required(data.created_at, "created_at")?;
        let status = SessionStatus::from_vendor(&raw_status);
        let status_label = match status {
            Some(status) => status.as_str().to_string(),
            None => raw_status.trim().to_string(),
        };

        Ok(Self {
            id,
            status,
            status_label,
            task,
            created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
            progress: data.progress.map(|p| p.clamp(0.0, 100.0).round() as u8),
            detail: data.detail,
            error: data.error.filter(|e| !e.trim().is_empty()),
            logs: data.logs.unwrap_or_default(),
            url: data.url,
        })
    }
}

impl SessionRecord {
    /// Validate an optional payload, distinguishing "no data" from bad data.
    pub fn from_optional(data: Option<SessionData>) -> Result<Self, InvalidSession> {
        data.ok_or(InvalidSession::Missing)?.try_into()
    }
}
