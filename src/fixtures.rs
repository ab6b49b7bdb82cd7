//! Placeholder session and result data.
//!
//! Vendors do not yet expose session listings or file-level results, so the
//! bot shows these fixed samples. Timestamps are relative to "now".

use crate::session::SessionData;
use chrono::{Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub name: String,
    /// `added`, `modified` or `deleted`
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeChange {
    pub kind: String,
    pub file: String,
    pub description: String,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalLink {
    /// `github_pr`, `deployment`, `documentation`, ...
    pub kind: String,
    pub title: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResults {
    pub duration: Option<String>,
    pub files_modified: Vec<FileChange>,
    pub lines_changed: u32,
    pub code_changes: Vec<CodeChange>,
    pub external_links: Vec<ExternalLink>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedSession {
    pub session: SessionData,
    pub results: TaskResults,
}

fn hours_ago(hours: i64) -> String {
    (Utc::now() - Duration::hours(hours)).to_rfc3339()
}

fn file(name: &str, status: &str) -> FileChange {
    FileChange {
        name: name.to_string(),
        status: status.to_string(),
    }
}

fn summary(id: &str, task: &str, status: &str, created_hours_ago: i64) -> SessionData {
    SessionData {
        id: Some(id.to_string()),
        task: Some(task.to_string()),
        status: Some(status.to_string()),
        created_at: Some(hours_ago(created_hours_ago)),
        ..Default::default()
    }
}

/// Sessions shown by "view all sessions".
pub fn sample_sessions() -> Vec<SessionData> {
    vec![
        summary("session-001", "Create a React todo app", "completed", 24),
        summary("session-002", "Fix authentication bug", "running", 1),
    ]
}

/// Detailed results shown for a single session.
pub fn sample_results() -> TaskResults {
    TaskResults {
        duration: Some("2h 15m".to_string()),
        files_modified: vec![
            file("src/components/TodoList.tsx", "added"),
            file("src/styles/main.css", "modified"),
            file("package.json", "modified"),
        ],
        lines_changed: 247,
        code_changes: vec![
            CodeChange {
                kind: "added".to_string(),
                file: "src/components/TodoList.tsx".to_string(),
                description: "Created new React component with drag-and-drop functionality"
                    .to_string(),
                additions: 89,
                deletions: 0,
            },
            CodeChange {
                kind: "modified".to_string(),
                file: "src/styles/main.css".to_string(),
                description: "Added styling for todo list component".to_string(),
                additions: 45,
                deletions: 12,
            },
        ],
        external_links: vec![
            ExternalLink {
                kind: "github_pr".to_string(),
                title: "Add TodoList component with drag-and-drop".to_string(),
                url: "https://github.com/example/repo/pull/123".to_string(),
                description: "Pull request with the implemented changes".to_string(),
            },
            ExternalLink {
                kind: "deployment".to_string(),
                title: "Preview Deployment".to_string(),
                url: "https://preview-abc123.vercel.app".to_string(),
                description: "Live preview of the changes".to_string(),
            },
        ],
        summary: Some(
            "Successfully implemented a React TodoList component with drag-and-drop functionality. \
             The component includes proper TypeScript types, responsive styling, and comprehensive \
             error handling."
                .to_string(),
        ),
    }
}

/// Completed sessions shown by "view all results".
pub fn sample_completed_sessions() -> Vec<CompletedSession> {
    let completed = |id: &str,
                     task: &str,
                     created: i64,
                     finished: i64,
                     files: Vec<FileChange>,
                     lines: u32| {
        let mut session = summary(id, task, "completed", created);
        session.completed_at = Some(hours_ago(finished));
        CompletedSession {
            session,
            results: TaskResults {
                duration: None,
                files_modified: files,
                lines_changed: lines,
                code_changes: Vec::new(),
                external_links: Vec::new(),
                summary: None,
            },
        }
    };
    vec![
        completed(
            "session-001",
            "Create a React todo app with drag-and-drop",
            24,
            23,
            vec![
                file("src/components/TodoList.tsx", "added"),
                file("src/styles/main.css", "modified"),
            ],
            247,
        ),
        completed(
            "session-003",
            "Implement user authentication system",
            48,
            47,
            vec![
                file("src/auth/AuthProvider.tsx", "added"),
                file("src/components/LoginForm.tsx", "added"),
                file("src/utils/api.ts", "modified"),
            ],
            156,
        ),
    ]
}
