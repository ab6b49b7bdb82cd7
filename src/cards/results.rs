use super::{adaptive_card, facts, format_date, format_timestamp, header, icons, open_url, submit, text};
use crate::fixtures::{CompletedSession, TaskResults};
use crate::session::{SessionData, SessionStatus};
use serde_json::{json, Value};

fn change_icon(kind: &str) -> &'static str {
    match kind {
        "added" => "➕",
        "modified" => "✏️",
        "deleted" => "🗑️",
        "renamed" => "📝",
        "moved" => "📁",
        _ => "📄",
    }
}

fn file_icon(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "js" => "🟨",
        "ts" => "🔷",
        "jsx" | "tsx" => "⚛️",
        "py" => "🐍",
        "rs" => "🦀",
        "java" => "☕",
        "cpp" | "c" | "yml" | "yaml" => "⚙️",
        "html" => "🌐",
        "css" => "🎨",
        "json" => "📋",
        "md" => "📝",
        _ => "📄",
    }
}

fn file_status_color(status: &str) -> &'static str {
    match status {
        "added" => "Good",
        "modified" => "Warning",
        "deleted" => "Attention",
        _ => "Default",
    }
}

fn link_icon(kind: &str) -> &'static str {
    match kind {
        "github_pr" => "🔀",
        "deployment" => "🚀",
        "documentation" => "📚",
        "demo" => "🎬",
        "repository" => "📦",
        _ => icons::LINK,
    }
}

fn section_title(icon: &str, title: &str) -> Value {
    json!({
        "type": "TextBlock",
        "text": format!("{} **{}**", icon, title),
        "weight": "Bolder",
        "spacing": "Medium",
    })
}

/// Detailed results for one finished session.
pub fn results_card(session: &SessionData, results: &TaskResults) -> Value {
    let id = session.id.as_deref().unwrap_or("unknown");
    let mut body = vec![
        header(
            icons::SUCCESS,
            "Task Completed Successfully!",
            Some(&format!("Session {}", id)),
            "good",
            "Good",
        ),
        section_title("📋", "Task Summary"),
        facts(&[
            ("Task:", session.task.clone().unwrap_or_else(|| "No description".to_string())),
            ("Duration:", results.duration.clone().unwrap_or_else(|| "N/A".to_string())),
            (
                "Completed:",
                session
                    .completed_at
                    .as_deref()
                    .map(format_timestamp)
                    .unwrap_or_else(|| "Just now".to_string()),
            ),
            ("Files Modified:", results.files_modified.len().to_string()),
            ("Lines Changed:", results.lines_changed.to_string()),
        ]),
    ];

    if !results.code_changes.is_empty() {
        body.push(section_title(icons::CODE, "Code Changes"));
        for change in results.code_changes.iter().take(3) {
            body.push(json!({
                "type": "ColumnSet",
                "separator": true,
                "columns": [
                    { "type": "Column", "width": "auto", "items": [{ "type": "TextBlock", "text": change_icon(&change.kind) }] },
                    {
                        "type": "Column",
                        "width": "stretch",
                        "items": [
                            { "type": "TextBlock", "text": change.file, "weight": "Bolder", "size": "Small" },
                            { "type": "TextBlock", "text": change.description, "wrap": true, "size": "Small", "spacing": "None" },
                        ],
                    },
                    {
                        "type": "Column",
                        "width": "auto",
                        "items": [{
                            "type": "TextBlock",
                            "text": format!("+{}/-{}", change.additions, change.deletions),
                            "size": "Small",
                            "fontType": "Monospace",
                        }],
                    },
                ],
            }));
        }
    }

    if !results.files_modified.is_empty() {
        body.push(section_title(icons::FOLDER, "Files Modified"));
        let rows: Vec<Value> = results
            .files_modified
            .iter()
            .take(5)
            .map(|file| {
                json!({
                    "type": "ColumnSet",
                    "columns": [
                        { "type": "Column", "width": "auto", "items": [{ "type": "TextBlock", "text": file_icon(&file.name) }] },
                        { "type": "Column", "width": "stretch", "items": [{ "type": "TextBlock", "text": file.name, "size": "Small" }] },
                        {
                            "type": "Column",
                            "width": "auto",
                            "items": [{
                                "type": "TextBlock",
                                "text": file.status,
                                "size": "Small",
                                "color": file_status_color(&file.status),
                            }],
                        },
                    ],
                })
            })
            .collect();
        body.push(json!({ "type": "Container", "style": "emphasis", "items": rows }));
    }

    if !results.external_links.is_empty() {
        body.push(section_title(icons::LINK, "External Links"));
        for link in &results.external_links {
            body.push(json!({
                "type": "ColumnSet",
                "columns": [
                    { "type": "Column", "width": "auto", "items": [{ "type": "TextBlock", "text": link_icon(&link.kind) }] },
                    {
                        "type": "Column",
                        "width": "stretch",
                        "items": [
                            { "type": "TextBlock", "text": format!("[{}]({})", link.title, link.url), "wrap": true },
                            { "type": "TextBlock", "text": link.description, "isSubtle": true, "size": "Small", "spacing": "None", "wrap": true },
                        ],
                    },
                ],
            }));
        }
    }

    if let Some(summary) = &results.summary {
        body.push(json!({ "type": "TextBlock", "text": "📝 **Summary**", "spacing": "Medium" }));
        body.push(text(summary.as_str()));
    }

    let mut actions = vec![submit(
        "📊 View Details",
        json!({ "action": "view_detailed_results", "sessionId": id }),
    )];
    let link_of = |kind: &str| results.external_links.iter().find(|l| l.kind == kind);
    if let Some(pr) = link_of("github_pr") {
        actions.push(open_url("🔗 View GitHub PR", &pr.url));
    }
    if let Some(deployment) = link_of("deployment") {
        actions.push(open_url("🚀 View Deployment", &deployment.url));
    }
    actions.push(submit(
        &format!("{} Download Results", icons::DOWNLOAD),
        json!({ "action": "download_results", "sessionId": id }),
    ));
    actions.push(submit("🚀 Create New Task", json!({ "action": "create_new_task" })));
    actions.push(submit(
        &format!("{} Back to Menu", icons::HOME),
        json!({ "action": "show_help" }),
    ));

    adaptive_card(body, actions)
}

fn stat(value: String, label: &str) -> Value {
    json!({
        "type": "Column",
        "width": "stretch",
        "items": [
            { "type": "TextBlock", "text": value, "size": "ExtraLarge", "weight": "Bolder", "horizontalAlignment": "Center", "color": "Accent" },
            { "type": "TextBlock", "text": label, "size": "Small", "isSubtle": true, "horizontalAlignment": "Center", "spacing": "None" },
        ],
    })
}

/// Totals over completed sessions plus the three most recent.
pub fn results_summary_card(sessions: &[CompletedSession]) -> Value {
    let completed: Vec<&CompletedSession> = sessions
        .iter()
        .filter(|s| {
            s.session.status.as_deref().and_then(SessionStatus::from_vendor)
                == Some(SessionStatus::Completed)
        })
        .collect();
    let total_files: usize = completed.iter().map(|s| s.results.files_modified.len()).sum();
    let total_lines: u32 = completed.iter().map(|s| s.results.lines_changed).sum();

    let mut body = vec![
        json!({ "type": "TextBlock", "text": "📈 **Results Summary**", "size": "Large" }),
        json!({ "type": "TextBlock", "text": "Overview of your completed coding tasks", "isSubtle": true, "spacing": "None" }),
        json!({
            "type": "ColumnSet",
            "spacing": "Medium",
            "columns": [
                stat(completed.len().to_string(), "Tasks Completed"),
                stat(total_files.to_string(), "Files Modified"),
                stat(total_lines.to_string(), "Lines Changed"),
            ],
        }),
    ];

    if !completed.is_empty() {
        body.push(json!({ "type": "TextBlock", "text": "🏆 **Recent Completions**", "spacing": "Medium" }));
    }
    for entry in completed.iter().take(3) {
        let session = &entry.session;
        body.push(json!({
            "type": "ColumnSet",
            "separator": true,
            "columns": [
                { "type": "Column", "width": "auto", "items": [{ "type": "TextBlock", "text": icons::SUCCESS }] },
                {
                    "type": "Column",
                    "width": "stretch",
                    "items": [
                        { "type": "TextBlock", "text": session.task.as_deref().unwrap_or("No description"), "wrap": true, "size": "Small", "weight": "Bolder" },
                        {
                            "type": "TextBlock",
                            "text": session.completed_at.as_deref().map(format_date).unwrap_or_else(|| "Recently".to_string()),
                            "size": "Small",
                            "isSubtle": true,
                            "spacing": "None",
                        },
                    ],
                },
                {
                    "type": "Column",
                    "width": "auto",
                    "items": [{
                        "type": "TextBlock",
                        "text": format!("{} files", entry.results.files_modified.len()),
                        "size": "Small",
                    }],
                },
            ],
            "selectAction": {
                "type": "Action.Submit",
                "data": { "action": "view_detailed_results", "sessionId": session.id },
            },
        }));
    }

    let actions = vec![
        submit("📊 View All Results", json!({ "action": "view_all_results" })),
        submit("📈 Export Report", json!({ "action": "export_results_report" })),
        submit("🚀 Create New Task", json!({ "action": "create_new_task" })),
    ];
    adaptive_card(body, actions)
}
