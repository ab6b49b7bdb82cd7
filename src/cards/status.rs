use super::{
    adaptive_card, container_style, facts, format_date, format_timestamp, header, icons,
    status_color, status_description, status_icon, submit,
};
use crate::session::{InvalidSession, SessionData, SessionRecord, SessionStatus};
use serde_json::{json, Value};

const LIST_LIMIT: usize = 5;

/// Status card for one session. Fails when `id`, `status`, `task` or
/// `created_at` is missing.
pub fn status_card(data: SessionData) -> Result<Value, InvalidSession> {
    let session = SessionRecord::try_from(data)?;
    Ok(render_status(&session))
}

fn render_status(session: &SessionRecord) -> Value {
    let status = session.status;
    let color = status.map(status_color).unwrap_or("Default");
    let mut body = vec![json!({
        "type": "Container",
        "style": status.map(container_style).unwrap_or("default"),
        "spacing": "Medium",
        "items": [{
            "type": "ColumnSet",
            "columns": [
                {
                    "type": "Column",
                    "width": "auto",
                    "items": [{
                        "type": "TextBlock",
                        "text": status.map(status_icon).unwrap_or("❓"),
                        "size": "ExtraLarge",
                        "horizontalAlignment": "Center",
                    }],
                },
                {
                    "type": "Column",
                    "width": "stretch",
                    "items": [
                        {
                            "type": "TextBlock",
                            "text": "Session Status",
                            "weight": "Bolder",
                            "size": "Large",
                            "color": color,
                        },
                        {
                            "type": "TextBlock",
                            "text": format!("Session {}", session.id),
                            "isSubtle": true,
                            "spacing": "None",
                        },
                    ],
                },
                {
                    "type": "Column",
                    "width": "auto",
                    "items": [
                        {
                            "type": "TextBlock",
                            "text": session.status_label.to_uppercase(),
                            "weight": "Bolder",
                            "color": color,
                            "horizontalAlignment": "Right",
                        },
                        {
                            "type": "TextBlock",
                            "text": status.map(status_description).unwrap_or("Reported by vendor"),
                            "size": "Small",
                            "isSubtle": true,
                            "horizontalAlignment": "Right",
                            "spacing": "None",
                        },
                    ],
                },
            ],
        }],
    })];

    let mut rows = vec![
        ("Session ID:", session.id.clone()),
        ("Task:", session.task.clone()),
        ("Status:", session.status_label.clone()),
        ("Created:", format_timestamp(&session.created_at)),
        (
            "Last Updated:",
            session
                .updated_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "N/A".to_string()),
        ),
    ];
    if let Some(progress) = session.progress {
        rows.push(("Progress:", format!("{}%", progress)));
    }
    if let Some(detail) = &session.detail {
        rows.push(("Details:", detail.clone()));
    }
    body.push(facts(&rows));

    if let Some(error) = &session.error {
        body.push(json!({
            "type": "Container",
            "style": "attention",
            "spacing": "Medium",
            "items": [{
                "type": "ColumnSet",
                "columns": [
                    {
                        "type": "Column",
                        "width": "auto",
                        "items": [{ "type": "TextBlock", "text": icons::WARNING, "color": "Attention" }],
                    },
                    {
                        "type": "Column",
                        "width": "stretch",
                        "items": [
                            { "type": "TextBlock", "text": "Error Details", "weight": "Bolder", "color": "Attention" },
                            { "type": "TextBlock", "text": error, "wrap": true, "color": "Attention", "spacing": "Small" },
                        ],
                    },
                ],
            }],
        }));
    }

    if !session.logs.is_empty() {
        let recent = &session.logs[session.logs.len().saturating_sub(3)..];
        body.push(json!({
            "type": "TextBlock",
            "text": "📝 **Recent Activity:**",
            "weight": "Bolder",
            "spacing": "Medium",
        }));
        body.push(json!({
            "type": "TextBlock",
            "text": recent.join("\n"),
            "wrap": true,
            "spacing": "Small",
            "fontType": "Monospace",
        }));
    }

    let session_ref = |action: &str| json!({ "action": action, "sessionId": session.id });
    let mut actions = vec![submit(
        &format!("{} Refresh Status", icons::REFRESH),
        session_ref("refresh_status"),
    )];
    // Mutating actions only while the session is live.
    if status == Some(SessionStatus::Running) {
        actions.push(submit("💬 Send Message", session_ref("send_message")));
        actions.push(submit("⏹️ Cancel Session", session_ref("cancel_session")));
    }
    actions.push(submit("📋 View Logs", session_ref("view_logs")));
    actions.push(submit(
        &format!("{} Back to Menu", icons::HOME),
        json!({ "action": "show_help" }),
    ));

    adaptive_card(body, actions)
}

/// Compact list of sessions; the first five are shown.
pub fn session_list_card(sessions: &[SessionData]) -> Value {
    let count = sessions.len();
    let mut body = vec![
        header("📊", "Your Devin Sessions", None, "emphasis", "Accent"),
        json!({
            "type": "TextBlock",
            "text": format!("You have {} session{}", count, if count == 1 { "" } else { "s" }),
            "isSubtle": true,
            "spacing": "Medium",
        }),
    ];

    if sessions.is_empty() {
        body.push(json!({
            "type": "TextBlock",
            "text": "No sessions found. Create your first session with `/devin <task>`",
            "wrap": true,
            "spacing": "Medium",
            "horizontalAlignment": "Center",
        }));
    }

    for session in sessions.iter().take(LIST_LIMIT) {
        let status = session.status.as_deref().and_then(SessionStatus::from_vendor);
        let id = session.id.as_deref().unwrap_or("unknown");
        body.push(json!({
            "type": "ColumnSet",
            "spacing": "Medium",
            "separator": true,
            "columns": [
                {
                    "type": "Column",
                    "width": "auto",
                    "items": [{
                        "type": "TextBlock",
                        "text": status.map(status_icon).unwrap_or("❓"),
                        "size": "Medium",
                    }],
                },
                {
                    "type": "Column",
                    "width": "stretch",
                    "items": [
                        { "type": "TextBlock", "text": id, "weight": "Bolder", "size": "Small" },
                        {
                            "type": "TextBlock",
                            "text": session.task.as_deref().unwrap_or("No description"),
                            "wrap": true,
                            "maxLines": 2,
                            "size": "Small",
                            "spacing": "None",
                        },
                    ],
                },
                {
                    "type": "Column",
                    "width": "auto",
                    "items": [
                        {
                            "type": "TextBlock",
                            "text": status.map(|s| s.as_str().to_uppercase()).unwrap_or_else(|| "UNKNOWN".to_string()),
                            "weight": "Bolder",
                            "color": status.map(status_color).unwrap_or("Default"),
                            "size": "Small",
                            "horizontalAlignment": "Right",
                        },
                        {
                            "type": "TextBlock",
                            "text": session.created_at.as_deref().map(format_date).unwrap_or_else(|| "Unknown".to_string()),
                            "size": "Small",
                            "isSubtle": true,
                            "horizontalAlignment": "Right",
                            "spacing": "None",
                        },
                    ],
                },
            ],
            "selectAction": {
                "type": "Action.Submit",
                "data": { "action": "view_session_status", "sessionId": id },
            },
        }));
    }

    let mut actions = vec![submit(
        "🚀 Create New Session",
        json!({ "action": "create_new_task" }),
    )];
    if count > LIST_LIMIT {
        actions.push(submit(
            "📋 View All Sessions",
            json!({ "action": "view_all_sessions" }),
        ));
    }
    actions.push(submit(
        "🔄 Refresh List",
        json!({ "action": "refresh_session_list" }),
    ));

    adaptive_card(body, actions)
}

pub fn message_input_card(session_id: &str) -> Value {
    let body = vec![
        header("💬", "Send Message to Devin", None, "emphasis", "Accent"),
        json!({
            "type": "TextBlock",
            "text": format!("Session: {}", session_id),
            "isSubtle": true,
            "spacing": "Medium",
        }),
        json!({
            "type": "Input.Text",
            "id": "message",
            "label": "Your Message",
            "placeholder": "Type your message to Devin here...",
            "isMultiline": true,
            "maxLength": 2000,
            "isRequired": true,
            "errorMessage": "Please enter a message to send",
        }),
    ];
    let actions = vec![
        submit(
            &format!("{} Send Message", icons::UPLOAD),
            json!({ "action": "send_message_submit", "sessionId": session_id }),
        ),
        submit(
            "❌ Cancel",
            json!({ "action": "view_session_status", "sessionId": session_id }),
        ),
    ];
    adaptive_card(body, actions)
}
