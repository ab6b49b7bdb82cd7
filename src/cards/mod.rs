//! Adaptive Card builders.
//!
//! Every builder is a pure function returning the card as `serde_json::Value`
//! (schema 1.5). Only [`status::status_card`] validates its input.

pub mod config;
pub mod help;
pub mod results;
pub mod status;
pub mod task;

use crate::session::SessionStatus;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub use config::{configuration_card, configuration_error_card, configuration_success_card};
pub use help::{dialog_fallback_card, help_card};
pub use results::{results_card, results_summary_card};
pub use status::{message_input_card, session_list_card, status_card};
pub use task::{task_creation_card, task_preview_card, task_success_card, TaskForm};

pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const SCHEMA_VERSION: &str = "1.5";

pub mod icons {
    pub const SUCCESS: &str = "✅";
    pub const ERROR: &str = "❌";
    pub const WARNING: &str = "⚠️";
    pub const RUNNING: &str = "🔄";
    pub const PENDING: &str = "⏳";
    pub const CANCELLED: &str = "⏹️";
    pub const CREATE: &str = "➕";
    pub const SAVE: &str = "💾";
    pub const REFRESH: &str = "🔄";
    pub const DOWNLOAD: &str = "📥";
    pub const UPLOAD: &str = "📤";
    pub const HOME: &str = "🏠";
    pub const SETTINGS: &str = "⚙️";
    pub const GITHUB: &str = "🐙";
    pub const DEVIN: &str = "🤖";
    pub const CODE: &str = "💻";
    pub const FOLDER: &str = "📁";
    pub const LINK: &str = "🔗";
}

/// Text colour for a status.
pub fn status_color(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Running => "Default",
        SessionStatus::Completed => "Good",
        SessionStatus::Failed => "Attention",
        SessionStatus::Cancelled => "Warning",
        SessionStatus::Pending => "Accent",
    }
}

pub fn status_icon(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Running => icons::RUNNING,
        SessionStatus::Completed => icons::SUCCESS,
        SessionStatus::Failed => icons::ERROR,
        SessionStatus::Cancelled => icons::CANCELLED,
        SessionStatus::Pending => icons::PENDING,
    }
}

pub fn status_description(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Running => "In Progress",
        SessionStatus::Completed => "Finished",
        SessionStatus::Failed => "Error",
        SessionStatus::Cancelled => "Stopped",
        SessionStatus::Pending => "Waiting",
    }
}

pub fn container_style(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Completed => "good",
        SessionStatus::Failed => "attention",
        SessionStatus::Cancelled => "warning",
        SessionStatus::Running | SessionStatus::Pending => "emphasis",
    }
}

pub(crate) fn adaptive_card(body: Vec<Value>, actions: Vec<Value>) -> Value {
    json!({
        "type": "AdaptiveCard",
        "version": SCHEMA_VERSION,
        "body": body,
        "actions": actions,
    })
}

/// Icon column plus title (and optional subtitle) inside a styled container.
pub(crate) fn header(icon: &str, title: &str, subtitle: Option<&str>, style: &str, color: &str) -> Value {
    let mut text = vec![json!({
        "type": "TextBlock",
        "text": title,
        "weight": "Bolder",
        "size": "Large",
        "color": color,
    })];
    if let Some(subtitle) = subtitle {
        text.push(json!({
            "type": "TextBlock",
            "text": subtitle,
            "isSubtle": true,
            "wrap": true,
            "spacing": "None",
        }));
    }
    json!({
        "type": "Container",
        "style": style,
        "spacing": "Medium",
        "items": [{
            "type": "ColumnSet",
            "columns": [
                {
                    "type": "Column",
                    "width": "auto",
                    "items": [{ "type": "TextBlock", "text": icon, "size": "ExtraLarge" }],
                },
                { "type": "Column", "width": "stretch", "items": text },
            ],
        }],
    })
}

pub(crate) fn text(value: impl Into<String>) -> Value {
    json!({ "type": "TextBlock", "text": value.into(), "wrap": true })
}

pub(crate) fn submit(title: &str, data: Value) -> Value {
    json!({ "type": "Action.Submit", "title": title, "data": data })
}

pub(crate) fn open_url(title: &str, url: &str) -> Value {
    json!({ "type": "Action.OpenUrl", "title": title, "url": url })
}

pub(crate) fn facts(pairs: &[(&str, String)]) -> Value {
    let facts: Vec<Value> = pairs
        .iter()
        .map(|(title, value)| json!({ "title": title, "value": value }))
        .collect();
    json!({ "type": "FactSet", "facts": facts, "spacing": "Medium" })
}

/// Human-readable timestamp; unparseable input is shown as-is.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format("%b %-d, %Y %H:%M UTC").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn format_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Wrap a card as a Bot Framework attachment.
pub fn attachment(card: Value) -> Value {
    json!({ "contentType": ADAPTIVE_CARD_CONTENT_TYPE, "content": card })
}
