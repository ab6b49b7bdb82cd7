//! Task module dialogs (`task/fetch` and `task/submit`).

use super::action::CredentialPair;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    ConfigureDevin,
    CreateTask,
    #[serde(other)]
    Unknown,
}

impl DialogKind {
    /// Read the dialog kind requested by `task/fetch` data.
    pub fn requested(data: &Value) -> Self {
        data.get("opendialogtype")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(DialogKind::Unknown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DialogTask {
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "submissiondialogtype", rename_all = "snake_case")]
pub enum DialogSubmission {
    ConfigureDevin(CredentialPair),
    CreateTask(DialogTask),
    #[serde(other)]
    Unknown,
}

impl DialogSubmission {
    pub fn from_value(data: &Value) -> Self {
        serde_json::from_value(data.clone()).unwrap_or(DialogSubmission::Unknown)
    }
}

/// `task/fetch` response opening a dialog with `card`.
pub fn continue_response(title: &str, card: Value) -> Value {
    json!({
        "task": {
            "type": "continue",
            "value": {
                "title": title,
                "card": crate::cards::attachment(card),
            },
        },
    })
}

/// `task/submit` response closing the dialog with `message`.
pub fn message_response(message: &str) -> Value {
    json!({ "task": { "type": "message", "value": message } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_kinds() {
        assert_eq!(
            DialogKind::requested(&json!({ "opendialogtype": "create_task" })),
            DialogKind::CreateTask
        );
        assert_eq!(
            DialogKind::requested(&json!({ "opendialogtype": "webhooks" })),
            DialogKind::Unknown
        );
        assert_eq!(DialogKind::requested(&json!({})), DialogKind::Unknown);
    }

    #[test]
    fn submissions() {
        let submission = DialogSubmission::from_value(&json!({
            "submissiondialogtype": "configure_devin",
            "devin_key": "devin-key-123",
            "github_token": "ghp_abcdefgh"
        }));
        match submission {
            DialogSubmission::ConfigureDevin(pair) => {
                assert_eq!(pair.both(), Some(("devin-key-123", "ghp_abcdefgh")))
            }
            other => panic!("unexpected submission: {:?}", other),
        }
        assert_eq!(
            DialogSubmission::from_value(&json!({ "task_description": "x" })),
            DialogSubmission::Unknown
        );
    }

    #[test]
    fn response_shapes() {
        let open = continue_response("Create Coding Task", json!({ "type": "AdaptiveCard" }));
        assert_eq!(open["task"]["type"], "continue");
        assert_eq!(
            open["task"]["value"]["card"]["contentType"],
            crate::cards::ADAPTIVE_CARD_CONTENT_TYPE
        );
        assert_eq!(
            message_response("Configuration completed"),
            json!({ "task": { "type": "message", "value": "Configuration completed" } })
        );
    }
}
