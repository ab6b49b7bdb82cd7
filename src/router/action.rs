//! Typed card actions.
//!
//! Adaptive Card submits carry their discriminant in `data.action`. The
//! payload is validated into a [`CardAction`] before anything is dispatched.

use crate::cards::TaskForm;
use crate::user_config::{ConfigField, ConfigPatch};
use crate::util::{non_empty, SECRET_MASK};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("No action specified in the request.")]
    NoAction,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid data for action {action}: {message}")]
    InvalidInput { action: String, message: String },
}

/// Reference to a session carried by status, results and log actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionRef {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

impl SessionRef {
    pub fn id(&self) -> Option<&str> {
        non_empty(self.session_id.as_deref())
    }
}

/// Submitted configuration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigForm {
    #[serde(default)]
    pub devin_api_key: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub azure_open_ai_api_key: Option<String>,
    #[serde(default)]
    pub azure_open_ai_endpoint: Option<String>,
    #[serde(default)]
    pub github_repo: Option<String>,
}

/// Minimum length accepted for keys and tokens entered in the form.
pub const MIN_SECRET_LEN: usize = 10;

impl ConfigForm {
    /// Trimmed value of a form field. Blank values and the mask echoed back
    /// from a stored secret count as absent.
    fn value(&self, field: ConfigField) -> Option<&str> {
        let raw = match field {
            ConfigField::DevinKey => &self.devin_api_key,
            ConfigField::GithubToken => &self.github_token,
            ConfigField::AzureKey => &self.azure_open_ai_api_key,
            ConfigField::AzureEndpoint => &self.azure_open_ai_endpoint,
            ConfigField::GithubRepo => &self.github_repo,
        };
        non_empty(raw.as_deref()).filter(|v| !(field.is_secret() && *v == SECRET_MASK))
    }

    /// Validate and turn the form into a patch. `Ok(None)` when nothing was
    /// entered.
    pub fn to_patch(&self) -> Result<Option<ConfigPatch>, String> {
        if let Some(key) = self.value(ConfigField::DevinKey) {
            if key.chars().count() < MIN_SECRET_LEN {
                return Err(
                    "Devin API key appears to be too short. Please check your key and try again."
                        .to_string(),
                );
            }
        }
        if let Some(token) = self.value(ConfigField::GithubToken) {
            if token.chars().count() < MIN_SECRET_LEN {
                return Err(
                    "GitHub token appears to be too short. Please check your token and try again."
                        .to_string(),
                );
            }
        }

        let mut patch = ConfigPatch::default();
        for field in ConfigField::ALL {
            if let Some(value) = self.value(field) {
                patch.set(field, value);
            }
        }
        Ok((!patch.is_empty()).then_some(patch))
    }
}

/// Devin key and GitHub token pair from the quick configuration dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialPair {
    #[serde(default)]
    pub devin_key: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
}

impl CredentialPair {
    pub fn both(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(self.devin_key.as_deref())?,
            non_empty(self.github_token.as_deref())?,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageForm {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CardAction {
    ShowConfig,
    SaveConfig(ConfigForm),
    SaveConfiguration(CredentialPair),
    ShowStatus,
    ShowHelp,
    CreateNewTask,
    PreviewTask(TaskForm),
    CreateTask(TaskForm),
    ConfirmCreateTask(TaskForm),
    EditTask,
    CancelTask,
    CheckStatus(SessionRef),
    ViewSessionStatus(SessionRef),
    RefreshStatus(SessionRef),
    SendMessage(SessionRef),
    SendMessageSubmit(MessageForm),
    CancelSession(SessionRef),
    ViewLogs(SessionRef),
    ViewAllSessions,
    RefreshSessionList,
    ViewDetailedResults(SessionRef),
    DownloadResults(SessionRef),
    ViewAllResults,
    ExportResultsReport,
    #[serde(other)]
    Unknown,
}

impl CardAction {
    /// Parse `data` from a card submit.
    pub fn from_value(data: &Value) -> Result<Self, ActionError> {
        let name = data
            .get("action")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .ok_or(ActionError::NoAction)?;
        match serde_json::from_value(data.clone()) {
            Ok(CardAction::Unknown) => Err(ActionError::UnknownAction(name.to_string())),
            Ok(action) => Ok(action),
            Err(e) => Err(ActionError::InvalidInput {
                action: name.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_payloads() {
        assert_eq!(
            CardAction::from_value(&json!({ "action": "check_status", "sessionId": "s-1" })),
            Ok(CardAction::CheckStatus(SessionRef {
                session_id: Some("s-1".to_string())
            }))
        );
        assert_eq!(
            CardAction::from_value(&json!({ "action": "show_help", "extra": 1 })),
            Ok(CardAction::ShowHelp)
        );
    }

    #[test]
    fn missing_and_unknown_actions() {
        assert_eq!(CardAction::from_value(&json!({})), Err(ActionError::NoAction));
        assert_eq!(
            CardAction::from_value(&json!({ "action": "" })),
            Err(ActionError::NoAction)
        );
        assert_eq!(
            CardAction::from_value(&json!({ "action": "launch_rockets" })),
            Err(ActionError::UnknownAction("launch_rockets".to_string()))
        );
    }

    #[test]
    fn malformed_payload_is_invalid_input() {
        let err = CardAction::from_value(&json!({ "action": "check_status", "sessionId": 7 }))
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidInput { action, .. } if action == "check_status"));
    }

    #[test]
    fn config_form_ignores_mask_and_blank() {
        let form = ConfigForm {
            devin_api_key: Some(SECRET_MASK.to_string()),
            github_token: Some("ghp_1234567890".to_string()),
            azure_open_ai_endpoint: Some("  ".to_string()),
            github_repo: Some("octo/demo".to_string()),
            ..Default::default()
        };
        let patch = form.to_patch().unwrap().unwrap();
        assert_eq!(patch.fields(), vec![ConfigField::GithubToken, ConfigField::GithubRepo]);
    }

    #[test]
    fn config_form_rejects_short_secrets() {
        let form = ConfigForm {
            devin_api_key: Some("short".to_string()),
            ..Default::default()
        };
        assert!(form.to_patch().unwrap_err().starts_with("Devin API key appears to be too short"));
        assert_eq!(ConfigForm::default().to_patch(), Ok(None));
    }

    #[test]
    fn config_form_reads_camel_case() {
        let action = CardAction::from_value(&json!({
            "action": "save_config",
            "azureOpenAiApiKey": "azure-key-123",
        }))
        .unwrap();
        match action {
            CardAction::SaveConfig(form) => {
                assert_eq!(form.azure_open_ai_api_key.as_deref(), Some("azure-key-123"))
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }
}
