//! Wire types for the HTTP surfaces.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Explicit function invocation accepted by the development endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    /// Arguments as JSON text; clients send either a string or an object.
    pub fn arguments_json(&self) -> String {
        match &self.arguments {
            Value::String(raw) => raw.clone(),
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        }
    }
}

/// Copilot Extension request body.
///
/// Messages are kept as raw JSON so they can be forwarded to the completion
/// endpoint unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CopilotPayload {
    #[serde(default)]
    pub messages: Vec<Value>,
    /// Only honoured in development mode.
    #[serde(default)]
    pub tool_call: Option<ToolCallRequest>,
}

impl CopilotPayload {
    /// Payload used in development mode when the body is not valid JSON.
    pub fn fallback() -> Self {
        Self {
            messages: vec![json!({
                "role": "user",
                "content": "list all available agents",
                "name": "test-user",
            })],
            tool_call: None,
        }
    }

    /// Caller identity: the `name` of the first message.
    pub fn user_name(&self) -> Option<&str> {
        self.messages
            .first()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Text of the most recent message.
    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accessors() {
        let payload: CopilotPayload = serde_json::from_value(json!({
            "messages": [
                { "role": "user", "content": "hi", "name": "octocat" },
                { "role": "assistant", "content": null },
                { "role": "user", "content": "list agents" }
            ]
        }))
        .unwrap();
        assert_eq!(payload.user_name(), Some("octocat"));
        assert_eq!(payload.last_content(), "list agents");

        let empty = CopilotPayload::default();
        assert_eq!(empty.user_name(), None);
        assert_eq!(empty.last_content(), "");
        assert_eq!(CopilotPayload::fallback().user_name(), Some("test-user"));
    }

    #[test]
    fn tool_call_arguments_accept_string_or_object() {
        let call: ToolCallRequest =
            serde_json::from_value(json!({ "name": "getAgentStatus", "arguments": { "agentId": "qa-agent" } }))
                .unwrap();
        assert_eq!(call.arguments_json(), r#"{"agentId":"qa-agent"}"#);

        let call: ToolCallRequest =
            serde_json::from_value(json!({ "name": "listAgents" })).unwrap();
        assert_eq!(call.arguments_json(), "{}");
    }
}
