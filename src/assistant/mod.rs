//! Agent functions exposed to chat assistants.
//!
//! The Copilot Extension offers five functions to the model (see
//! [`tool_definitions`]). Each one renders a markdown answer; errors are part
//! of the answer rather than a failed request.

pub mod intent;

pub use intent::match_intent;

use crate::agents::{AgentRegistry, DispatchError, Dispatcher};
use crate::user_config::{ConfigField, ConfigPatch};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Shown when a development-mode message matches no function.
pub const DEV_MODE_HELP: &str = "🤖 **AGU Extension (Development Mode)**\n\nAvailable commands:\n- Ask to 'list all available agents'\n- Ask about 'configuration'\n- Try 'assign task to swe-agent: fix the login bug'\n\nThis is running in development mode for local testing.";

const PRIORITIES: [&str; 4] = ["low", "medium", "high", "urgent"];

/// One invocation of an assistant function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantCall {
    ListAgents,
    ConfigureAgent {
        option: String,
        value: String,
    },
    ShowConfiguration,
    AssignTask {
        agent_id: String,
        task: String,
        priority: Option<String>,
    },
    GetAgentStatus {
        agent_id: String,
    },
}

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("❌ Unknown function: {0}")]
    UnknownFunction(String),

    #[error("❌ Error processing function call")]
    InvalidArguments {
        function: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct ConfigureArgs {
    option: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignArgs {
    agent_id: String,
    task: String,
    #[serde(default)]
    priority: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusArgs {
    agent_id: String,
}

impl AssistantCall {
    /// Build a call from a model tool call; `arguments` is the raw JSON text.
    pub fn from_tool_call(name: &str, arguments: &str) -> Result<Self, ToolCallError> {
        fn parse<T: serde::de::DeserializeOwned>(
            name: &str,
            arguments: &str,
        ) -> Result<T, ToolCallError> {
            serde_json::from_str(arguments).map_err(|source| ToolCallError::InvalidArguments {
                function: name.to_string(),
                source,
            })
        }

        match name {
            "listAgents" => Ok(AssistantCall::ListAgents),
            "showConfiguration" => Ok(AssistantCall::ShowConfiguration),
            "configureAgent" => {
                let args: ConfigureArgs = parse(name, arguments)?;
                Ok(AssistantCall::ConfigureAgent {
                    option: args.option,
                    value: args.value,
                })
            }
            "assignTask" => {
                let args: AssignArgs = parse(name, arguments)?;
                Ok(AssistantCall::AssignTask {
                    agent_id: args.agent_id,
                    task: args.task,
                    priority: args.priority,
                })
            }
            "getAgentStatus" => {
                let args: StatusArgs = parse(name, arguments)?;
                Ok(AssistantCall::GetAgentStatus {
                    agent_id: args.agent_id,
                })
            }
            other => Err(ToolCallError::UnknownFunction(other.to_string())),
        }
    }
}

/// OpenAI-style `tools` array describing the five functions.
pub fn tool_definitions() -> Value {
    let agent_ids = AgentRegistry.ids();
    let options: Vec<&str> = ConfigField::ALL.iter().map(|f| f.option_name()).collect();
    let function = |name: &str, description: &str, parameters: Value| {
        json!({
            "type": "function",
            "function": { "name": name, "description": description, "parameters": parameters },
        })
    };
    let no_parameters = || json!({ "type": "object", "properties": {}, "required": [] });

    json!([
        function("listAgents", "List all available AGU agents", no_parameters()),
        function(
            "configureAgent",
            "Configure AGU agent API keys and settings",
            json!({
                "type": "object",
                "properties": {
                    "option": {
                        "type": "string",
                        "description": "Configuration option to set",
                        "enum": options,
                    },
                    "value": {
                        "type": "string",
                        "description": "The value to set for the configuration option",
                    },
                },
                "required": ["option", "value"],
            }),
        ),
        function(
            "showConfiguration",
            "Show current AGU configuration status and help",
            no_parameters(),
        ),
        function(
            "assignTask",
            "Assign a task to the selected AGU agent",
            json!({
                "type": "object",
                "properties": {
                    "agentId": {
                        "type": "string",
                        "description": "The ID of the agent to assign the task to",
                        "enum": agent_ids,
                    },
                    "task": {
                        "type": "string",
                        "description": "The task description to assign to the agent",
                    },
                    "priority": {
                        "type": "string",
                        "description": "Task priority level",
                        "enum": PRIORITIES,
                    },
                },
                "required": ["agentId", "task"],
            }),
        ),
        function(
            "getAgentStatus",
            "Get the current status of an AGU agent",
            json!({
                "type": "object",
                "properties": {
                    "agentId": {
                        "type": "string",
                        "description": "The ID of the agent to check status for",
                        "enum": agent_ids,
                    },
                },
                "required": ["agentId"],
            }),
        ),
    ])
}

fn not_found(agent_id: &str) -> String {
    format!(
        "❌ Agent with ID \"{}\" not found. Use `listAgents` to see available agents.",
        agent_id
    )
}

#[derive(Clone)]
pub struct Assistant {
    dispatcher: Dispatcher,
}

impl Assistant {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn run(&self, user_id: &str, call: AssistantCall) -> String {
        match call {
            AssistantCall::ListAgents => self.list_agents(),
            AssistantCall::ConfigureAgent { option, value } => {
                self.configure_agent(user_id, &option, &value).await
            }
            AssistantCall::ShowConfiguration => self.show_configuration(user_id).await,
            AssistantCall::AssignTask {
                agent_id,
                task,
                priority,
            } => {
                self.assign_task(user_id, &agent_id, &task, priority.as_deref())
                    .await
            }
            AssistantCall::GetAgentStatus { agent_id } => {
                self.get_agent_status(user_id, &agent_id).await
            }
        }
    }

    /// Run a model tool call, rendering argument errors as the answer.
    pub async fn run_tool_call(&self, user_id: &str, name: &str, arguments: &str) -> String {
        match AssistantCall::from_tool_call(name, arguments) {
            Ok(call) => self.run(user_id, call).await,
            Err(e) => {
                tracing::warn!(function = name, "Rejected tool call: {:?}", e);
                e.to_string()
            }
        }
    }

    /// Answer a plain chat message via intent matching.
    pub async fn respond_to_text(&self, user_id: &str, text: &str) -> String {
        match match_intent(text) {
            Some(call) => self.run(user_id, call).await,
            None => DEV_MODE_HELP.to_string(),
        }
    }

    pub fn list_agents(&self) -> String {
        let agents = self
            .dispatcher
            .registry()
            .list_agents()
            .iter()
            .map(|agent| {
                format!(
                    "**{}** (`{}`)\n{}\nCapabilities: {}",
                    agent.name,
                    agent.id,
                    agent.description,
                    agent.capabilities.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "## 🤖 Available AGU Agents\n\n{}\n\nUse `assignTask` to assign tasks to agents or `configureAgent` to set up API keys.",
            agents
        )
    }

    pub async fn configure_agent(&self, user_id: &str, option: &str, value: &str) -> String {
        let Some(field) = ConfigField::from_option(option) else {
            return format!(
                "❌ **Unknown configuration option:** {}\n\n**Available options:**\n\
                 - `devin-key` - Set Devin API key for SWE Agent\n\
                 - `github-token` - Set GitHub token for repository access\n\
                 - `azure-key` - Set Azure OpenAI API key for Codex agents\n\
                 - `azure-endpoint` - Set Azure OpenAI endpoint for Codex agents\n\
                 - `github-repo` - Set default GitHub repository (format: owner/repo)\n\n\
                 **Get your API keys from:**\n\
                 - Devin: https://app.devin.ai/settings/api-keys\n\
                 - GitHub: https://github.com/settings/tokens\n\
                 - Azure OpenAI: Azure Portal",
                option
            );
        };
        let value = value.trim();
        if value.is_empty() {
            return format!("❌ Please provide a value for `{}`.", field.option_name());
        }
        if let Err(e) = self
            .dispatcher
            .update_config(user_id, ConfigPatch::single(field, value))
            .await
        {
            return format!("❌ **Error saving configuration:** {}", e);
        }
        match field {
            ConfigField::DevinKey => "✅ **Devin API key configured successfully!**\n\nYou can now use the Software Engineering Agent (swe-agent) for code reviews, bug fixes, and development tasks.".to_string(),
            ConfigField::GithubToken => "✅ **GitHub token configured successfully!**\n\nYou can now use agents that require GitHub access (QA Agent, DevOps Agent, SRE Agent).".to_string(),
            ConfigField::AzureKey => "✅ **Azure OpenAI API key configured successfully!**\n\nMake sure to also set the azure-endpoint for full Codex agent functionality.".to_string(),
            ConfigField::AzureEndpoint => "✅ **Azure OpenAI endpoint configured successfully!**\n\nMake sure you have also set the azure-key for full Codex agent functionality.".to_string(),
            ConfigField::GithubRepo => format!(
                "✅ **GitHub repository configured successfully!**\n\nDefault repository set to: {}\n\nThis will be used for agent tasks that require repository access.",
                value
            ),
        }
    }

    pub async fn show_configuration(&self, user_id: &str) -> String {
        let mut out = String::from("## 🔧 **AGU Configuration Status**\n\n");
        match self.dispatcher.config(user_id).await {
            Ok(Some(config)) => {
                out.push_str("**Current Configuration:**\n");
                for field in ConfigField::ALL {
                    let state = match (field, config.get(field)) {
                        (ConfigField::GithubRepo, Some(repo)) => format!("✅ {}", repo),
                        (_, Some(_)) => "✅ Configured".to_string(),
                        (_, None) => "❌ Not set".to_string(),
                    };
                    out.push_str(&format!("- {}: {}\n", field.label(), state));
                }
                out.push('\n');
            }
            Ok(None) => out.push_str("❌ **No configuration found**\n\n"),
            Err(e) => out.push_str(&format!("❌ **Could not load configuration:** {}\n\n", e)),
        }
        out.push_str("**To configure options, use:**\n");
        out.push_str("- `configureAgent` with option `devin-key` and your Devin API key\n");
        out.push_str("- `configureAgent` with option `github-token` and your GitHub token\n");
        out.push_str("- `configureAgent` with option `azure-key` and your Azure OpenAI API key\n");
        out.push_str(
            "- `configureAgent` with option `azure-endpoint` and your Azure OpenAI endpoint\n",
        );
        out.push_str(
            "- `configureAgent` with option `github-repo` and your repository (owner/repo)\n\n",
        );
        out.push_str("**Get your API keys from:**\n");
        out.push_str("- **Devin:** https://app.devin.ai/settings/api-keys\n");
        out.push_str("- **GitHub:** https://github.com/settings/tokens\n");
        out.push_str("- **Azure OpenAI:** Azure Portal");
        out
    }

    pub async fn assign_task(
        &self,
        user_id: &str,
        agent_id: &str,
        task: &str,
        priority: Option<&str>,
    ) -> String {
        let priority = crate::util::non_empty(priority).unwrap_or("medium");
        match self.dispatcher.assign(agent_id, user_id, task).await {
            Ok((agent, handle)) => {
                let mut out = format!(
                    "🚀 **Task Assigned Successfully!**\n\n**Agent:** {}\n**Task:** {}\n**Priority:** {}\n**Task ID:** {}\n**Status:** {}",
                    agent.name,
                    task.trim(),
                    priority,
                    handle.id,
                    handle.status
                );
                if let Some(url) = &handle.url {
                    out.push_str(&format!("\n**URL:** {}", url));
                }
                out.push_str("\n\nThe agent is now working on this task. Use `getAgentStatus` to check progress.");
                out
            }
            Err(DispatchError::AgentNotFound(id)) => not_found(&id),
            Err(e) => format!(
                "❌ **Error assigning task:** {}\n\nUse `configureAgent` to set up required API keys and configuration.",
                e
            ),
        }
    }

    pub async fn get_agent_status(&self, user_id: &str, agent_id: &str) -> String {
        let status = match self.dispatcher.agent_status(agent_id, user_id).await {
            Ok(status) => status,
            Err(DispatchError::AgentNotFound(id)) => return not_found(&id),
            Err(e) => return format!("❌ **Error checking agent status:** {}", e),
        };
        let name = status.agent.name;
        if !status.has_config {
            return format!(
                "📊 **{} Status**\n\n❌ Not configured. Use `configureAgent` to set up API keys first.",
                name
            );
        }
        let configuration = if status.missing.is_empty() {
            "✅ Configured".to_string()
        } else {
            let missing: Vec<&str> = status.missing.iter().map(|f| f.label()).collect();
            format!("❌ Missing: {}", missing.join(", "))
        };
        format!(
            "📊 **{} Status**\n\n**Configuration:** {}\n**Type:** {}\n**Last Activity:** {}\n\nUse `assignTask` to create new tasks for this agent.",
            name,
            configuration,
            status.agent.vendor,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{Call, RecordingFactory};
    use crate::user_config::InMemoryUserConfigStore;
    use std::sync::Arc;

    fn assistant() -> (Assistant, Arc<RecordingFactory>) {
        let factory = Arc::new(RecordingFactory::default());
        let dispatcher = Dispatcher::new(Arc::new(InMemoryUserConfigStore::new()), factory.clone());
        (Assistant::new(dispatcher), factory)
    }

    #[test]
    fn tool_call_parsing() {
        assert_eq!(
            AssistantCall::from_tool_call(
                "assignTask",
                r#"{"agentId":"qa-agent","task":"add tests","priority":"high"}"#
            )
            .unwrap(),
            AssistantCall::AssignTask {
                agent_id: "qa-agent".to_string(),
                task: "add tests".to_string(),
                priority: Some("high".to_string()),
            }
        );
        assert_eq!(
            AssistantCall::from_tool_call("listAgents", "").unwrap(),
            AssistantCall::ListAgents
        );
        assert_eq!(
            AssistantCall::from_tool_call("deleteRepo", "{}")
                .unwrap_err()
                .to_string(),
            "❌ Unknown function: deleteRepo"
        );
        assert_eq!(
            AssistantCall::from_tool_call("getAgentStatus", "{not json")
                .unwrap_err()
                .to_string(),
            "❌ Error processing function call"
        );
    }

    #[test]
    fn tool_definitions_list_five_functions() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "listAgents",
                "configureAgent",
                "showConfiguration",
                "assignTask",
                "getAgentStatus"
            ]
        );
        assert_eq!(
            tools[3]["function"]["parameters"]["properties"]["agentId"]["enum"][0],
            "swe-agent"
        );
    }

    #[test]
    fn list_agents_renders_every_agent() {
        let (assistant, _) = assistant();
        let text = assistant.list_agents();
        assert!(text.starts_with("## 🤖 Available AGU Agents"));
        assert!(text.contains("**DevOps Agent** (`devops-agent`)"));
    }

    #[tokio::test]
    async fn assign_task_flow() {
        let (assistant, factory) = assistant();
        let text = assistant
            .assign_task("u1", "swe-agent", "fix the login bug", None)
            .await;
        assert!(text.starts_with("❌ **Error assigning task:** Devin is not configured"));
        assert!(factory.calls().is_empty());

        assistant.configure_agent("u1", "devin-key", "ABC123XYZ").await;
        let text = assistant
            .assign_task("u1", "swe-agent", "fix the login bug", None)
            .await;
        assert!(text.contains("**Priority:** medium"));
        assert!(text.contains("**Task ID:** s-1"));
        assert!(text.contains("**URL:** https://app.devin.ai/sessions/s-1"));
        assert_eq!(factory.calls(), vec![Call::Create("fix the login bug".to_string())]);

        let text = assistant.assign_task("u1", "ghost", "x", None).await;
        assert_eq!(
            text,
            "❌ Agent with ID \"ghost\" not found. Use `listAgents` to see available agents."
        );
    }

    #[tokio::test]
    async fn configuration_status() {
        let (assistant, _) = assistant();
        assert!(assistant
            .show_configuration("u1")
            .await
            .contains("❌ **No configuration found**"));
        assert!(assistant
            .get_agent_status("u1", "qa-agent")
            .await
            .contains("❌ Not configured."));

        let reply = assistant
            .configure_agent("u1", "github-repo", "octo/demo")
            .await;
        assert!(reply.contains("Default repository set to: octo/demo"));
        let text = assistant.show_configuration("u1").await;
        assert!(text.contains("- GitHub Repository: ✅ octo/demo"));
        assert!(text.contains("- Devin API Key: ❌ Not set"));

        let status = assistant.get_agent_status("u1", "sre-agent").await;
        assert!(status.contains("**Configuration:** ❌ Missing: GitHub Token, Azure OpenAI API Key"));
        assert!(status.contains("**Type:** codex"));
    }

    #[tokio::test]
    async fn unknown_option_lists_choices() {
        let (assistant, _) = assistant();
        let text = assistant.configure_agent("u1", "colour", "blue").await;
        assert!(text.starts_with("❌ **Unknown configuration option:** colour"));
    }

    #[tokio::test]
    async fn free_text_falls_back_to_help() {
        let (assistant, _) = assistant();
        assert_eq!(assistant.respond_to_text("u1", "hi").await, DEV_MODE_HELP);
        assert!(assistant
            .respond_to_text("u1", "list all available agents")
            .await
            .contains("Available AGU Agents"));
    }
}
