//! Free-text intent matching for chats that arrive without a tool call.

use super::AssistantCall;
use crate::agents::AgentRegistry;
use crate::user_config::ConfigField;
use regex::Regex;
use std::sync::OnceLock;

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(source) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid intent pattern {}: {}", source, e);
            None
        }
    })
    .as_ref()
}

fn assign_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(
        &CELL,
        r"(?is)assign\s+(?:a\s+)?task\s+to\s+([a-z0-9_-]+)\s*:\s*(.+)",
    )
}

fn configure_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(
        &CELL,
        r"(?i)^\s*(?:configure|set)\s+([a-z-]+)\s+(?:to\s+)?(\S+)\s*$",
    )
}

/// Map a chat message onto one assistant function, if any matches.
pub fn match_intent(text: &str) -> Option<AssistantCall> {
    let lower = text.to_lowercase();

    if let Some(caps) = assign_pattern().and_then(|re| re.captures(text)) {
        return Some(AssistantCall::AssignTask {
            agent_id: caps[1].to_lowercase(),
            task: caps[2].trim().to_string(),
            priority: None,
        });
    }

    if let Some(caps) = configure_pattern().and_then(|re| re.captures(text)) {
        if ConfigField::from_option(&caps[1]).is_some() {
            return Some(AssistantCall::ConfigureAgent {
                option: caps[1].to_lowercase(),
                value: caps[2].to_string(),
            });
        }
    }

    if lower.contains("list") && lower.contains("agent") {
        return Some(AssistantCall::ListAgents);
    }

    if lower.contains("status") {
        if let Some(agent) = AgentRegistry
            .list_agents()
            .iter()
            .find(|agent| lower.contains(agent.id))
        {
            return Some(AssistantCall::GetAgentStatus {
                agent_id: agent.id.to_string(),
            });
        }
    }

    if lower.contains("config") {
        return Some(AssistantCall::ShowConfiguration);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_and_config() {
        assert_eq!(
            match_intent("list all available agents"),
            Some(AssistantCall::ListAgents)
        );
        assert_eq!(
            match_intent("what is my configuration?"),
            Some(AssistantCall::ShowConfiguration)
        );
        assert_eq!(match_intent("hello there"), None);
    }

    #[test]
    fn assign_task_phrase() {
        assert_eq!(
            match_intent("Assign task to swe-agent: fix the login bug"),
            Some(AssistantCall::AssignTask {
                agent_id: "swe-agent".to_string(),
                task: "fix the login bug".to_string(),
                priority: None,
            })
        );
    }

    #[test]
    fn configure_known_option_only() {
        assert_eq!(
            match_intent("configure github-repo to octo/demo"),
            Some(AssistantCall::ConfigureAgent {
                option: "github-repo".to_string(),
                value: "octo/demo".to_string(),
            })
        );
        assert_eq!(
            match_intent("configure colour blue"),
            Some(AssistantCall::ShowConfiguration)
        );
    }

    #[test]
    fn status_needs_agent_id() {
        assert_eq!(
            match_intent("status of qa-agent please"),
            Some(AssistantCall::GetAgentStatus {
                agent_id: "qa-agent".to_string()
            })
        );
        assert_eq!(match_intent("status?"), None);
    }
}
