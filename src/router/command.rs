//! Slash command parsing.

/// A chat message parsed into one command. Matching is by exact first token,
/// so `/github-status` never falls into `/github`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// `/config` without a complete `set-` form
    ShowConfig,
    /// `/config set-<option> <value>`; `option` keeps the text after `set-`
    SetConfig { option: String, value: String },
    Devin { task: Option<String> },
    DevinStatus { session_id: Option<String> },
    DevinMessage {
        session_id: Option<String>,
        message: Option<String>,
    },
    Github { task: Option<String> },
    GithubStatus { task_id: Option<String> },
    GithubAction {
        repository: Option<String>,
        workflow: Option<String>,
        task: Option<String>,
    },
    Codex { task: Option<String> },
    CodexStatus { task_id: Option<String> },
    CodexTrigger {
        task_id: Option<String>,
        task: Option<String>,
    },
    Help,
    Unknown(String),
}

/// Split off the first whitespace-delimited token; the rest is trimmed.
fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim()),
        None => (text, ""),
    }
}

fn opt(value: &str) -> Option<String> {
    crate::util::non_empty(Some(value)).map(str::to_string)
}

impl SlashCommand {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (head, rest) = split_token(text);
        match head {
            "/config" => {
                let (option, value) = split_token(rest);
                match (option.strip_prefix("set-"), opt(value)) {
                    (Some(option), Some(value)) => SlashCommand::SetConfig {
                        option: option.to_string(),
                        value,
                    },
                    _ => SlashCommand::ShowConfig,
                }
            }
            "/devin" => SlashCommand::Devin { task: opt(rest) },
            "/devin-status" => {
                let (id, _) = split_token(rest);
                let id = id.strip_prefix("devin-").unwrap_or(id);
                SlashCommand::DevinStatus {
                    session_id: opt(id),
                }
            }
            "/devin-message" => {
                let (id, message) = split_token(rest);
                SlashCommand::DevinMessage {
                    session_id: opt(id),
                    message: opt(message),
                }
            }
            "/github" => SlashCommand::Github { task: opt(rest) },
            "/github-status" => SlashCommand::GithubStatus {
                task_id: opt(split_token(rest).0),
            },
            "/github-action" => {
                let (repository, rest) = split_token(rest);
                let (workflow, task) = split_token(rest);
                SlashCommand::GithubAction {
                    repository: opt(repository),
                    workflow: opt(workflow),
                    task: opt(task),
                }
            }
            "/codex" => SlashCommand::Codex { task: opt(rest) },
            "/codex-status" => SlashCommand::CodexStatus {
                task_id: opt(split_token(rest).0),
            },
            "/codex-trigger" => {
                let (id, task) = split_token(rest);
                SlashCommand::CodexTrigger {
                    task_id: opt(id),
                    task: opt(task),
                }
            }
            "/help" => SlashCommand::Help,
            "help" if rest.is_empty() => SlashCommand::Help,
            _ => SlashCommand::Unknown(text.to_string()),
        }
    }
}
