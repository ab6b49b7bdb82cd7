use super::{adaptive_card, header, icons, open_url, submit, text};
use serde_json::{json, Value};

fn command_group(icon: &str, title: &str, commands: &str) -> Value {
    json!({
        "type": "ColumnSet",
        "spacing": "Medium",
        "columns": [
            { "type": "Column", "width": "auto", "items": [{ "type": "TextBlock", "text": icon, "size": "Large" }] },
            {
                "type": "Column",
                "width": "stretch",
                "items": [
                    { "type": "TextBlock", "text": format!("**{}**", title) },
                    { "type": "TextBlock", "text": commands, "wrap": true, "spacing": "Small" },
                ],
            },
        ],
    })
}

pub fn help_card() -> Value {
    let body = vec![
        header(
            icons::DEVIN,
            "Coding Agent Teams App",
            Some("Interact with AI coding agents like Devin directly from Microsoft Teams!"),
            "emphasis",
            "Accent",
        ),
        header("🚀", "Available Commands", None, "default", "Default"),
        json!({
            "type": "Container",
            "style": "emphasis",
            "items": [
                command_group(
                    icons::SETTINGS,
                    "Configuration",
                    "`/config` - Configure your API keys and tokens\n`/config set-<option> <value>` - Set devin-key, github-token, azure-key, azure-endpoint or github-repo",
                ),
                command_group(
                    icons::DEVIN,
                    "Devin Commands",
                    "`/devin` - Create a new coding task with rich dialog\n`/devin-status <session-id>` - Check session status\n`/devin-message <session-id> <message>` - Send message to Devin",
                ),
                command_group(
                    icons::GITHUB,
                    "GitHub Commands",
                    "`/github <task>` - Copilot coding agent (preview)\n`/github-status <task-id>` - Check Copilot task status\n`/github-action <repo> <workflow> <task>` - Trigger GitHub Action",
                ),
                command_group(
                    "🧠",
                    "Codex Commands",
                    "`/codex <task>` - Create a Codex workflow task\n`/codex-status <task-id>` - Check task status\n`/codex-trigger <task-id> [task]` - Run the workflow",
                ),
            ],
        }),
        header("🎯", "Getting Started", None, "default", "Default"),
        json!({
            "type": "Container",
            "style": "good",
            "items": [
                { "type": "TextBlock", "text": "**Step 1:** Get your API keys" },
                text("• Devin API key: [app.devin.ai/settings/api-keys](https://app.devin.ai/settings/api-keys)\n• GitHub token: [github.com/settings/tokens](https://github.com/settings/tokens)"),
                { "type": "TextBlock", "text": "**Step 2:** Configure your keys", "spacing": "Medium" },
                text("Use the `/config` command to securely store your API keys"),
                { "type": "TextBlock", "text": "**Step 3:** Start coding!", "spacing": "Medium" },
                text("Use `/devin` to create coding tasks with our rich dialog interface"),
            ],
        }),
        header("💡", "Examples", None, "default", "Default"),
        json!({
            "type": "Container",
            "style": "attention",
            "items": [text("`/devin` → Opens rich task creation dialog\n`/devin-status session-123` → Shows detailed status card\n`/github Create a login system` → GitHub coding task (preview)")],
        }),
    ];
    let actions = vec![
        submit(
            &format!("{} Configure Now", icons::SETTINGS),
            json!({ "action": "show_config" }),
        ),
        submit(
            &format!("{} Create Task", icons::CREATE),
            json!({ "action": "create_new_task" }),
        ),
        submit("📊 View Sessions", json!({ "action": "view_all_sessions" })),
        open_url("📚 Learn More", "https://docs.devin.ai/api-reference/overview"),
    ];
    adaptive_card(body, actions)
}

/// Single-line card used when a dialog cannot be opened.
pub fn dialog_fallback_card(message: &str) -> Value {
    json!({
        "type": "AdaptiveCard",
        "version": "1.5",
        "body": [{
            "type": "TextBlock",
            "text": format!("{} {}", icons::ERROR, message),
            "weight": "Bolder",
            "color": "Attention",
        }],
    })
}
