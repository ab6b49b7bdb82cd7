use super::{adaptive_card, header, icons, open_url, submit, text};
use crate::user_config::{ConfigField, UserConfig};
use crate::util::SECRET_MASK;
use serde_json::{json, Value};

fn section(icon: &str, title: &str) -> Value {
    header(icon, title, None, "default", "Default")
}

fn input(id: &str, label: &str, placeholder: &str, value: String, secret: bool) -> Value {
    let mut field = json!({
        "type": "Input.Text",
        "id": id,
        "label": label,
        "placeholder": placeholder,
        "value": value,
    });
    if secret {
        field["style"] = json!("Password");
    }
    field
}

fn link_row(prompt: &str, title: &str, url: &str) -> Value {
    json!({
        "type": "ColumnSet",
        "columns": [
            { "type": "Column", "width": "stretch", "items": [text(prompt)] },
            {
                "type": "Column",
                "width": "auto",
                "items": [{ "type": "ActionSet", "actions": [open_url(title, url)] }],
            },
        ],
    })
}

/// Configuration form. Stored secrets appear only as a mask.
pub fn configuration_card(current: Option<&UserConfig>) -> Value {
    let masked = |field: ConfigField| {
        if current.map(|c| c.has(field)).unwrap_or(false) {
            SECRET_MASK.to_string()
        } else {
            String::new()
        }
    };
    let plain = |field: ConfigField| {
        current
            .and_then(|c| c.get(field))
            .unwrap_or_default()
            .to_string()
    };

    let mut body = vec![
        header(
            icons::SETTINGS,
            "Configuration Settings",
            Some("Configure your API keys and tokens to start using coding agents"),
            "emphasis",
            "Accent",
        ),
        section(icons::GITHUB, "GitHub Copilot Configuration"),
        link_row(
            "Get your token from:",
            "🔗 Open GitHub Token Settings",
            "https://github.com/settings/tokens",
        ),
        input(
            "githubToken",
            "GitHub Copilot Token",
            "Enter your GitHub token",
            masked(ConfigField::GithubToken),
            true,
        ),
        section("🧠", "Azure OpenAI Configuration (for Codex-CLI)"),
        link_row(
            "Get your API key from:",
            "🔗 Open Azure OpenAI Portal",
            "https://portal.azure.com/#view/Microsoft_Azure_ProjectOxford/CognitiveServicesHub/~/OpenAI",
        ),
        input(
            "azureOpenAiApiKey",
            "Azure OpenAI API Key",
            "Enter your Azure OpenAI API key",
            masked(ConfigField::AzureKey),
            true,
        ),
        input(
            "azureOpenAiEndpoint",
            "Azure OpenAI Endpoint (Optional)",
            "https://your-resource.openai.azure.com/",
            plain(ConfigField::AzureEndpoint),
            false,
        ),
        section(icons::FOLDER, "Repository Configuration"),
        input(
            "githubRepo",
            "GitHub Repository (for Codex-CLI)",
            "owner/repository-name",
            plain(ConfigField::GithubRepo),
            false,
        ),
        section(icons::DEVIN, "Devin API Configuration"),
        link_row(
            "Get your API key from:",
            "🔗 Open Devin API Settings",
            "https://app.devin.ai/settings/api-keys",
        ),
        input(
            "devinApiKey",
            "Devin API Key",
            "Enter your Devin API key",
            masked(ConfigField::DevinKey),
            true,
        ),
    ];

    if let Some(config) = current {
        let line = |label: &str, field: ConfigField| {
            let state = if config.has(field) {
                "✅ Configured"
            } else {
                "❌ Not configured"
            };
            json!({ "type": "TextBlock", "text": format!("{}: {}", label, state), "spacing": "Small" })
        };
        body.push(json!({
            "type": "Container",
            "style": "good",
            "spacing": "Medium",
            "items": [
                { "type": "TextBlock", "text": "📊 Current Status", "weight": "Bolder" },
                line("Devin API", ConfigField::DevinKey),
                line("GitHub Copilot", ConfigField::GithubToken),
                line("Azure OpenAI", ConfigField::AzureKey),
                line("GitHub Repo", ConfigField::GithubRepo),
            ],
        }));
    }

    let actions = vec![
        submit(
            &format!("{} Save Configuration", icons::SAVE),
            json!({ "action": "save_config" }),
        ),
        submit("📋 Show Current Status", json!({ "action": "show_status" })),
        submit("❓ Help", json!({ "action": "show_help" })),
    ];
    adaptive_card(body, actions)
}

pub fn configuration_success_card(message: &str) -> Value {
    adaptive_card(
        vec![header(
            icons::SUCCESS,
            "Configuration Updated",
            Some(message),
            "good",
            "Good",
        )],
        vec![submit("⚙️ Configure Again", json!({ "action": "show_config" }))],
    )
}

pub fn configuration_error_card(error: &str) -> Value {
    adaptive_card(
        vec![header(
            icons::ERROR,
            "Configuration Error",
            Some(error),
            "attention",
            "Attention",
        )],
        vec![submit("🔄 Try Again", json!({ "action": "show_config" }))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_config::ConfigPatch;

    fn input_value<'a>(card: &'a Value, id: &str) -> &'a Value {
        card["body"]
            .as_array()
            .unwrap()
            .iter()
            .find(|item| item["id"] == id)
            .map(|item| &item["value"])
            .unwrap()
    }

    #[test]
    fn secrets_are_masked_plain_fields_shown() {
        let mut config = UserConfig::default();
        config.apply(ConfigPatch::single(ConfigField::DevinKey, "devin-secret-key"));
        config.apply(ConfigPatch::single(ConfigField::GithubRepo, "octo/demo"));

        let card = configuration_card(Some(&config));
        assert_eq!(input_value(&card, "devinApiKey"), SECRET_MASK);
        assert_eq!(input_value(&card, "githubToken"), "");
        assert_eq!(input_value(&card, "githubRepo"), "octo/demo");
        assert!(!card.to_string().contains("devin-secret-key"));
        assert!(card.to_string().contains("📊 Current Status"));
    }

    #[test]
    fn empty_form_has_no_status_block() {
        let card = configuration_card(None);
        assert!(!card.to_string().contains("📊 Current Status"));
        assert!(card.to_string().contains("📋 Show Current Status"));
        assert_eq!(card["actions"][0]["data"]["action"], "save_config");
    }

    #[test]
    fn result_cards_carry_message() {
        let ok = configuration_success_card("Configuration updated successfully!");
        assert!(ok.to_string().contains("Configuration updated successfully!"));
        let err = configuration_error_card("GitHub token appears to be too short.");
        assert_eq!(err["body"][0]["style"], "attention");
        assert_eq!(err["actions"][0]["data"]["action"], "show_config");
    }
}
