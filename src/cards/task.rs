use super::{adaptive_card, facts, format_timestamp, header, icons, submit, text};
use crate::vendor::TaskHandle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Fields submitted by the task creation and preview cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
}

impl TaskForm {
    pub fn description(&self) -> Option<&str> {
        crate::util::non_empty(self.task_description.as_deref())
    }
}

const TASK_TYPES: &[(&str, &str)] = &[
    ("web", "🌐 Web Development"),
    ("mobile", "📱 Mobile App"),
    ("api", "🔧 API Development"),
    ("database", "🗄️ Database Design"),
    ("ai", "🤖 AI/ML Integration"),
    ("security", "🔒 Security Implementation"),
    ("performance", "⚡ Performance Optimization"),
    ("testing", "🧪 Testing & QA"),
    ("data", "📊 Data Analysis"),
    ("devops", "🔄 DevOps & CI/CD"),
    ("general", "🛠️ General Development"),
];

fn task_type_display(value: Option<&str>) -> &'static str {
    TASK_TYPES
        .iter()
        .find(|(key, _)| Some(*key) == value)
        .map(|(_, title)| *title)
        .unwrap_or("🛠️ General Development")
}

fn level_icon(value: Option<&str>) -> &'static str {
    match value {
        Some("high") | Some("complex") => "🔴",
        Some("low") | Some("simple") => "🟢",
        _ => "🟡",
    }
}

fn choice_set(id: &str, label: &str, default: Option<&str>, choices: &[(&str, &str)]) -> Value {
    let choices: Vec<Value> = choices
        .iter()
        .map(|(value, title)| json!({ "title": title, "value": value }))
        .collect();
    let mut input = json!({
        "type": "Input.ChoiceSet",
        "id": id,
        "label": label,
        "style": "compact",
        "choices": choices,
    });
    if let Some(default) = default {
        input["value"] = json!(default);
    }
    input
}

pub fn task_creation_card() -> Value {
    let body = vec![
        header(
            "🚀",
            "Create Coding Task",
            Some("Describe your coding task and let our AI agents help you build it!"),
            "emphasis",
            "Accent",
        ),
        json!({
            "type": "Input.Text",
            "id": "taskDescription",
            "label": "Task Description",
            "placeholder": "e.g., Create a React component for a todo list with drag and drop functionality",
            "isMultiline": true,
            "isRequired": true,
            "errorMessage": "Please describe the task",
        }),
        choice_set(
            "taskType",
            "Task Type",
            None,
            TASK_TYPES,
        ),
        choice_set(
            "priority",
            "Priority Level",
            Some("medium"),
            &[
                ("high", "🔴 High Priority"),
                ("medium", "🟡 Medium Priority"),
                ("low", "🟢 Low Priority"),
            ],
        ),
        choice_set(
            "complexity",
            "Expected Complexity",
            Some("medium"),
            &[
                ("simple", "🟢 Simple (1-2 hours)"),
                ("medium", "🟡 Medium (2-8 hours)"),
                ("complex", "🔴 Complex (8+ hours)"),
            ],
        ),
        json!({
            "type": "Container",
            "style": "good",
            "spacing": "Medium",
            "items": [
                { "type": "TextBlock", "text": "💡 Tips for better results", "weight": "Bolder" },
                text("• Be specific about requirements\n• Mention preferred technologies\n• Include any constraints or limitations\n• Describe the expected outcome"),
            ],
        }),
    ];
    let actions = vec![
        submit("🔍 Preview Task", json!({ "action": "preview_task" })),
        submit(
            &format!("{} Create Task", icons::CREATE),
            json!({ "action": "create_task" }),
        ),
        submit("❌ Cancel", json!({ "action": "cancel_task" })),
    ];
    adaptive_card(body, actions)
}

pub fn task_preview_card(form: &TaskForm) -> Value {
    let priority = form.priority.as_deref();
    let complexity = form.complexity.as_deref();
    let body = vec![
        header("🔍", "Task Preview", None, "emphasis", "Accent"),
        text("Review your task details before submission:"),
        facts(&[
            ("Task Type:", task_type_display(form.task_type.as_deref()).to_string()),
            (
                "Priority:",
                format!(
                    "{} {}",
                    level_icon(priority),
                    priority.unwrap_or("medium").to_uppercase()
                ),
            ),
            (
                "Complexity:",
                format!(
                    "{} {}",
                    level_icon(complexity),
                    complexity.unwrap_or("medium").to_uppercase()
                ),
            ),
        ]),
        json!({ "type": "TextBlock", "text": "Task Description", "weight": "Bolder", "spacing": "Medium" }),
        json!({
            "type": "Container",
            "style": "emphasis",
            "items": [text(form.description().unwrap_or("No description provided"))],
        }),
    ];
    let actions = vec![
        submit(
            "✅ Confirm & Create",
            json!({
                "action": "confirm_create_task",
                "taskDescription": form.task_description,
                "taskType": form.task_type,
                "priority": form.priority,
                "complexity": form.complexity,
            }),
        ),
        submit("✏️ Edit Task", json!({ "action": "edit_task" })),
        submit("❌ Cancel", json!({ "action": "cancel_task" })),
    ];
    adaptive_card(body, actions)
}

/// Confirmation after a Devin session was created.
pub fn task_success_card(handle: &TaskHandle, created_at: &str) -> Value {
    let mut body = vec![
        header(
            icons::SUCCESS,
            "Task Created Successfully!",
            None,
            "good",
            "Good",
        ),
        text("Your coding task has been submitted to Devin and is now being processed."),
        facts(&[
            ("Session ID:", handle.id.clone()),
            ("Status:", handle.status.clone()),
            ("Created:", format_timestamp(created_at)),
        ]),
        json!({
            "type": "Container",
            "style": "emphasis",
            "spacing": "Medium",
            "items": [
                { "type": "TextBlock", "text": "Next Steps", "weight": "Bolder" },
                text(format!(
                    "• Monitor progress with `/devin-status {id}`\n• Send messages with `/devin-message {id} <message>`\n• Check back periodically for updates",
                    id = handle.id
                )),
            ],
        }),
    ];
    let mut actions = vec![submit(
        "📊 Check Status",
        json!({ "action": "check_status", "sessionId": handle.id }),
    )];
    if let Some(url) = &handle.url {
        body.push(text(format!("[Open session in Devin]({})", url)));
        actions.push(super::open_url("🔗 Open in Devin", url));
    }
    actions.push(submit(
        "🚀 Create Another Task",
        json!({ "action": "create_new_task" }),
    ));
    adaptive_card(body, actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_card_has_form_inputs() {
        let card = task_creation_card();
        let ids: Vec<&str> = card["body"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|item| item["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["taskDescription", "taskType", "priority", "complexity"]);
    }

    #[test]
    fn preview_echoes_form_into_confirm_action() {
        let form = TaskForm {
            task_description: Some("Build a todo app".to_string()),
            task_type: Some("web".to_string()),
            priority: Some("high".to_string()),
            complexity: None,
        };
        let card = task_preview_card(&form);
        let confirm = &card["actions"][0]["data"];
        assert_eq!(confirm["action"], "confirm_create_task");
        assert_eq!(confirm["taskDescription"], "Build a todo app");
        let rendered = card.to_string();
        assert!(rendered.contains("🌐 Web Development"));
        assert!(rendered.contains("🔴 HIGH"));
        assert!(rendered.contains("🟡 MEDIUM"));
    }

    #[test]
    fn success_card_names_session() {
        let handle = TaskHandle {
            id: "s-1".to_string(),
            status: "running".to_string(),
            url: None,
        };
        let card = task_success_card(&handle, "2024-01-01T00:00:00Z");
        assert!(card.to_string().contains("s-1"));
        assert_eq!(card["actions"][0]["data"]["sessionId"], "s-1");
    }

    #[test]
    fn form_parses_camel_case() {
        let form: TaskForm = serde_json::from_value(json!({
            "taskDescription": "  ",
            "priority": "low"
        }))
        .unwrap();
        assert_eq!(form.description(), None);
        assert_eq!(form.priority.as_deref(), Some("low"));
    }
}
