//! Results returned by the chat agent's tools.
//!
//! The agent answers with loosely structured JSON. It is resolved once into
//! [`ToolResult`] so screens match on known shapes instead of looking up keys.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// `{"type": "tasks", "items": [...]}`
    Tasks(Vec<TaskItem>),
    /// `{"type": "mood_log", "mood": ..., "energy": ..., "stress": ..., "note": ...}`
    MoodLog(MoodLog),
    /// `{"type": "preferences", "likes": [...], "dislikes": [...]}`
    Preferences(Preferences),
    Text(String),
    List(Vec<ToolResult>),
    /// Any object whose shape is not recognized.
    Object(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TaskItem {
    #[serde(default, deserialize_with = "scalar_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub status: Option<String>,
    #[serde(default, alias = "dueDate", deserialize_with = "scalar_text")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MoodLog {
    #[serde(default, deserialize_with = "scalar_text")]
    pub mood: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub energy: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub stress: Option<String>,
    #[serde(default, deserialize_with = "non_blank_text")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Preferences {
    #[serde(default, deserialize_with = "scalar_list")]
    pub likes: Vec<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub dislikes: Vec<String>,
}

/// Object shapes the agent's tools are known to return.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownShape {
    Tasks {
        #[serde(default)]
        items: Vec<TaskItem>,
    },
    MoodLog(MoodLog),
    Preferences(Preferences),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ObjectShape {
    Known(KnownShape),
    Other(Map<String, Value>),
}

impl ToolResult {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ToolResult::Text(String::new()),
            Value::Bool(_) | Value::Number(_) => ToolResult::Text(value.to_string()),
            Value::String(text) => ToolResult::Text(text),
            Value::Array(items) => {
                ToolResult::List(items.into_iter().map(ToolResult::from_json).collect())
            }
            Value::Object(object) => from_object(object),
        }
    }

    /// Friendly text for the chat transcript.
    pub fn describe(&self) -> String {
        match self {
            ToolResult::Text(text) if text.trim().is_empty() => {
                "The tool returned no details.".to_string()
            }
            ToolResult::Text(text) => text.clone(),
            ToolResult::List(items) if items.is_empty() => "Nothing to show.".to_string(),
            ToolResult::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| format!("• {}. {}", index + 1, item.describe()))
                .collect::<Vec<_>>()
                .join("\n"),
            ToolResult::Tasks(tasks) => describe_tasks(tasks),
            ToolResult::MoodLog(log) => describe_mood(log),
            ToolResult::Preferences(preferences) => describe_preferences(preferences),
            ToolResult::Object(object) => {
                let mut lines = vec!["Here is what I found:".to_string()];
                for (key, value) in object {
                    lines.push(format!(
                        "- {}: {}",
                        capitalize(key),
                        ToolResult::from_json(value.clone()).describe()
                    ));
                }
                lines.join("\n")
            }
        }
    }
}

fn from_object(object: Map<String, Value>) -> ToolResult {
    match ObjectShape::deserialize(Value::Object(object)) {
        Ok(ObjectShape::Known(KnownShape::Tasks { items })) => ToolResult::Tasks(items),
        Ok(ObjectShape::Known(KnownShape::MoodLog(log))) => ToolResult::MoodLog(log),
        Ok(ObjectShape::Known(KnownShape::Preferences(preferences))) => {
            ToolResult::Preferences(preferences)
        }
        Ok(ObjectShape::Other(object)) => ToolResult::Object(object),
        // Unreachable: every object matches `Other`.
        Err(_) => ToolResult::Object(Map::new()),
    }
}

/// Strings, numbers and booleans as text; anything else is treated as absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar))
}

fn non_blank_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(deserializer)?.filter(|text| !text.trim().is_empty()))
}

fn scalar_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().filter_map(scalar).collect())
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn describe_tasks(tasks: &[TaskItem]) -> String {
    if tasks.is_empty() {
        return "You have no pending tasks. Want to add something for today?".to_string();
    }
    let mut lines = vec!["Here are your tasks:".to_string()];
    for (index, task) in tasks.iter().enumerate() {
        let title = task.title.as_deref().unwrap_or("Untitled task");
        let status = task.status.as_deref().unwrap_or("pending").to_lowercase();
        let mut line = format!("{}. {title} ({status}", index + 1);
        if let Some(due) = &task.due_date {
            line.push_str(&format!(", due {due}"));
        }
        line.push(')');
        lines.push(line);
    }
    lines.push("Should I schedule anything else or mark a task as done?".to_string());
    lines.join("\n")
}

fn describe_mood(log: &MoodLog) -> String {
    let mut text = format!(
        "Logged your mood: {}",
        log.mood.as_deref().unwrap_or("unspecified")
    );
    if let Some(energy) = &log.energy {
        text.push_str(&format!(", energy {energy}/10"));
    }
    if let Some(stress) = &log.stress {
        text.push_str(&format!(", stress {stress}/10"));
    }
    if let Some(note) = &log.note {
        text.push_str(&format!(". Note: {note}"));
    }
    text.push_str(". Keep listening to your body!");
    text
}

fn describe_preferences(preferences: &Preferences) -> String {
    let mut lines = vec!["Updated your preferences.".to_string()];
    if !preferences.likes.is_empty() {
        lines.push(format!("You like: {}", preferences.likes.join(", ")));
    }
    if !preferences.dislikes.is_empty() {
        lines.push(format!("You prefer to avoid: {}", preferences.dislikes.join(", ")));
    }
    lines.push("Thanks for sharing, it helps me suggest better activities.".to_string());
    lines.join("\n")
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
