use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod models;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_TOOL: &str = "tool";

pub const TOOL_CHOICE_AUTO: &str = "auto";

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant turn replaying tool calls the model emitted earlier.
    pub fn assistant_tool_calls(tool_calls: Vec<ChatToolCall>) -> Self {
        Self {
            role: ROLE_ASSISTANT.to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ROLE_TOOL.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatRequest {
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;
    pub const DEFAULT_MAX_TOKENS: u32 = 1000;

    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            stream: false,
        }
    }

    /// Offer a tool catalog with `tool_choice: "auto"`.
    pub fn with_tools(mut self, tools: Vec<ChatToolDefinition>) -> Self {
        self.tools = Some(tools);
        self.tool_choice = Some(TOOL_CHOICE_AUTO.to_string());
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Non-streaming `/chat/completions` body. Fields are lenient: missing or
/// `null` values fall back to defaults and content may arrive as parts.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatCompletion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatCompletionChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatCompletionMessage {
    #[serde(default, deserialize_with = "content_as_text")]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatToolCall {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        rename = "type",
        default = "default_tool_kind",
        deserialize_with = "tool_kind"
    )]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub function: ChatToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ChatToolCallFunction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub arguments: String,
}

fn default_tool_kind() -> String {
    "function".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Some servers send `arguments` as a JSON object instead of an encoded
// string, or `null` for an id they never filled in.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn tool_kind<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let kind = lenient_string(deserializer)?;
    Ok(if kind.is_empty() {
        default_tool_kind()
    } else {
        kind
    })
}

/// Plain strings pass through. Arrays of content parts are joined by their
/// `text` fields.
fn content_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(text) => Some(text.as_str()),
                    other => other.get("text").and_then(Value::as_str),
                })
                .collect(),
        ),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ChatToolFunction,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatToolFunction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
}

impl ModelInfo {
    pub fn owner(&self) -> &str {
        self.owned_by.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}
