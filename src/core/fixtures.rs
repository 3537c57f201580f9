//! Tool schemas offered to models under test, and the canned results fed back
//! after a simulated tool call.

use serde_json::{json, Value};

use crate::api::{ChatToolDefinition, ChatToolFunction};

pub const WEATHER_TOOL: &str = "get_weather";
pub const CALCULATOR_TOOL: &str = "calculate";
pub const SEARCH_TOOL: &str = "search_web";

/// Opening turn shared by the basic, reasoning and streaming probes.
pub const WEATHER_PROMPT: &str = "What's the weather in Tokyo?";
pub const MULTI_TOOL_PROMPT: &str = "Check the weather in Tokyo and calculate 15 + 27";
pub const JSON_PROMPT: &str =
    "Return a JSON object with 'name', 'age', and 'city' fields for a fictional person";
pub const JSON_REQUIRED_KEYS: [&str; 3] = ["name", "age", "city"];

fn function_tool(name: &str, description: &str, parameters: Value) -> ChatToolDefinition {
    ChatToolDefinition {
        kind: "function".to_string(),
        function: ChatToolFunction {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters,
        },
    }
}

pub fn weather_tool() -> ChatToolDefinition {
    function_tool(
        WEATHER_TOOL,
        "Get the current weather for a city",
        json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "The name of the city"},
                "unit": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "description": "Temperature unit"
                }
            },
            "required": ["city"]
        }),
    )
}

pub fn calculator_tool() -> ChatToolDefinition {
    function_tool(
        CALCULATOR_TOOL,
        "Perform mathematical calculations",
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate (e.g., '2 + 2')"
                }
            },
            "required": ["expression"]
        }),
    )
}

pub fn search_tool() -> ChatToolDefinition {
    function_tool(
        SEARCH_TOOL,
        "Search the web for information",
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"},
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return",
                    "default": 5
                }
            },
            "required": ["query"]
        }),
    )
}

/// The default catalog offered by every tool-enabled probe.
pub fn probe_tools() -> Vec<ChatToolDefinition> {
    vec![weather_tool(), calculator_tool(), search_tool()]
}

/// Simulated tool output for `tool_name`; unknown tools get a generic payload.
pub fn mock_tool_response(tool_name: &str) -> Value {
    match tool_name {
        WEATHER_TOOL => json!({
            "temperature": 22,
            "condition": "partly cloudy",
            "humidity": 65,
            "wind_speed": 10
        }),
        CALCULATOR_TOOL => json!({"result": 4, "expression": "2 + 2"}),
        SEARCH_TOOL => json!({
            "results": [
                {"title": "Result 1", "url": "https://example.com/1", "snippet": "Snippet 1"},
                {"title": "Result 2", "url": "https://example.com/2", "snippet": "Snippet 2"}
            ]
        }),
        _ => json!({"result": "mock response"}),
    }
}
