use serde_json::{Map, Value};

use crate::api::{ChatMessage, ChatRequest};
use crate::core::exchange::{Exchange, ExchangeError};
use crate::core::fixtures::{probe_tools, CALCULATOR_TOOL, MULTI_TOOL_PROMPT, WEATHER_TOOL};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeTimer};

use super::conclude;

const NAME: ProbeName = ProbeName::MultiToolCalling;
const REQUIRED_TOOLS: [&str; 2] = [WEATHER_TOOL, CALCULATOR_TOOL];

/// Two independent asks in one turn; passes when both the weather and
/// calculator tools are called in the same response.
pub async fn multi_tool_calling(exchange: &dyn Exchange, model: &str) -> ProbeOutcome {
    let timer = ProbeTimer::start(NAME);
    let result = evaluate(exchange, model, &timer).await;
    conclude(&timer, model, NAME, result)
}

async fn evaluate(
    exchange: &dyn Exchange,
    model: &str,
    timer: &ProbeTimer,
) -> Result<ProbeOutcome, ExchangeError> {
    let request = ChatRequest::new(model, vec![ChatMessage::user(MULTI_TOOL_PROMPT)])
        .with_tools(probe_tools());
    let response = exchange.exchange(&request).await?;

    if let Some(message) = response.error_message() {
        return Ok(timer.error(format!("API error: {message}")));
    }

    let completion = response.completion()?;
    let tool_calls = completion
        .choices
        .first()
        .and_then(|choice| choice.message.tool_calls.as_deref())
        .unwrap_or_default();

    let tool_names: Vec<&str> = tool_calls
        .iter()
        .map(|call| call.function.name.as_str())
        .collect();
    let missing: Vec<&str> = REQUIRED_TOOLS
        .into_iter()
        .filter(|required| !tool_names.contains(required))
        .collect();

    if tool_calls.len() < 2 {
        return Ok(timer.failed(format!(
            "Expected at least 2 tool_calls, got {}; missing {}",
            tool_calls.len(),
            missing.join(", ")
        )));
    }

    if !missing.is_empty() {
        return Ok(timer.failed(format!(
            "Expected {} and {}, got {:?}; missing {}",
            WEATHER_TOOL,
            CALCULATOR_TOOL,
            tool_names,
            missing.join(", ")
        )));
    }

    let mut details = Map::new();
    details.insert("tool_calls_count".into(), tool_calls.len().into());
    details.insert(
        "tool_names".into(),
        Value::from(
            tool_names
                .iter()
                .map(|name| Value::from(*name))
                .collect::<Vec<_>>(),
        ),
    );
    Ok(timer.passed(details))
}
