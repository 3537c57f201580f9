use serde_json::Map;

use crate::api::{ChatMessage, ChatRequest};
use crate::core::exchange::{Exchange, ExchangeError};
use crate::core::fixtures::{probe_tools, WEATHER_PROMPT};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeTimer};

use super::conclude;

const NAME: ProbeName = ProbeName::BasicToolCalling;

/// A single weather question with the full catalog offered; passes when the
/// model answers with at least one tool call.
pub async fn basic_tool_calling(exchange: &dyn Exchange, model: &str) -> ProbeOutcome {
    let timer = ProbeTimer::start(NAME);
    let result = evaluate(exchange, model, &timer).await;
    conclude(&timer, model, NAME, result)
}

async fn evaluate(
    exchange: &dyn Exchange,
    model: &str,
    timer: &ProbeTimer,
) -> Result<ProbeOutcome, ExchangeError> {
    let request =
        ChatRequest::new(model, vec![ChatMessage::user(WEATHER_PROMPT)]).with_tools(probe_tools());
    let response = exchange.exchange(&request).await?;

    if let Some(message) = response.error_message() {
        return Ok(timer.skipped(format!("Model not available: {message}")));
    }

    let completion = response.completion()?;
    let Some(choice) = completion.choices.first() else {
        return Ok(timer.failed("No choices in response"));
    };

    let tool_calls = choice.message.tool_calls.as_deref().unwrap_or_default();
    if tool_calls.is_empty() {
        return Ok(timer.failed("No tool_calls in response"));
    }

    let mut details = Map::new();
    details.insert("tool_calls_count".into(), tool_calls.len().into());
    Ok(timer.passed(details))
}
