use serde_json::Map;

use crate::api::{ChatMessage, ChatRequest};
use crate::core::exchange::{Exchange, ExchangeError};
use crate::core::fixtures::{probe_tools, WEATHER_PROMPT};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeTimer};
use crate::core::stream::chunk_has_tool_call_delta;

use super::conclude;

const NAME: ProbeName = ProbeName::StreamingToolCalls;

pub async fn streaming_tool_calls(exchange: &dyn Exchange, model: &str) -> ProbeOutcome {
    let timer = ProbeTimer::start(NAME);
    let result = evaluate(exchange, model, &timer).await;
    conclude(&timer, model, NAME, result)
}

async fn evaluate(
    exchange: &dyn Exchange,
    model: &str,
    timer: &ProbeTimer,
) -> Result<ProbeOutcome, ExchangeError> {
    let request = ChatRequest::new(model, vec![ChatMessage::user(WEATHER_PROMPT)])
        .with_tools(probe_tools())
        .streaming();
    let response = exchange.exchange(&request).await?;

    if let Some(message) = response.error_message() {
        return Ok(timer.error(format!("API error: {message}")));
    }

    let chunks = response.chunks();
    if chunks.is_empty() {
        return Ok(timer.failed("No chunks in streaming response"));
    }

    if !chunks.iter().any(chunk_has_tool_call_delta) {
        return Ok(timer.failed("No tool_calls in streaming response"));
    }

    let mut details = Map::new();
    details.insert("chunks_received".into(), chunks.len().into());
    Ok(timer.passed(details))
}
