use serde_json::Map;

use crate::api::{ChatMessage, ChatRequest};
use crate::core::exchange::{Exchange, ExchangeError};
use crate::core::fixtures::{mock_tool_response, probe_tools, WEATHER_PROMPT};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeTimer};

use super::conclude;

const NAME: ProbeName = ProbeName::ToolOutputReasoning;

/// Two-step conversation: the model calls a tool, receives a mock result, and
/// must then answer in text. The best single predictor of agent reliability.
pub async fn tool_output_reasoning(exchange: &dyn Exchange, model: &str) -> ProbeOutcome {
    let timer = ProbeTimer::start(NAME);
    let result = evaluate(exchange, model, &timer).await;
    conclude(&timer, model, NAME, result)
}

async fn evaluate(
    exchange: &dyn Exchange,
    model: &str,
    timer: &ProbeTimer,
) -> Result<ProbeOutcome, ExchangeError> {
    let opening = ChatMessage::user(WEATHER_PROMPT);
    let request = ChatRequest::new(model, vec![opening.clone()]).with_tools(probe_tools());
    let response = exchange.exchange(&request).await?;

    if let Some(message) = response.error_message() {
        return Ok(timer.error(format!("API error: {message}")));
    }

    let completion = response.completion()?;
    let Some(choice) = completion.choices.into_iter().next() else {
        return Ok(timer.failed("No choices in response"));
    };
    let Some(tool_call) = choice
        .message
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
    else {
        return Ok(timer.failed("No tool_calls in first response"));
    };

    let tool_output = mock_tool_response(&tool_call.function.name);
    let tool_call_id = tool_call.id.clone();
    let followup = ChatRequest::new(
        model,
        vec![
            opening,
            ChatMessage::assistant_tool_calls(vec![tool_call]),
            ChatMessage::tool_result(tool_call_id, tool_output.to_string()),
        ],
    )
    .with_tools(probe_tools());

    let followup_response = exchange.exchange(&followup).await?;
    if let Some(message) = followup_response.error_message() {
        return Ok(timer.error(format!("API error on followup: {message}")));
    }

    let final_completion = followup_response.completion()?;
    let final_content = final_completion
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .unwrap_or_default();

    if final_content.trim().is_empty() {
        return Ok(timer.failed("No final content after tool output"));
    }

    let mut details = Map::new();
    details.insert(
        "final_content_length".into(),
        final_content.chars().count().into(),
    );
    Ok(timer.passed(details))
}
