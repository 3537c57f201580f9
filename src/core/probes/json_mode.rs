use serde_json::{Map, Value};

use crate::api::{ChatMessage, ChatRequest};
use crate::core::exchange::{Exchange, ExchangeError};
use crate::core::fixtures::{JSON_PROMPT, JSON_REQUIRED_KEYS};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeTimer};

use super::conclude;

const NAME: ProbeName = ProbeName::JsonMode;

/// Asks for a bare JSON object, no tools offered.
pub async fn json_mode(exchange: &dyn Exchange, model: &str) -> ProbeOutcome {
    let timer = ProbeTimer::start(NAME);
    let result = evaluate(exchange, model, &timer).await;
    conclude(&timer, model, NAME, result)
}

async fn evaluate(
    exchange: &dyn Exchange,
    model: &str,
    timer: &ProbeTimer,
) -> Result<ProbeOutcome, ExchangeError> {
    let request = ChatRequest::new(model, vec![ChatMessage::user(JSON_PROMPT)]);
    let response = exchange.exchange(&request).await?;

    if let Some(message) = response.error_message() {
        return Ok(timer.error(format!("API error: {message}")));
    }

    let completion = response.completion()?;
    let content = completion
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Ok(timer.failed("No content in response"));
    }

    let object = match serde_json::from_str::<Value>(content.trim()) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return Ok(timer.failed("Response JSON is not an object")),
        Err(_) => return Ok(timer.failed("Invalid JSON in response")),
    };

    let missing: Vec<&str> = JSON_REQUIRED_KEYS
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Ok(timer.failed(format!("Missing fields: {}", missing.join(", "))));
    }

    let mut details = Map::new();
    details.insert(
        "json_keys".into(),
        Value::from(object.keys().cloned().map(Value::from).collect::<Vec<_>>()),
    );
    Ok(timer.passed(details))
}
