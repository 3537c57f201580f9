//! The behavioral probe battery.
//!
//! Every probe takes the injected [`Exchange`] and a model id and always
//! returns a [`ProbeOutcome`]; exchange failures are folded into the outcome
//! at the probe boundary rather than propagated.

mod basic;
mod json_mode;
mod multi_tool;
mod reasoning;
mod streaming;


use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use basic::basic_tool_calling;
pub use json_mode::json_mode;
pub use multi_tool::multi_tool_calling;
pub use reasoning::tool_output_reasoning;
pub use streaming::streaming_tool_calls;

use crate::core::exchange::{Exchange, ExchangeError};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeStatus, ProbeTimer};

pub const RATE_LIMITED_REASON: &str = "Rate limited by API";

/// Which probes a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMode {
    /// Only `basic_tool_calling`, scored pass/fail.
    Quick,
    #[default]
    Full,
}

impl ProbeMode {
    pub fn probes(self) -> &'static [ProbeName] {
        match self {
            ProbeMode::Quick => &[ProbeName::BasicToolCalling],
            ProbeMode::Full => &ProbeName::ALL,
        }
    }
}

pub async fn run_probe(exchange: &dyn Exchange, name: ProbeName, model: &str) -> ProbeOutcome {
    match name {
        ProbeName::BasicToolCalling => basic_tool_calling(exchange, model).await,
        ProbeName::ToolOutputReasoning => tool_output_reasoning(exchange, model).await,
        ProbeName::MultiToolCalling => multi_tool_calling(exchange, model).await,
        ProbeName::JsonMode => json_mode(exchange, model).await,
        ProbeName::StreamingToolCalls => streaming_tool_calls(exchange, model).await,
    }
}

/// Runs the probes for `mode` one after another. A skip ends the sequence
/// early since the endpoint has already declared the model unusable.
pub async fn run_probes(
    exchange: &dyn Exchange,
    model: &str,
    mode: ProbeMode,
) -> BTreeMap<ProbeName, ProbeOutcome> {
    let mut outcomes = BTreeMap::new();
    for &name in mode.probes() {
        let outcome = run_probe(exchange, name, model).await;
        let skipped = outcome.status == ProbeStatus::Skipped;
        outcomes.insert(name, outcome);
        if skipped {
            break;
        }
    }
    outcomes
}

/// Shared tail of every probe: resolve exchange failures and log the verdict.
pub(crate) fn conclude(
    timer: &ProbeTimer,
    model: &str,
    name: ProbeName,
    result: Result<ProbeOutcome, ExchangeError>,
) -> ProbeOutcome {
    let outcome = result.unwrap_or_else(|err| {
        if err.is_rate_limited() {
            timer.failed(RATE_LIMITED_REASON)
        } else {
            timer.error(err.to_string())
        }
    });

    match outcome.status {
        ProbeStatus::Passed => info!("✓ {model}: {} - PASSED", name.label()),
        ProbeStatus::Failed => info!("✗ {model}: {} - FAILED: {}", name.label(), outcome.reason()),
        ProbeStatus::Error => error!("✗ {model}: {} - ERROR: {}", name.label(), outcome.reason()),
        ProbeStatus::Skipped => warn!("⏭ {model}: {} - SKIPPED: {}", name.label(), outcome.reason()),
    }

    outcome
}
