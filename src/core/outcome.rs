use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The five probes, declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeName {
    BasicToolCalling,
    ToolOutputReasoning,
    MultiToolCalling,
    JsonMode,
    StreamingToolCalls,
}

impl ProbeName {
    pub const ALL: [ProbeName; 5] = [
        ProbeName::BasicToolCalling,
        ProbeName::ToolOutputReasoning,
        ProbeName::MultiToolCalling,
        ProbeName::JsonMode,
        ProbeName::StreamingToolCalls,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProbeName::BasicToolCalling => "basic_tool_calling",
            ProbeName::ToolOutputReasoning => "tool_output_reasoning",
            ProbeName::MultiToolCalling => "multi_tool_calling",
            ProbeName::JsonMode => "json_mode",
            ProbeName::StreamingToolCalls => "streaming_tool_calls",
        }
    }

    /// Human-readable label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            ProbeName::BasicToolCalling => "Basic tool calling",
            ProbeName::ToolOutputReasoning => "Tool output reasoning",
            ProbeName::MultiToolCalling => "Multi-tool calling",
            ProbeName::JsonMode => "JSON mode",
            ProbeName::StreamingToolCalls => "Streaming tool calls",
        }
    }
}

impl fmt::Display for ProbeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProbeName {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ProbeName::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| format!("Unknown probe name: {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// The probe's structural condition held.
    Passed,
    /// The model answered, but not the way the probe requires.
    Failed,
    /// Transport, protocol or decoding failure; says nothing about the model.
    Error,
    /// The endpoint declared the model unavailable for this request.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub test_name: ProbeName,
    pub status: ProbeStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl ProbeOutcome {
    pub fn is_passed(&self) -> bool {
        self.status == ProbeStatus::Passed
    }

    pub fn reason(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

/// Wall-clock timer that stamps every outcome a probe produces.
pub struct ProbeTimer {
    name: ProbeName,
    started: Instant,
}

impl ProbeTimer {
    pub fn start(name: ProbeName) -> Self {
        Self {
            name,
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn passed(&self, details: Map<String, Value>) -> ProbeOutcome {
        self.finish(ProbeStatus::Passed, None, Some(details))
    }

    pub fn failed(&self, reason: impl Into<String>) -> ProbeOutcome {
        self.finish(ProbeStatus::Failed, Some(reason.into()), None)
    }

    pub fn error(&self, reason: impl Into<String>) -> ProbeOutcome {
        self.finish(ProbeStatus::Error, Some(reason.into()), None)
    }

    pub fn skipped(&self, reason: impl Into<String>) -> ProbeOutcome {
        self.finish(ProbeStatus::Skipped, Some(reason.into()), None)
    }

    fn finish(
        &self,
        status: ProbeStatus,
        reason: Option<String>,
        details: Option<Map<String, Value>>,
    ) -> ProbeOutcome {
        // Non-passing outcomes always explain themselves.
        let reason = reason.map(|text| {
            if text.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                text
            }
        });
        ProbeOutcome {
            test_name: self.name,
            status,
            latency_ms: self.elapsed_ms(),
            error_message: reason,
            details,
        }
    }
}
