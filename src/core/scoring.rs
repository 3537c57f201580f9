//! Weighted scoring and recommendation tiers.
//!
//! Weights and thresholds are plain configuration handed to [`Scorer::new`],
//! so alternate schemes can be loaded from the config file or built in tests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeStatus};
use crate::core::probes::ProbeMode;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Recommended,
    PartialSupport,
    NoToolCalling,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Recommended => "recommended",
            Recommendation::PartialSupport => "partial_support",
            Recommendation::NoToolCalling => "no_tool_calling",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum score for [`Recommendation::Recommended`].
    pub recommended: f64,
    /// Minimum score for [`Recommendation::PartialSupport`].
    pub partial: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            recommended: 90.0,
            partial: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: BTreeMap<ProbeName, f64>,
    pub thresholds: Thresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (ProbeName::BasicToolCalling, 0.25),
                (ProbeName::ToolOutputReasoning, 0.35),
                (ProbeName::MultiToolCalling, 0.25),
                (ProbeName::JsonMode, 0.10),
                (ProbeName::StreamingToolCalls, 0.05),
            ]),
            thresholds: Thresholds::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), String> {
        for name in ProbeName::ALL {
            match self.weights.get(&name) {
                None => return Err(format!("Missing weight for probe {name}")),
                Some(weight) if !weight.is_finite() || *weight < 0.0 => {
                    return Err(format!("Weight for {name} must be a non-negative number"));
                }
                Some(_) => {}
            }
        }

        let total: f64 = self.weights.values().sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("Probe weights must sum to 1.0, got {total}"));
        }

        let Thresholds {
            recommended,
            partial,
        } = self.thresholds;
        if !(0.0..=100.0).contains(&recommended) || !(0.0..=100.0).contains(&partial) {
            return Err("Thresholds must lie between 0 and 100".to_string());
        }
        if partial > recommended {
            return Err(format!(
                "Partial-support threshold ({partial}) exceeds recommended threshold ({recommended})"
            ));
        }
        Ok(())
    }

    /// Compact `name=weight` listing for report metadata.
    pub fn describe_weights(&self) -> String {
        self.weights
            .iter()
            .map(|(name, weight)| format!("{name}={weight}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    mode: ProbeMode,
}

impl Scorer {
    pub fn new(config: ScoringConfig, mode: ProbeMode) -> Self {
        Self { config, mode }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn mode(&self) -> ProbeMode {
        self.mode
    }

    pub fn score(&self, outcomes: &BTreeMap<ProbeName, ProbeOutcome>) -> f64 {
        let passed = |name: &ProbeName| {
            outcomes
                .get(name)
                .is_some_and(|outcome| outcome.status == ProbeStatus::Passed)
        };

        match self.mode {
            ProbeMode::Quick => {
                if passed(&ProbeName::BasicToolCalling) {
                    100.0
                } else {
                    0.0
                }
            }
            ProbeMode::Full => {
                let score: f64 = self
                    .config
                    .weights
                    .iter()
                    .filter(|(name, _)| passed(name))
                    .map(|(_, weight)| weight * 100.0)
                    .sum();
                score.clamp(0.0, 100.0)
            }
        }
    }

    pub fn recommend(&self, score: f64) -> Recommendation {
        let thresholds = &self.config.thresholds;
        if score >= thresholds.recommended {
            Recommendation::Recommended
        } else if score >= thresholds.partial {
            Recommendation::PartialSupport
        } else {
            Recommendation::NoToolCalling
        }
    }
}
