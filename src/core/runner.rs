//! Run orchestration: discover models, filter them, probe each one with
//! bounded concurrency, and classify what comes back.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::models::{fetch_models, ModelFilter};
use crate::api::ModelInfo;
use crate::core::config::{Config, ConfigError};
use crate::core::exchange::{Exchange, HttpExchange};
use crate::core::outcome::{ProbeName, ProbeOutcome, ProbeStatus};
use crate::core::probes::{run_probes, ProbeMode};
use crate::core::scoring::{Recommendation, Scorer};

/// What happens when a probe ends in `error` (transport failure, exhausted
/// retries, or an error body outside basic tool calling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportErrorPolicy {
    /// Drop the model from the results and keep going.
    #[default]
    ExcludeModel,
    /// Stop the whole run with [`RunError::Aborted`].
    AbortRun,
}

impl TransportErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportErrorPolicy::ExcludeModel => "exclude-model",
            TransportErrorPolicy::AbortRun => "abort-run",
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Run aborted while probing {model}: {reason}")]
    Aborted { model: String, reason: String },

    #[error("Failed to write report to {path}: {source}")]
    Report {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Probe results and classification for one model that stayed in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRunResult {
    pub model_id: String,
    pub owned_by: String,
    /// Keyed by probe; iteration follows execution order.
    pub tests: BTreeMap<ProbeName, ProbeOutcome>,
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub total_latency_ms: u64,
}

/// A model dropped from the results, with the outcome that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedModel {
    pub model_id: String,
    pub status: ProbeStatus,
    pub reason: String,
}

#[derive(Debug)]
enum ModelVerdict {
    Kept(ModelRunResult),
    Excluded(ExcludedModel),
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Models selected for probing after filtering.
    pub candidates: usize,
    /// Sorted by model id.
    pub results: Vec<ModelRunResult>,
    pub excluded: Vec<ExcludedModel>,
}

/// Folds a model's outcomes into a verdict. Skips take precedence over errors.
fn assess(
    model: &ModelInfo,
    tests: BTreeMap<ProbeName, ProbeOutcome>,
    scorer: &Scorer,
) -> ModelVerdict {
    let first_with = |status: ProbeStatus| {
        tests
            .values()
            .find(|outcome| outcome.status == status)
            .map(|outcome| outcome.reason().to_string())
    };

    for status in [ProbeStatus::Skipped, ProbeStatus::Error] {
        if let Some(reason) = first_with(status) {
            return ModelVerdict::Excluded(ExcludedModel {
                model_id: model.id.clone(),
                status,
                reason,
            });
        }
    }

    let overall_score = scorer.score(&tests);
    let total_latency_ms = tests
        .values()
        .filter(|outcome| outcome.status != ProbeStatus::Skipped)
        .map(|outcome| outcome.latency_ms)
        .sum();

    ModelVerdict::Kept(ModelRunResult {
        model_id: model.id.clone(),
        owned_by: model.owner().to_string(),
        tests,
        overall_score,
        recommendation: scorer.recommend(overall_score),
        total_latency_ms,
    })
}

pub struct Runner {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    exchange: Arc<dyn Exchange>,
    filter: ModelFilter,
    scorer: Scorer,
    max_workers: usize,
    policy: TransportErrorPolicy,
    show_progress: bool,
}

impl Runner {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        exchange: Arc<dyn Exchange>,
        filter: ModelFilter,
        scorer: Scorer,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
            exchange,
            filter,
            scorer,
            max_workers: 1,
            policy: TransportErrorPolicy::default(),
            show_progress: false,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_policy(mut self, policy: TransportErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Draw a per-model progress bar on stderr while probing.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Wires an HTTP-backed runner from validated configuration. The single
    /// client built here serves model discovery and every exchange.
    pub fn from_config(
        config: &Config,
        mode: ProbeMode,
        filter_pattern: Option<&str>,
    ) -> Result<Self, RunError> {
        let filter = config.model_filter(filter_pattern)?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(RunError::Client)?;
        let exchange = HttpExchange::new(
            client.clone(),
            config.api_url.clone(),
            config.api_key.clone(),
            config.timeout(),
            config.retry_policy(),
        );

        Ok(Runner::new(
            client,
            config.api_url.clone(),
            config.api_key.clone(),
            Arc::new(exchange),
            filter,
            Scorer::new(config.scoring.clone(), mode),
        )
        .with_max_workers(config.max_workers)
        .with_policy(config.on_transport_error))
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Lists models from the endpoint. A listing failure is logged and
    /// treated as an empty catalog.
    pub async fn discover(&self) -> Vec<ModelInfo> {
        match fetch_models(&self.client, &self.api_url, self.api_key.as_deref()).await {
            Ok(response) => {
                info!("Found {} models", response.data.len());
                response.data
            }
            Err(err) => {
                error!(api_url = %self.api_url, "Failed to fetch models: {err}");
                Vec::new()
            }
        }
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_prefix("Testing models");
        pb
    }

    async fn probe_model(&self, model: ModelInfo) -> ModelVerdict {
        info!(model = %model.id, "Testing model");
        let tests = run_probes(self.exchange.as_ref(), &model.id, self.scorer.mode()).await;
        assess(&model, tests, &self.scorer)
    }

    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        let models = self.discover().await;
        if models.is_empty() {
            warn!("No models found to test");
            return Ok(RunOutcome::default());
        }

        let selected = self.filter.apply(models);
        info!("Testing {} models...", selected.len());
        if self.scorer.mode() == ProbeMode::Quick {
            info!("Quick mode: only testing basic tool calling");
        }

        let mut outcome = RunOutcome {
            candidates: selected.len(),
            ..RunOutcome::default()
        };

        let progress = self.progress_bar(selected.len() as u64);
        let mut verdicts = stream::iter(selected)
            .map(|model| self.probe_model(model))
            .buffer_unordered(self.max_workers);

        while let Some(verdict) = verdicts.next().await {
            progress.inc(1);
            match verdict {
                ModelVerdict::Kept(result) => {
                    info!(
                        model = %result.model_id,
                        score = result.overall_score,
                        "Classified as {}",
                        result.recommendation
                    );
                    progress.set_message(result.model_id.clone());
                    outcome.results.push(result);
                }
                ModelVerdict::Excluded(excluded) => match excluded.status {
                    ProbeStatus::Error if self.policy == TransportErrorPolicy::AbortRun => {
                        progress.abandon();
                        return Err(RunError::Aborted {
                            model: excluded.model_id,
                            reason: excluded.reason,
                        });
                    }
                    ProbeStatus::Error => {
                        warn!("⚠ {}: Error: {}", excluded.model_id, excluded.reason);
                        outcome.excluded.push(excluded);
                    }
                    _ => {
                        warn!("⏭ {}: Skipped: {}", excluded.model_id, excluded.reason);
                        outcome.excluded.push(excluded);
                    }
                },
            }
        }

        progress.finish_and_clear();

        outcome.results.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        outcome.excluded.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatRequest;
    use crate::core::exchange::{ExchangeError, ExchangeResponse};
    use crate::core::outcome::ProbeTimer;
    use crate::core::scoring::ScoringConfig;
    use crate::utils::test_utils::{
        passing_suite, status_error, tool_call, tool_calls_reply, MockResponse, MockServer,
        ScriptedExchange,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn models_listing(ids: &[&str]) -> MockResponse {
        let data: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "object": "model", "owned_by": "local"}))
            .collect();
        MockResponse::json(200, json!({"object": "list", "data": data}))
    }

    fn runner(server: &MockServer, exchange: ScriptedExchange, mode: ProbeMode) -> Runner {
        Runner::new(
            reqwest::Client::new(),
            server.base_url(),
            None,
            Arc::new(exchange),
            ModelFilter::default(),
            Scorer::new(ScoringConfig::default(), mode),
        )
        .with_max_workers(3)
    }

    /// Answers every request with a tool call after a short pause, recording
    /// the highest number of requests in flight at once.
    #[derive(Default)]
    struct InFlightExchange {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Exchange for InFlightExchange {
        async fn exchange(
            &self,
            _request: &ChatRequest,
        ) -> Result<ExchangeResponse, ExchangeError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            tool_calls_reply(vec![tool_call("c1", "get_weather", "{}")])
        }
    }

    fn unsupported() -> crate::utils::test_utils::ScriptedReply {
        Ok(ExchangeResponse::Unsupported {
            message: "Model not supported".to_string(),
        })
    }

    #[tokio::test]
    async fn full_run_keeps_passing_models_sorted() {
        let server = MockServer::start(vec![models_listing(&["zeta", "alpha", "gpt-4o"])]).await;
        let exchange = ScriptedExchange::new()
            .with_model("zeta", passing_suite())
            .with_model("alpha", passing_suite());

        let outcome = runner(&server, exchange, ProbeMode::Full)
            .run()
            .await
            .expect("run succeeds");

        assert_eq!(outcome.candidates, 2);
        let ids: Vec<_> = outcome.results.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);

        let alpha = &outcome.results[0];
        assert_eq!(alpha.owned_by, "local");
        assert!((alpha.overall_score - 100.0).abs() < 1e-9);
        assert_eq!(alpha.recommendation, Recommendation::Recommended);
        assert_eq!(
            alpha.tests.keys().copied().collect::<Vec<_>>(),
            ProbeName::ALL.to_vec()
        );
    }

    #[tokio::test]
    async fn unsupported_model_is_excluded() {
        let server = MockServer::start(vec![models_listing(&["ghost", "real"])]).await;
        let exchange = ScriptedExchange::new()
            .with_model("ghost", vec![unsupported()])
            .with_model("real", passing_suite());

        let outcome = runner(&server, exchange, ProbeMode::Full)
            .run()
            .await
            .expect("run succeeds");

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].model_id, "real");
        assert_eq!(outcome.excluded.len(), 1);
        assert_eq!(outcome.excluded[0].model_id, "ghost");
        assert_eq!(outcome.excluded[0].status, ProbeStatus::Skipped);
        assert!(outcome.excluded[0].reason.starts_with("Model not available"));
    }

    #[tokio::test]
    async fn errored_model_is_excluded_by_default() {
        let server = MockServer::start(vec![models_listing(&["flaky"])]).await;
        let exchange =
            ScriptedExchange::new().with_model("flaky", vec![status_error(500, "boom")]);

        let outcome = runner(&server, exchange, ProbeMode::Quick)
            .run()
            .await
            .expect("run succeeds");

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.excluded[0].status, ProbeStatus::Error);
        assert!(outcome.excluded[0].reason.contains("500"));
    }

    #[tokio::test]
    async fn abort_policy_stops_the_run() {
        let server = MockServer::start(vec![models_listing(&["flaky"])]).await;
        let exchange =
            ScriptedExchange::new().with_model("flaky", vec![status_error(502, "bad gateway")]);

        let err = runner(&server, exchange, ProbeMode::Quick)
            .with_policy(TransportErrorPolicy::AbortRun)
            .run()
            .await
            .unwrap_err();

        match err {
            RunError::Aborted { model, reason } => {
                assert_eq!(model, "flaky");
                assert!(reason.contains("502"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rate_limited_model_stays_with_failed_probe() {
        let server = MockServer::start(vec![models_listing(&["busy"])]).await;
        let exchange =
            ScriptedExchange::new().with_model("busy", vec![status_error(429, "slow down")]);

        let outcome = runner(&server, exchange, ProbeMode::Quick)
            .run()
            .await
            .expect("run succeeds");

        let busy = &outcome.results[0];
        assert_eq!(busy.overall_score, 0.0);
        assert_eq!(busy.recommendation, Recommendation::NoToolCalling);
        assert_eq!(
            busy.tests[&ProbeName::BasicToolCalling].reason(),
            crate::core::probes::RATE_LIMITED_REASON
        );
    }

    #[tokio::test]
    async fn quick_mode_sends_one_request_per_model() {
        let server = MockServer::start(vec![models_listing(&["a", "b"])]).await;
        let call = || tool_calls_reply(vec![tool_call("c1", "get_weather", "{}")]);
        let exchange = Arc::new(
            ScriptedExchange::new()
                .with_model("a", vec![call()])
                .with_model("b", vec![call()]),
        );

        let outcome = Runner::new(
            reqwest::Client::new(),
            server.base_url(),
            None,
            exchange.clone(),
            ModelFilter::default(),
            Scorer::new(ScoringConfig::default(), ProbeMode::Quick),
        )
        .run()
        .await
        .expect("run succeeds");

        assert_eq!(exchange.requests().len(), 2);
        assert!(outcome
            .results
            .iter()
            .all(|result| result.overall_score == 100.0 && result.tests.len() == 1));
    }

    #[tokio::test]
    async fn concurrent_models_never_exceed_max_workers() {
        let ids = ["m1", "m2", "m3", "m4", "m5", "m6"];
        let server = MockServer::start(vec![models_listing(&ids)]).await;
        let exchange = Arc::new(InFlightExchange::default());

        let outcome = Runner::new(
            reqwest::Client::new(),
            server.base_url(),
            None,
            exchange.clone(),
            ModelFilter::default(),
            Scorer::new(ScoringConfig::default(), ProbeMode::Quick),
        )
        .with_max_workers(2)
        .run()
        .await
        .expect("run succeeds");

        assert_eq!(outcome.results.len(), ids.len());
        let peak = exchange.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak of {peak} requests in flight");
        assert!(peak > 1, "models were probed one at a time");
    }

    #[tokio::test]
    async fn progress_bar_is_hidden_unless_requested() {
        let server = MockServer::start(Vec::new()).await;
        let quiet = runner(&server, ScriptedExchange::new(), ProbeMode::Quick);
        assert!(quiet.progress_bar(3).is_hidden());

        let shown =
            runner(&server, ScriptedExchange::new(), ProbeMode::Quick).with_progress(true);
        assert_eq!(shown.progress_bar(3).length(), Some(3));
    }

    #[tokio::test]
    async fn listing_failure_yields_empty_run() {
        let server = MockServer::start(vec![MockResponse::text(503, "down")]).await;
        let outcome = runner(&server, ScriptedExchange::new(), ProbeMode::Full)
            .run()
            .await
            .expect("run succeeds");

        assert_eq!(outcome.candidates, 0);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn invalid_filter_pattern_is_a_config_error() {
        let err = Runner::from_config(&Config::default(), ProbeMode::Full, Some("(unclosed"))
            .err()
            .expect("pattern rejected");
        assert!(matches!(err, RunError::Config(ConfigError::InvalidFilter(_))));
    }

    #[test]
    fn kept_model_sums_probe_latency() {
        let scorer = Scorer::new(ScoringConfig::default(), ProbeMode::Full);
        let model = ModelInfo {
            id: "m".to_string(),
            owned_by: None,
            created: None,
        };
        let mut tests = BTreeMap::new();
        for name in ProbeName::ALL {
            let mut outcome = ProbeTimer::start(name).failed("no");
            outcome.latency_ms = 10;
            tests.insert(name, outcome);
        }

        match assess(&model, tests, &scorer) {
            ModelVerdict::Kept(result) => {
                assert_eq!(result.total_latency_ms, 50);
                assert_eq!(result.owned_by, "unknown");
                assert_eq!(result.recommendation, Recommendation::NoToolCalling);
            }
            ModelVerdict::Excluded(excluded) => panic!("unexpected exclusion: {excluded:?}"),
        }
    }
}
