use crate::eval::{EvaluationMode, EvaluationResult, EventLog, Scenario, ScenarioCatalog};
use crate::scoring::ScoringError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid model: {0}")]
    UnknownModel(String),

    #[error("Invalid scenario: {0}")]
    UnknownScenario(String),

    #[error("no run trace for model {model} on scenario {scenario} under {dir:?}")]
    TraceNotFound {
        model: String,
        scenario: String,
        dir: PathBuf,
    },

    #[error("failed to read run trace {path:?}: {source}")]
    TraceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid run trace {path:?}: {reason}")]
    TraceParse { path: PathBuf, reason: String },

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl EvalError {
    /// True when the caller asked for something that does not exist
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, EvalError::UnknownModel(_) | EvalError::UnknownScenario(_))
    }
}

/// Metrics and events produced by a strategy, before run bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub metrics: BTreeMap<String, f64>,
    pub events: Vec<EventLog>,
}

/// A way of turning a (model, scenario) pair into scores
#[async_trait]
pub trait EvaluationStrategy: Send + Sync {
    fn mode(&self) -> EvaluationMode;

    async fn evaluate(&self, model_id: &str, scenario: &Scenario) -> Result<Evaluation, EvalError>;
}

/// Runs evaluations against the scenario catalog
pub struct Evaluator {
    scenarios: Arc<ScenarioCatalog>,
    strategy: Arc<dyn EvaluationStrategy>,
}

impl Evaluator {
    pub fn new(scenarios: Arc<ScenarioCatalog>, strategy: Arc<dyn EvaluationStrategy>) -> Self {
        Self {
            scenarios,
            strategy,
        }
    }

    pub fn has_scenario(&self, id: &str) -> bool {
        self.scenarios.contains(id)
    }

    pub fn scenarios(&self) -> &ScenarioCatalog {
        &self.scenarios
    }

    pub fn mode(&self) -> EvaluationMode {
        self.strategy.mode()
    }

    /// Evaluate one model against one scenario.
    ///
    /// The model id is not checked here; callers validate it against the
    /// model catalog first.
    pub async fn evaluate_model(
        &self,
        model_id: &str,
        scenario_id: &str,
    ) -> Result<EvaluationResult, EvalError> {
        let scenario = self.scenarios.get(scenario_id).ok_or_else(|| {
            warn!("Rejected evaluation for unknown scenario {}", scenario_id);
            EvalError::UnknownScenario(scenario_id.to_string())
        })?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(
            "Evaluating model {} on scenario {} ({} mode, run {})",
            model_id,
            scenario_id,
            self.strategy.mode(),
            run_id
        );

        let evaluation = self.strategy.evaluate(model_id, scenario).await?;

        let result = EvaluationResult {
            run_id,
            model: model_id.to_string(),
            scenario: scenario_id.to_string(),
            mode: self.strategy.mode(),
            started_at,
            completed_at: Utc::now(),
            metrics: evaluation.metrics,
            events: evaluation.events,
        };

        info!(
            "Evaluation {} finished: overall {:.3}, {} events",
            result.run_id,
            result.overall_score().unwrap_or(0.0),
            result.events.len()
        );
        Ok(result)
    }
}
