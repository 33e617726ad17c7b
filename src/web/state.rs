//! Shared state for the playground server

use crate::cli::TransportSettings;
use crate::eval::{EvalError, EvaluationResult, Evaluator, ModelCatalog};
use crate::monitoring::{MetricsCollector, Monitor};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A client's request to evaluate a model on a scenario
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluationRequest {
    pub model: String,
    pub scenario: String,
}

/// Application state shared across handlers and connections
pub struct AppState {
    pub models: Arc<ModelCatalog>,
    pub evaluator: Arc<Evaluator>,
    pub monitor: Arc<Monitor>,
    pub collector: Arc<MetricsCollector>,
    pub transport: TransportSettings,
}

impl AppState {
    pub fn new(
        models: Arc<ModelCatalog>,
        evaluator: Arc<Evaluator>,
        monitor: Arc<Monitor>,
        collector: Arc<MetricsCollector>,
        transport: TransportSettings,
    ) -> Self {
        Self {
            models,
            evaluator,
            monitor,
            collector,
            transport,
        }
    }

    /// Check both ids against the catalogs, model first
    pub fn validate(&self, request: &EvaluationRequest) -> Result<(), EvalError> {
        if !self.models.contains(&request.model) {
            return Err(EvalError::UnknownModel(request.model.clone()));
        }
        if !self.evaluator.has_scenario(&request.scenario) {
            return Err(EvalError::UnknownScenario(request.scenario.clone()));
        }
        Ok(())
    }

    /// Validate, evaluate, and publish the metrics to the monitor
    pub async fn run_evaluation(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, EvalError> {
        self.validate(request)?;

        let result = match self
            .evaluator
            .evaluate_model(&request.model, &request.scenario)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                if e.is_invalid_request() {
                    warn!("Rejected evaluation of {} on {}: {}", request.model, request.scenario, e);
                } else {
                    error!(
                        "Evaluation of {} on {} failed: {}",
                        request.model, request.scenario, e
                    );
                }
                return Err(e);
            }
        };

        self.monitor
            .record_evaluation_result(&result.model, &result.scenario, &result.metrics)
            .await;
        info!(
            "Recorded {} metrics for {} on {}",
            result.metrics.len(),
            result.model,
            result.scenario
        );
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) fn test_state(transport: TransportSettings) -> Arc<AppState> {
    use crate::eval::{ScenarioCatalog, SyntheticEvaluation};
    use std::time::Duration;

    let evaluator = Evaluator::new(
        Arc::new(ScenarioCatalog::builtin()),
        Arc::new(SyntheticEvaluation::new(Duration::ZERO, 5, Some(1))),
    );
    Arc::new(AppState::new(
        Arc::new(ModelCatalog::builtin()),
        Arc::new(evaluator),
        Arc::new(Monitor::new()),
        Arc::new(MetricsCollector::new().unwrap()),
        transport,
    ))
}
