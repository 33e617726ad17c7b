//! Scores recorded kitchen runs.
//!
//! A run trace is the serialized state of every agent after one model ran one
//! scenario, plus the tickets that passed through the kitchen. Traces live at
//! `{traces_dir}/{model}/{scenario}.{yaml,yml,json}`.

use crate::agents::{Agent, Order};
use crate::eval::{EvalError, Evaluation, EvaluationMode, EvaluationStrategy, EventLog, Scenario};
use crate::monitoring::MetricsCollector;
use crate::scoring::{self, calculators};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TRACE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Everything recorded during one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl RunTrace {
    pub async fn load(path: &Path) -> Result<Self, EvalError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| EvalError::TraceRead {
                path: path.to_path_buf(),
                source,
            })?;

        let parsed = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| EvalError::TraceParse {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Ids become path segments, so keep them to a safe alphabet
fn is_safe_segment(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub struct TraceEvaluation {
    traces_dir: PathBuf,
    collector: Arc<MetricsCollector>,
}

impl TraceEvaluation {
    pub fn new(traces_dir: impl Into<PathBuf>, collector: Arc<MetricsCollector>) -> Self {
        Self {
            traces_dir: traces_dir.into(),
            collector,
        }
    }

    fn not_found(&self, model_id: &str, scenario_id: &str) -> EvalError {
        EvalError::TraceNotFound {
            model: model_id.to_string(),
            scenario: scenario_id.to_string(),
            dir: self.traces_dir.clone(),
        }
    }

    async fn find_trace(&self, model_id: &str, scenario_id: &str) -> Option<PathBuf> {
        if !is_safe_segment(model_id) || !is_safe_segment(scenario_id) {
            warn!("Refusing trace lookup for {:?}/{:?}", model_id, scenario_id);
            return None;
        }

        let base = self.traces_dir.join(model_id);
        for ext in TRACE_EXTENSIONS {
            let candidate = base.join(format!("{}.{}", scenario_id, ext));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    /// Publish one agent's telemetry
    fn record_agent(&self, agent: &Agent) {
        let role = agent.role.to_string();
        let station = agent.station();
        let events = &agent.memory.short_term;

        self.collector.record_utilization(
            &role,
            station,
            calculators::resource_utilization(events) * 100.0,
        );
        self.collector.record_accuracy(
            station,
            &role,
            calculators::completion_rate(&agent.memory.task_queue) * 100.0,
        );
        for (resource, utilization) in calculators::resource_utilization_by_resource(events) {
            self.collector.record_efficiency(&resource, utilization * 100.0);
        }
    }
}

#[async_trait]
impl EvaluationStrategy for TraceEvaluation {
    fn mode(&self) -> EvaluationMode {
        EvaluationMode::Trace
    }

    async fn evaluate(&self, model_id: &str, scenario: &Scenario) -> Result<Evaluation, EvalError> {
        let path = self
            .find_trace(model_id, &scenario.id)
            .await
            .ok_or_else(|| self.not_found(model_id, &scenario.id))?;

        info!("Loading run trace {:?}", path);
        let trace = RunTrace::load(&path).await?;
        if trace.agents.is_empty() {
            return Err(EvalError::TraceParse {
                path,
                reason: "trace contains no agents".to_string(),
            });
        }

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut events = Vec::new();

        for agent in &trace.agents {
            let scores = scoring::evaluate_agent(agent, scenario)?;
            if !scores.unscored.is_empty() {
                debug!("Agent {} unscored components: {:?}", agent.id, scores.unscored);
            }
            for (name, value) in scores.as_map() {
                *totals.entry(name).or_default() += value;
            }

            self.record_agent(agent);
            events.extend(
                agent
                    .memory
                    .short_term
                    .iter()
                    .map(|event| EventLog::from_agent_event(&agent.id, event)),
            );
        }

        let agent_count = trace.agents.len() as f64;
        let mut metrics: BTreeMap<String, f64> = totals
            .into_iter()
            .map(|(name, total)| (name, total / agent_count))
            .collect();
        metrics.insert("agents_evaluated".to_string(), agent_count);

        let mut completed_orders = 0;
        for order in &trace.orders {
            if order.completed_at.is_some() {
                completed_orders += 1;
            }
            self.collector.record_order_completion(order);
        }
        metrics.insert("orders_completed".to_string(), completed_orders as f64);

        // Stable sort keeps per-agent order for simultaneous events
        events.sort_by_key(|event| event.timestamp);

        Ok(Evaluation { metrics, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentRole, Event, Task, TaskStatus};
    use crate::eval::ScenarioCatalog;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_trace() -> RunTrace {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();

        let mut cook = Agent::new("cook-1", AgentRole::LineCook).with_station("grill");
        cook.record_event(Event::new(t0, "resource_start", "Grill on").with_meta("resource", "grill"));
        cook.record_event(
            Event::new(t0 + Duration::minutes(30), "resource_stop", "Grill off")
                .with_meta("resource", "grill"),
        );
        cook.assign_task(Task::new("t1", "sear", "").with_status(TaskStatus::Completed));

        let mut sous = Agent::new("sous-1", AgentRole::SousChef);
        sous.record_event(Event::new(t0 + Duration::minutes(5), "communication", "Fire table 4"));

        RunTrace {
            agents: vec![cook, sous],
            orders: vec![Order {
                id: "o1".to_string(),
                order_type: "main_course".to_string(),
                complexity: 2,
                received_at: t0,
                completed_at: Some(t0 + Duration::minutes(14)),
            }],
        }
    }

    async fn write_trace(dir: &Path, model: &str, file: &str, trace: &RunTrace) {
        let model_dir = dir.join(model);
        tokio::fs::create_dir_all(&model_dir).await.unwrap();
        let body = if file.ends_with(".json") {
            serde_json::to_string(trace).unwrap()
        } else {
            serde_yaml::to_string(trace).unwrap()
        };
        tokio::fs::write(model_dir.join(file), body).await.unwrap();
    }

    #[tokio::test]
    async fn test_trace_is_scored_and_recorded() {
        let dir = TempDir::new().unwrap();
        write_trace(dir.path(), "gpt4", "busy_night.yaml", &sample_trace()).await;

        let collector = Arc::new(MetricsCollector::new().unwrap());
        let strategy = TraceEvaluation::new(dir.path(), collector.clone());
        let catalog = ScenarioCatalog::builtin();

        let evaluation = strategy
            .evaluate("gpt4", catalog.get("busy_night").unwrap())
            .await
            .unwrap();

        assert_eq!(evaluation.metrics["agents_evaluated"], 2.0);
        assert_eq!(evaluation.metrics["orders_completed"], 1.0);
        // cook completed 1/1, sous has no tasks: (0.4 + 0.0) / 2
        assert!((evaluation.metrics["task_completion"] - 0.2).abs() < 1e-9);

        // Merged log is chronological across agents
        let kinds: Vec<&str> = evaluation.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, ["resource_start", "communication", "resource_stop"]);
        assert_eq!(evaluation.events[1].data["agent_id"], "sous-1");

        let text = collector.render().unwrap();
        assert!(text.contains(r#"resource_utilization_percent{role="line_cook",station="grill"} 100"#));
        assert!(text.contains(r#"resource_efficiency_percent{resource_type="grill"} 100"#));
        assert!(text.contains("order_completion_time_seconds_count"));
    }

    #[tokio::test]
    async fn test_json_trace_is_found() {
        let dir = TempDir::new().unwrap();
        write_trace(dir.path(), "claude3", "high_labor.json", &sample_trace()).await;

        let strategy = TraceEvaluation::new(dir.path(), Arc::new(MetricsCollector::new().unwrap()));
        let catalog = ScenarioCatalog::builtin();
        let evaluation = strategy
            .evaluate("claude3", catalog.get("high_labor").unwrap())
            .await
            .unwrap();
        assert_eq!(evaluation.events.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_trace_is_an_error() {
        let dir = TempDir::new().unwrap();
        let strategy = TraceEvaluation::new(dir.path(), Arc::new(MetricsCollector::new().unwrap()));
        let catalog = ScenarioCatalog::builtin();

        let err = strategy
            .evaluate("gemini", catalog.get("busy_night").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::TraceNotFound { .. }));
        assert!(!err.is_invalid_request());
    }

    #[tokio::test]
    async fn test_empty_trace_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_trace(dir.path(), "gpt4", "overstocked.yml", &RunTrace::default()).await;

        let strategy = TraceEvaluation::new(dir.path(), Arc::new(MetricsCollector::new().unwrap()));
        let catalog = ScenarioCatalog::builtin();
        let err = strategy
            .evaluate("gpt4", catalog.get("overstocked").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::TraceParse { .. }));
    }

    #[test]
    fn test_path_segments_are_checked() {
        assert!(is_safe_segment("gpt4"));
        assert!(is_safe_segment("busy_night"));
        assert!(!is_safe_segment("../etc"));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment(""));
    }
}
