use crate::agents::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Randomized stand-in scores
    Synthetic,
    /// Scored from a recorded run trace
    Trace,
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationMode::Synthetic => write!(f, "synthetic"),
            EvaluationMode::Trace => write!(f, "trace"),
        }
    }
}

/// A timestamped entry in an evaluation's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl EventLog {
    pub fn new(timestamp: DateTime<Utc>, event_type: &str) -> Self {
        Self {
            timestamp,
            event_type: event_type.to_string(),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Flatten an agent event, tagging it with the agent that produced it
    pub fn from_agent_event(agent_id: &str, event: &Event) -> Self {
        let mut log = Self::new(event.timestamp, &event.event_type)
            .with("agent_id", agent_id)
            .with("content", event.content.as_str());
        for (key, value) in &event.metadata {
            log.data.insert(key.clone(), value.to_json());
        }
        log
    }
}

/// Metrics and events for one (model, scenario) evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub run_id: String,
    pub model: String,
    pub scenario: String,
    pub mode: EvaluationMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
    pub events: Vec<EventLog>,
}

impl EvaluationResult {
    pub fn overall_score(&self) -> Option<f64> {
        self.metrics.get("overall_score").copied()
    }

    /// Save the result to a JSON file
    pub fn save_json(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Human-readable markdown report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "# Evaluation: {} on {}\n\n",
            self.model, self.scenario
        ));
        report.push_str(&format!("Run ID: {}\n", self.run_id));
        report.push_str(&format!("Mode: {}\n", self.mode));
        report.push_str(&format!("Started: {}\n", self.started_at));
        report.push_str(&format!("Completed: {}\n\n", self.completed_at));

        report.push_str("## Metrics\n\n");
        report.push_str("| Metric | Value |\n");
        report.push_str("|--------|-------|\n");
        for (name, value) in &self.metrics {
            report.push_str(&format!("| {} | {:.3} |\n", name, value));
        }

        report.push_str(&format!("\n## Events ({})\n\n", self.events.len()));
        for event in &self.events {
            report.push_str(&format!(
                "- {} `{}` {}\n",
                event.timestamp.format("%H:%M:%S"),
                event.event_type,
                Value::Object(event.data.clone())
            ));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_result() -> EvaluationResult {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        EvaluationResult {
            run_id: "run-1".to_string(),
            model: "gpt4".to_string(),
            scenario: "busy_night".to_string(),
            mode: EvaluationMode::Synthetic,
            started_at: t0,
            completed_at: t0,
            metrics: BTreeMap::from([
                ("overall_score".to_string(), 0.82),
                ("coordination".to_string(), 0.7),
            ]),
            events: vec![EventLog::new(t0, "task_started").with("task_id", "task_1")],
        }
    }

    #[test]
    fn test_event_log_wire_shape() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let log = EventLog::new(t0, "quality_check").with("severity", 3);
        let json = serde_json::to_value(&log).unwrap();

        assert_eq!(json["type"], "quality_check");
        assert_eq!(json["data"]["severity"], 3);
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-06-01T18:00:00"));
    }

    #[test]
    fn test_from_agent_event_flattens_metadata() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let event = Event::new(t0, "resource_start", "Grill on").with_meta("resource", "grill");
        let log = EventLog::from_agent_event("cook-1", &event);

        assert_eq!(log.event_type, "resource_start");
        assert_eq!(log.data["agent_id"], "cook-1");
        assert_eq!(log.data["resource"], "grill");
        assert_eq!(log.data["content"], "Grill on");
    }

    #[test]
    fn test_report_lists_metrics() {
        let result = sample_result();
        let report = result.generate_report();

        assert!(report.contains("# Evaluation: gpt4 on busy_night"));
        assert!(report.contains("| overall_score | 0.820 |"));
        assert!(report.contains("Mode: synthetic"));
        assert_eq!(result.overall_score(), Some(0.82));
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert_eq!(json["mode"], "synthetic");
        assert_eq!(json["events"][0]["data"]["task_id"], "task_1");
    }
}
