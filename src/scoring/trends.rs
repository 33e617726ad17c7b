//! Long-horizon analyzers over the long-term store.
//!
//! These read records written across many decisions, so a short history is
//! not held against the agent: every analyzer falls back to
//! [`NEUTRAL_SCORE`] when no group has enough data. Records missing a
//! required field are skipped.

use super::calculators::within_minutes;
use crate::agents::{Metadata, VectorStore};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub const NEUTRAL_SCORE: f64 = 0.5;

/// Highest score a single successful adaptation can earn
pub const MAX_ADAPTATION_SCORE: f64 = 1.5;

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// How stable numeric decisions are within each `category`
pub fn decision_consistency(store: &VectorStore) -> f64 {
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();

    for record in store.records() {
        let decision = record.get("decision").and_then(|v| v.as_f64());
        let category = record.get("category").and_then(|v| v.as_str());
        if let (Some(decision), Some(category)) = (decision, category) {
            groups.entry(category).or_default().push(decision);
        }
    }

    let per_group: Vec<f64> = groups
        .values()
        .filter(|decisions| decisions.len() >= 2)
        .filter_map(|decisions| {
            let avg = mean(decisions)?;
            let variance = decisions.iter().map(|d| (d - avg).powi(2)).sum::<f64>()
                / decisions.len() as f64;
            Some(1.0 - variance.min(1.0))
        })
        .collect();

    mean(&per_group).unwrap_or(NEUTRAL_SCORE)
}

/// Least-squares slope of `y` over its index
fn index_slope(ys: &[f64]) -> f64 {
    let n = ys.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);

    for (i, y) in ys.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Whether each agent's performance trends upward over time
pub fn learning_progression(store: &VectorStore) -> f64 {
    let mut progress: HashMap<&str, Vec<(DateTime<Utc>, f64)>> = HashMap::new();

    for record in store.records() {
        let agent_id = record.get("agent_id").and_then(|v| v.as_str());
        let timestamp = record.get("timestamp").and_then(|v| v.as_timestamp());
        let score = record.get("performance_score").and_then(|v| v.as_f64());

        if let (Some(agent_id), Some(timestamp), Some(score)) = (agent_id, timestamp, score) {
            progress.entry(agent_id).or_default().push((timestamp, score));
        }
    }

    let per_agent: Vec<f64> = progress
        .into_values()
        .filter(|samples| samples.len() >= 2)
        .map(|mut samples| {
            samples.sort_by_key(|(timestamp, _)| *timestamp);
            let scores: Vec<f64> = samples.into_iter().map(|(_, score)| score).collect();
            (index_slope(&scores) + 0.5).clamp(0.0, 1.0)
        })
        .collect();

    mean(&per_agent).unwrap_or(NEUTRAL_SCORE)
}

#[derive(Debug, Default)]
struct AdaptationState {
    introduced_at: Option<DateTime<Utc>>,
    detected_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    successful_adaptation: bool,
    complexity: i64,
}

impl AdaptationState {
    fn apply(&mut self, record: &Metadata) {
        let timestamp = record.get("timestamp").and_then(|v| v.as_timestamp());

        match record.get("event_type").and_then(|v| v.as_str()) {
            Some("change_introduced") => {
                self.introduced_at = timestamp;
                if let Some(complexity) = record.get("complexity").and_then(|v| v.as_i64()) {
                    self.complexity = complexity;
                }
            }
            Some("change_detected") => self.detected_at = timestamp,
            Some("adaptation_complete") => {
                self.completed_at = timestamp;
                if let Some(success) = record.get("success").and_then(|v| v.as_bool()) {
                    self.successful_adaptation = success;
                }
            }
            _ => {}
        }
    }

    fn change_detection_time(&self) -> Option<Duration> {
        Some(self.detected_at? - self.introduced_at?)
    }

    fn response_time(&self) -> Option<Duration> {
        Some(self.completed_at? - self.detected_at?)
    }

    fn score(&self) -> f64 {
        let mut score = 1.0;

        if let Some(detection) = self.change_detection_time() {
            if within_minutes(detection, self.complexity) {
                score += 0.3;
            }
        }
        if let Some(response) = self.response_time() {
            if within_minutes(response, self.complexity.saturating_mul(2)) {
                score += 0.2;
            }
        }

        score
    }
}

/// Mean adaptation score over successful scenarios; `None` without any
fn adaptation_mean(store: &VectorStore) -> Option<f64> {
    let mut scenarios: HashMap<&str, AdaptationState> = HashMap::new();

    for record in store.records() {
        if let Some(scenario_id) = record.get("scenario_id").and_then(|v| v.as_str()) {
            scenarios.entry(scenario_id).or_default().apply(record);
        }
    }

    let per_scenario: Vec<f64> = scenarios
        .values()
        .filter(|s| s.successful_adaptation)
        .map(AdaptationState::score)
        .collect();

    mean(&per_scenario)
}

/// How quickly the agent noticed and absorbed introduced changes.
///
/// Per successful scenario the score lies in `[1.0, MAX_ADAPTATION_SCORE]`.
pub fn adaptation_capability(store: &VectorStore) -> f64 {
    adaptation_mean(store).unwrap_or(NEUTRAL_SCORE)
}

/// [`adaptation_capability`] scaled into `[0, 1]`.
///
/// Only an observed score is scaled; the neutral default passes through.
pub fn normalized_adaptation(store: &VectorStore) -> f64 {
    adaptation_mean(store)
        .map(|score| score / MAX_ADAPTATION_SCORE)
        .unwrap_or(NEUTRAL_SCORE)
}
