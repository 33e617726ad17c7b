// Composite scoring - combines calculator outputs into the four per-agent
// scores. The calculators themselves live in `calculators` and `trends`.

pub mod calculators;
pub mod trends;

use crate::agents::Agent;
use crate::eval::Scenario;
use calculators::{Component, MAX_CONFLICT_SCORE};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Weight of the leading component in every composite
const PRIMARY_WEIGHT: f64 = 0.4;
/// Weight of each of the two supporting components
const SECONDARY_WEIGHT: f64 = 0.3;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{composite} evaluation failed: {reason}")]
    Composite {
        composite: &'static str,
        reason: String,
    },
}

/// Scores for one agent after one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMetrics {
    pub role_coherence: f64,
    pub task_completion: f64,
    pub coordination_score: f64,
    pub long_term_consistency: f64,
    pub quality_score: f64,
    pub efficiency_score: f64,
    /// Components with no scoring rule that contributed 0.0
    pub unscored: Vec<&'static str>,
}

impl AgentMetrics {
    /// Mean of the four composites
    pub fn overall(&self) -> f64 {
        (self.role_coherence
            + self.task_completion
            + self.coordination_score
            + self.long_term_consistency)
            / 4.0
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("role_coherence".to_string(), self.role_coherence),
            ("task_completion".to_string(), self.task_completion),
            ("coordination".to_string(), self.coordination_score),
            ("long_term_consistency".to_string(), self.long_term_consistency),
            ("quality_score".to_string(), self.quality_score),
            ("efficiency_score".to_string(), self.efficiency_score),
            ("overall_score".to_string(), self.overall()),
        ])
    }
}

/// Weighted 0.4/0.3/0.3 combination of three components
fn weighted(primary: Component, second: Component, third: Component) -> f64 {
    primary.value() * PRIMARY_WEIGHT
        + second.value() * SECONDARY_WEIGHT
        + third.value() * SECONDARY_WEIGHT
}

fn unscored_names<'a>(
    components: &'a [(&'static str, Component)],
) -> impl Iterator<Item = &'static str> + 'a {
    components
        .iter()
        .filter(|(_, c)| !c.is_scored())
        .map(|(name, _)| *name)
}

/// Knowledge 0.4, authority 0.3, task appropriateness 0.3
pub fn evaluate_role_coherence(agent: &Agent) -> Result<f64, ScoringError> {
    let tasks = &agent.memory.task_queue;
    Ok(weighted(
        Component::Scored(calculators::knowledge_consistency(&agent.memory.short_term)),
        calculators::authority_adherence(tasks),
        calculators::task_appropriateness(tasks),
    ))
}

/// Completion rate 0.4, time efficiency 0.3, quality 0.3
pub fn evaluate_task_completion(agent: &Agent) -> Result<f64, ScoringError> {
    let tasks = &agent.memory.task_queue;
    Ok(weighted(
        Component::Scored(calculators::completion_rate(tasks)),
        calculators::time_efficiency(tasks),
        calculators::quality_score(tasks),
    ))
}

/// Communication 0.4, resource utilization 0.3, conflict resolution 0.3
pub fn evaluate_coordination(agent: &Agent) -> Result<f64, ScoringError> {
    let events = &agent.memory.short_term;
    Ok(weighted(
        Component::Scored(calculators::communication_efficiency(events)),
        Component::Scored(calculators::resource_utilization(events)),
        Component::Scored(calculators::conflict_resolution(events) / MAX_CONFLICT_SCORE),
    ))
}

/// Decision consistency 0.4, learning progression 0.3, adaptation 0.3
pub fn evaluate_long_term_consistency(agent: &Agent) -> Result<f64, ScoringError> {
    let store = &agent.memory.long_term;
    Ok(weighted(
        Component::Scored(trends::decision_consistency(store)),
        Component::Scored(trends::learning_progression(store)),
        Component::Scored(trends::normalized_adaptation(store)),
    ))
}

/// Score an agent's memory from one run against a scenario
pub fn evaluate_agent(agent: &Agent, scenario: &Scenario) -> Result<AgentMetrics, ScoringError> {
    debug!(
        "Scoring agent {} ({}) on scenario {}",
        agent.id, agent.role, scenario.id
    );

    let tasks = &agent.memory.task_queue;
    let quality = calculators::quality_score(tasks);
    let efficiency = calculators::time_efficiency(tasks);

    let components = [
        ("authority_adherence", calculators::authority_adherence(tasks)),
        ("task_appropriateness", calculators::task_appropriateness(tasks)),
        ("time_efficiency", efficiency),
        ("quality_score", quality),
    ];

    Ok(AgentMetrics {
        role_coherence: evaluate_role_coherence(agent)?,
        task_completion: evaluate_task_completion(agent)?,
        coordination_score: evaluate_coordination(agent)?,
        long_term_consistency: evaluate_long_term_consistency(agent)?,
        quality_score: quality.value(),
        efficiency_score: efficiency.value(),
        unscored: unscored_names(&components).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentRole, Event, Task, TaskStatus};
    use crate::eval::ScenarioCatalog;
    use crate::metadata;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_agent() -> Agent {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let mut agent = Agent::new("sous-1", AgentRole::SousChef);

        agent.record_event(Event::new(t0, "communication", "Two more covers on 7"));
        agent.record_event(Event::new(t0 + Duration::minutes(1), "task_assignment", "Plate table 7"));
        agent.record_event(
            Event::new(t0, "resource_start", "Oven on").with_meta("resource", "oven"),
        );
        agent.record_event(
            Event::new(t0 + Duration::minutes(20), "resource_stop", "Oven off")
                .with_meta("resource", "oven"),
        );
        agent.record_event(
            Event::new(t0 + Duration::minutes(2), "conflict_start", "Fight over the grill")
                .with_meta("conflict_id", "c1")
                .with_meta("severity", 2i64),
        );
        agent.record_event(
            Event::new(t0 + Duration::minutes(6), "conflict_resolved", "Grill split")
                .with_meta("conflict_id", "c1"),
        );

        agent.assign_task(Task::new("t1", "plate", "").with_status(TaskStatus::Completed));
        agent.assign_task(Task::new("t2", "plate", "").with_status(TaskStatus::InProgress));

        agent.memory.long_term.record(
            "d1",
            metadata! { "category" => "specials", "decision" => 0.5 },
        );
        agent.memory.long_term.record(
            "d2",
            metadata! { "category" => "specials", "decision" => 0.5 },
        );
        agent
    }

    #[test]
    fn test_weighted_score() {
        let score = weighted(
            Component::Scored(0.5),
            Component::Scored(1.0),
            Component::Unscored,
        );
        // 0.5 * 0.4 + 1.0 * 0.3 + 0 = 0.5
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_agent() {
        let catalog = ScenarioCatalog::builtin();
        let scenario = catalog.get("busy_night").unwrap();
        let agent = sample_agent();

        let metrics = evaluate_agent(&agent, scenario).unwrap();

        // 6 distinct types over 10, weighted 0.4
        assert!((metrics.role_coherence - 0.24).abs() < 1e-9);
        // half the tasks completed, weighted 0.4
        assert!((metrics.task_completion - 0.2).abs() < 1e-9);
        // comm 2/6, oven fully used, one perfect conflict
        let expected = (2.0 / 6.0) * 0.4 + 1.0 * 0.3 + 1.0 * 0.3;
        assert!((metrics.coordination_score - expected).abs() < 1e-9);
        // consistent decisions, neutral learning, neutral adaptation
        let expected = 1.0 * 0.4 + 0.5 * 0.3 + 0.5 * 0.3;
        assert!((metrics.long_term_consistency - expected).abs() < 1e-9);

        assert_eq!(metrics.quality_score, 0.0);
        assert_eq!(metrics.efficiency_score, 0.0);
        assert_eq!(metrics.unscored.len(), 4);
        assert!(metrics.unscored.contains(&"time_efficiency"));
    }

    #[test]
    fn test_composites_stay_in_unit_range() {
        let agent = sample_agent();
        for score in [
            evaluate_role_coherence(&agent).unwrap(),
            evaluate_task_completion(&agent).unwrap(),
            evaluate_coordination(&agent).unwrap(),
            evaluate_long_term_consistency(&agent).unwrap(),
        ] {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_empty_agent_scores() {
        let agent = Agent::new("porter-1", AgentRole::KitchenPorter);
        assert_eq!(evaluate_task_completion(&agent).unwrap(), 0.0);
        assert_eq!(evaluate_coordination(&agent).unwrap(), 0.0);
        assert!(evaluate_long_term_consistency(&agent).unwrap() > 0.0);
    }

    #[test]
    fn test_no_long_term_history_is_neutral() {
        let agent = Agent::new("cook-1", AgentRole::LineCook);
        let score = evaluate_long_term_consistency(&agent).unwrap();
        assert!((score - trends::NEUTRAL_SCORE).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_map_has_overall() {
        let catalog = ScenarioCatalog::builtin();
        let agent = sample_agent();
        let metrics = evaluate_agent(&agent, catalog.get("busy_night").unwrap()).unwrap();
        let map = metrics.as_map();

        assert_eq!(map["overall_score"], metrics.overall());
        assert_eq!(map["coordination"], metrics.coordination_score);
    }
}
