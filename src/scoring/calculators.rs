//! Per-run calculators over short-term events and the task queue.
//!
//! Each one is a pure function of a borrowed slice. Events are sorted on a
//! local copy of references; the agent's memory is never reordered.

use crate::agents::{Event, Task, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Distinct event types at which knowledge use saturates
const KNOWLEDGE_SATURATION: f64 = 10.0;

/// Highest score a single resolved conflict can earn
pub const MAX_CONFLICT_SCORE: f64 = 2.0;

/// Whether `elapsed` fits within a limit of `minutes`.
///
/// A limit too large for a `Duration` holds any elapsed time; one too far
/// below zero holds none.
pub(crate) fn within_minutes(elapsed: Duration, minutes: i64) -> bool {
    match Duration::try_minutes(minutes) {
        Some(limit) => elapsed <= limit,
        None => minutes > 0,
    }
}

/// Output of a calculator that may not have a defined scoring rule yet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Component {
    Scored(f64),
    /// No scoring rule exists; contributes nothing to its composite
    Unscored,
}

impl Component {
    pub fn value(&self) -> f64 {
        match self {
            Component::Scored(v) => *v,
            Component::Unscored => 0.0,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Component::Scored(_))
    }
}

fn chronological(events: &[Event]) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.timestamp);
    sorted
}

/// Diversity of event types the agent produced
pub fn knowledge_consistency(events: &[Event]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }

    let types: HashSet<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    (types.len() as f64 / KNOWLEDGE_SATURATION).min(1.0)
}

/// Share of events that are communication or task hand-offs
pub fn communication_efficiency(events: &[Event]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }

    let communications = events
        .iter()
        .filter(|e| e.event_type == "communication" || e.event_type == "task_assignment")
        .count();

    (communications as f64 / events.len() as f64).min(1.0)
}

pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }

    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();

    completed as f64 / tasks.len() as f64
}

pub fn authority_adherence(_tasks: &[Task]) -> Component {
    Component::Unscored
}

pub fn task_appropriateness(_tasks: &[Task]) -> Component {
    Component::Unscored
}

pub fn time_efficiency(_tasks: &[Task]) -> Component {
    Component::Unscored
}

pub fn quality_score(_tasks: &[Task]) -> Component {
    Component::Unscored
}

#[derive(Debug, Default)]
struct ResourceUsage {
    is_active: bool,
    last_active: Option<DateTime<Utc>>,
    last_inactive: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    total_ms: i64,
    active_ms: i64,
    observations: u32,
}

impl ResourceUsage {
    fn activate(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            return;
        }
        self.is_active = true;
        self.last_active = Some(now);
        if let Some(idle_since) = self.last_inactive {
            self.total_ms += (now - idle_since).num_milliseconds();
        }
    }

    fn deactivate(&mut self, now: DateTime<Utc>) {
        if !self.is_active {
            return;
        }
        self.is_active = false;
        self.last_inactive = Some(now);
        if let Some(active_since) = self.last_active {
            let span = (now - active_since).num_milliseconds();
            self.active_ms += span;
            self.total_ms += span;
        }
    }

    /// Close the trailing interval at the last observation
    fn utilization(mut self) -> f64 {
        if let Some(end) = self.last_seen {
            if self.is_active {
                self.deactivate(end);
            } else if let Some(idle_since) = self.last_inactive {
                self.total_ms += (end - idle_since).num_milliseconds();
            }
        }

        if self.total_ms <= 0 {
            return 0.0;
        }
        (self.active_ms as f64 / self.total_ms as f64).clamp(0.0, 1.0)
    }
}

/// Utilization per `metadata.resource`, tracked from first activation to
/// last observation.
pub fn resource_utilization_by_resource(events: &[Event]) -> BTreeMap<String, f64> {
    let mut usage: HashMap<&str, ResourceUsage> = HashMap::new();

    for event in chronological(events) {
        let Some(resource) = event.meta("resource").and_then(|v| v.as_str()) else {
            continue;
        };
        let entry = usage.entry(resource).or_default();
        let now = event.timestamp;

        match event.event_type.as_str() {
            "resource_start" | "resource_active" => entry.activate(now),
            "resource_stop" | "resource_inactive" => entry.deactivate(now),
            _ => {}
        }

        entry.last_seen = Some(now);
        entry.observations += 1;
    }

    usage
        .into_iter()
        .filter(|(_, u)| u.observations > 0)
        .map(|(resource, u)| (resource.to_string(), u.utilization()))
        .collect()
}

/// Mean utilization across observed resources; 0.0 when none were seen
pub fn resource_utilization(events: &[Event]) -> f64 {
    let per_resource = resource_utilization_by_resource(events);
    if per_resource.is_empty() {
        return 0.0;
    }
    per_resource.values().sum::<f64>() / per_resource.len() as f64
}

#[derive(Debug, Default)]
struct ConflictState {
    start_time: Option<DateTime<Utc>>,
    resolution_time: Option<DateTime<Utc>>,
    severity: i64,
    resolved: bool,
    escalated: bool,
    resolution_path: Vec<String>,
}

impl ConflictState {
    fn score(&self) -> f64 {
        let mut score = 1.0;

        if let (Some(start), Some(end)) = (self.start_time, self.resolution_time) {
            if within_minutes(end - start, self.severity.saturating_mul(10)) {
                score += 0.5;
            }
        }
        if !self.escalated {
            score += 0.3;
        }
        if self.resolution_path.len() as i64 <= self.severity {
            score += 0.2;
        }

        score
    }
}

/// Mean score of resolved conflicts, in `(0, MAX_CONFLICT_SCORE]`.
///
/// Unresolved conflicts are left out entirely. Returns 0.0 when nothing was
/// resolved.
pub fn conflict_resolution(events: &[Event]) -> f64 {
    let mut conflicts: HashMap<&str, ConflictState> = HashMap::new();

    for event in chronological(events) {
        let Some(conflict_id) = event.meta("conflict_id").and_then(|v| v.as_str()) else {
            continue;
        };
        let conflict = conflicts.entry(conflict_id).or_default();

        match event.event_type.as_str() {
            "conflict_start" => {
                conflict.start_time = Some(event.timestamp);
                if let Some(severity) = event.meta("severity").and_then(|v| v.as_i64()) {
                    conflict.severity = severity;
                }
            }
            "conflict_resolution_step" => {
                if let Some(step) = event.meta("step").and_then(|v| v.as_str()) {
                    conflict.resolution_path.push(step.to_string());
                }
            }
            "conflict_escalation" => conflict.escalated = true,
            "conflict_resolved" => {
                conflict.resolved = true;
                conflict.resolution_time = Some(event.timestamp);
            }
            _ => {}
        }
    }

    let scores: Vec<f64> = conflicts
        .values()
        .filter(|c| c.resolved)
        .map(ConflictState::score)
        .collect();

    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}
