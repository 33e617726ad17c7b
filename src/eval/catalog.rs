//! Built-in model and scenario catalogs.
//!
//! Both are plain values built once at startup and shared behind `Arc`;
//! nothing mutates them afterwards.

use crate::agents::Task;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A model that can be put in charge of the brigade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    /// Provider family, e.g. `openai`
    #[serde(rename = "type")]
    pub provider: String,
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
}

impl ModelInfo {
    fn new(id: &str, name: &str, provider: &str, max_tokens: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            max_tokens,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        Self {
            models: vec![
                ModelInfo::new("gpt4", "GPT-4 Turbo", "openai", 128_000),
                ModelInfo::new("claude3", "Claude 3 Sonnet", "anthropic", 200_000),
                ModelInfo::new("gemini", "Gemini 1.5 Pro", "google", 100_000),
                ModelInfo::new("mixtral", "Mixtral 8x7B", "local", 32_000),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn list(&self) -> &[ModelInfo] {
        &self.models
    }
}

/// What part of kitchen management a scenario stresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Operational,
    Inventory,
    Resource,
    Quality,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Operational => write!(f, "operational"),
            ScenarioKind::Inventory => write!(f, "inventory"),
            ScenarioKind::Resource => write!(f, "resource"),
            ScenarioKind::Quality => write!(f, "quality"),
        }
    }
}

/// A named test configuration a model is evaluated against
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub kind: ScenarioKind,
    pub description: String,
    pub duration: Duration,
    /// 1 (gentle) to 5 (brutal)
    pub difficulty: u8,
    /// Work the brigade is expected to get through
    pub tasks: Vec<Task>,
    /// Targets the scenario is judged against
    pub metrics: BTreeMap<String, f64>,
}

impl Scenario {
    fn new(
        id: &str,
        name: &str,
        kind: ScenarioKind,
        description: &str,
        duration_minutes: u64,
        difficulty: u8,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            description: description.to_string(),
            duration: Duration::from_secs(duration_minutes * 60),
            difficulty,
            tasks: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    fn with_target(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioCatalog {
    pub fn new(scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        Self {
            scenarios: scenarios.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Operational, inventory, resource and quality scenarios
    pub fn builtin() -> Self {
        Self::new([
            Scenario::new(
                "busy_night",
                "Busy Night",
                ScenarioKind::Operational,
                "High-volume service with double the normal orders and limited staff.",
                240,
                4,
            )
            .with_task(Task::new("expedite", "service", "Run the pass at double volume").with_priority(1))
            .with_target("target_ticket_minutes", 18.0)
            .with_target("min_completion_rate", 0.9),
            Scenario::new(
                "overstocked",
                "Overstocked Kitchen",
                ScenarioKind::Inventory,
                "Manage an overstocked kitchen with expiring ingredients.",
                180,
                2,
            )
            .with_task(Task::new("rotate-stock", "inventory", "Use expiring stock first"))
            .with_target("max_waste_ratio", 0.1),
            Scenario::new(
                "slow_business",
                "Slow Business",
                ScenarioKind::Operational,
                "Optimize kitchen operations during a slow night with low customer volume.",
                180,
                1,
            )
            .with_target("min_staff_utilization", 0.5),
            Scenario::new(
                "low_inventory",
                "Low Inventory",
                ScenarioKind::Inventory,
                "Handle service with critically low stock of essential ingredients.",
                210,
                3,
            )
            .with_task(Task::new("substitute", "menu", "Adjust specials around shortages").with_priority(1))
            .with_target("max_86_items", 3.0),
            Scenario::new(
                "high_labor",
                "High Labor Cost",
                ScenarioKind::Resource,
                "Optimize staff utilization in an overstaffed kitchen.",
                180,
                3,
            )
            .with_target("min_staff_utilization", 0.75),
            Scenario::new(
                "quality_control",
                "Quality Control",
                ScenarioKind::Quality,
                "Maintain stringent quality standards during normal service volume.",
                240,
                3,
            )
            .with_task(Task::new("inspect", "quality", "Check every plate at the pass"))
            .with_target("min_accuracy_percent", 95.0),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.scenarios.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios() {
        let catalog = ScenarioCatalog::builtin();
        assert_eq!(catalog.len(), 6);

        for id in [
            "busy_night",
            "overstocked",
            "slow_business",
            "low_inventory",
            "high_labor",
            "quality_control",
        ] {
            assert!(catalog.contains(id), "missing scenario {id}");
        }
        assert!(!catalog.contains("non_existent_scenario"));
    }

    #[test]
    fn test_scenario_kinds_cover_all_areas() {
        let catalog = ScenarioCatalog::builtin();
        assert_eq!(catalog.get("high_labor").unwrap().kind, ScenarioKind::Resource);
        assert_eq!(catalog.get("quality_control").unwrap().kind.to_string(), "quality");
        assert_eq!(
            catalog.get("busy_night").unwrap().duration,
            Duration::from_secs(4 * 3600)
        );
    }

    #[test]
    fn test_model_catalog() {
        let models = ModelCatalog::builtin();
        assert!(models.contains("gpt4"));
        assert!(!models.contains("does-not-exist"));
        assert_eq!(models.get("claude3").unwrap().max_tokens, 200_000);

        let json = serde_json::to_value(models.get("gemini").unwrap()).unwrap();
        assert_eq!(json["type"], "google");
        assert_eq!(json["maxTokens"], 100_000);
    }
}
