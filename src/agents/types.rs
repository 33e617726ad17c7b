use super::memory::{Event, Task, VectorStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kitchen brigade roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Runs the pass and owns menu decisions
    ExecutiveChef,
    /// Second in command, supervises stations
    SousChef,
    /// Station chef
    ChefDePartie,
    LineCook,
    PrepCook,
    KitchenPorter,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::ExecutiveChef => write!(f, "executive_chef"),
            AgentRole::SousChef => write!(f, "sous_chef"),
            AgentRole::ChefDePartie => write!(f, "chef_de_partie"),
            AgentRole::LineCook => write!(f, "line_cook"),
            AgentRole::PrepCook => write!(f, "prep_cook"),
            AgentRole::KitchenPorter => write!(f, "kitchen_porter"),
        }
    }
}

impl AgentRole {
    /// Station label used when an agent does not name its own
    pub fn home_station(&self) -> &'static str {
        match self {
            AgentRole::ExecutiveChef | AgentRole::SousChef => "pass",
            AgentRole::ChefDePartie | AgentRole::LineCook => "line",
            AgentRole::PrepCook => "prep",
            AgentRole::KitchenPorter => "dish",
        }
    }
}

/// Everything an agent accumulated during one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub short_term: Vec<Event>,
    #[serde(default)]
    pub long_term: VectorStore,
    #[serde(default)]
    pub task_queue: Vec<Task>,
}

/// The unit of evaluation: one kitchen role during one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub role: AgentRole,
    /// Station the agent worked; falls back to the role's home station
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub memory: Memory,
    #[serde(default)]
    pub task_queue: Vec<Task>,
    #[serde(default)]
    pub performance: BTreeMap<String, f64>,
}

impl Agent {
    pub fn new(id: &str, role: AgentRole) -> Self {
        Self {
            id: id.to_string(),
            role,
            station: None,
            memory: Memory::default(),
            task_queue: Vec::new(),
            performance: BTreeMap::new(),
        }
    }

    pub fn with_station(mut self, station: &str) -> Self {
        self.station = Some(station.to_string());
        self
    }

    pub fn station(&self) -> &str {
        self.station
            .as_deref()
            .unwrap_or_else(|| self.role.home_station())
    }

    /// Append to short-term memory. Order of arrival does not matter.
    pub fn record_event(&mut self, event: Event) {
        self.memory.short_term.push(event);
    }

    pub fn assign_task(&mut self, task: Task) {
        self.memory.task_queue.push(task);
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.memory.task_queue.iter_mut().find(|t| t.id == id)
    }
}
