use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// A single value in an open metadata map.
///
/// Variants are tried in declaration order when deserializing, so RFC 3339
/// strings become timestamps and everything else that is a string stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            MetadataValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Bool(b) => serde_json::Value::from(*b),
            MetadataValue::Integer(i) => serde_json::Value::from(*i),
            MetadataValue::Float(f) => serde_json::Value::from(*f),
            MetadataValue::Timestamp(t) => serde_json::Value::from(t.to_rfc3339()),
            MetadataValue::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(value: DateTime<Utc>) -> Self {
        MetadataValue::Timestamp(value)
    }
}

/// Open key/value map attached to events, tasks and long-term records
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Something an agent did, said, or observed during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    /// Free-form tag, e.g. `communication` or `resource_start`
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, event_type: &str, content: &str) -> Self {
        Self {
            timestamp,
            event_type: event_type.to_string(),
            content: content.to_string(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Failed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("task {id} is already {status} and cannot move to {requested}")]
    Terminal {
        id: String,
        status: TaskStatus,
        requested: TaskStatus,
    },
}

/// A unit of work in an agent's queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Ids of tasks that must finish first, in order
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Task {
    pub fn new(id: &str, task_type: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            task_type: task_type.to_string(),
            description: description.to_string(),
            priority: 0,
            status: TaskStatus::Pending,
            start_time: None,
            end_time: None,
            dependencies: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Move the task to `status`, stamping start/end times on the way.
    ///
    /// Terminal tasks are frozen: once completed, cancelled or failed they
    /// reject every further transition.
    pub fn transition_to(&mut self, status: TaskStatus, at: DateTime<Utc>) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(TaskError::Terminal {
                id: self.id.clone(),
                status: self.status,
                requested: status,
            });
        }

        if status == TaskStatus::InProgress && self.start_time.is_none() {
            self.start_time = Some(at);
        }
        if status.is_terminal() {
            self.end_time = Some(at);
        }
        self.status = status;
        Ok(())
    }
}

/// Associative store of labeled long-term records.
///
/// Embeddings are kept alongside for the agent layer; the evaluation engine
/// only ever scans `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorStore {
    #[serde(default)]
    embeddings: HashMap<String, Vec<f32>>,
    #[serde(default)]
    metadata: HashMap<String, Metadata>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, embedding: Vec<f32>, metadata: Metadata) {
        self.embeddings.insert(id.to_string(), embedding);
        self.metadata.insert(id.to_string(), metadata);
    }

    /// Store a record that has no embedding
    pub fn record(&mut self, id: &str, metadata: Metadata) {
        self.metadata.insert(id.to_string(), metadata);
    }

    pub fn metadata(&self, id: &str) -> Option<&Metadata> {
        self.metadata.get(id)
    }

    pub fn embedding(&self, id: &str) -> Option<&[f32]> {
        self.embeddings.get(id).map(Vec::as_slice)
    }

    pub fn records(&self) -> impl Iterator<Item = &Metadata> {
        self.metadata.values()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Build a [`Metadata`] map inline
#[macro_export]
macro_rules! metadata {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::agents::Metadata::new();
        $(map.insert($key.to_string(), $crate::agents::MetadataValue::from($value));)*
        map
    }};
}
