//! Kitchen agents and the memory they accumulate during a run

mod memory;
mod order;
mod types;

pub use memory::{Event, Metadata, MetadataValue, Task, TaskError, TaskStatus, VectorStore};
pub use order::Order;
pub use types::{Agent, AgentRole, Memory};
