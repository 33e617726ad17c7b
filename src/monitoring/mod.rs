mod collector;
mod monitor;

pub use collector::MetricsCollector;
pub use monitor::Monitor;
