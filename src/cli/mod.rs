mod args;
mod config;

pub use args::{Args, Command, EvaluateArgs, InitArgs, ServeArgs};
pub use config::{MetricsSettings, PlaygroundConfig, ServerSettings, TransportSettings};
