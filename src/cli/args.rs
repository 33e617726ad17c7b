use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ESCOFFIER-EVAL: kitchen brigade evaluation playground
///
/// Scores language models acting as a restaurant kitchen staff against
/// built-in scenarios, and streams results to connected clients.
#[derive(Parser, Debug)]
#[command(name = "escoffier-eval")]
#[command(version = "0.1.0")]
#[command(about = "Evaluate LLM kitchen agents against service scenarios")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the playground config file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the playground server
    Serve(ServeArgs),

    /// Run a single evaluation and print the result
    Evaluate(EvaluateArgs),

    /// List available models
    Models,

    /// List available scenarios
    Scenarios,

    /// Generate a sample playground config file
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Override the configured port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the configured host
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Model id, e.g. gpt4
    #[arg(short, long)]
    pub model: String,

    /// Scenario id, e.g. busy_night
    #[arg(short, long)]
    pub scenario: String,

    /// Score a recorded run trace instead of synthetic data
    #[arg(long)]
    pub trace: bool,

    /// Directory to write the JSON result and markdown report to
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output path for the config file
    #[arg(short, long, default_value = "playground.yaml")]
    pub output: PathBuf,
}
