//! Evaluation and telemetry engine for LLM agents staffing a simulated
//! restaurant kitchen.
//!
//! The `escoffier-eval` binary wraps this library with a command line and
//! the playground server.

pub mod agents;
pub mod cli;
pub mod eval;
pub mod monitoring;
pub mod scoring;
pub mod web;
