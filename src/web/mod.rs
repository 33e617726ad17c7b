//! Playground server for ESCOFFIER-EVAL
//!
//! Provides:
//! 1. A JSON API for listing models and scenarios and starting evaluations
//! 2. A WebSocket channel that streams evaluation results back to the client
//! 3. Prometheus exposition of kitchen telemetry

mod handlers;
mod server;
mod state;
mod ws;

pub use server::start_server;
pub use state::AppState;
