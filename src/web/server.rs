//! Server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::state::AppState;
use super::{handlers, ws};
use crate::cli::{MetricsSettings, ServerSettings};

/// Build the playground router
pub fn build_router(state: Arc<AppState>, metrics: &MetricsSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/models", get(handlers::list_models))
        .route("/api/scenarios", get(handlers::list_scenarios))
        .route(
            "/api/metrics",
            get(handlers::get_metrics).delete(handlers::reset_metrics),
        )
        .route("/api/evaluate", post(handlers::start_evaluation))
        .route("/ws", get(ws::ws_handler));

    if metrics.enabled {
        router = router.route(&metrics.path, get(handlers::prometheus_metrics));
    }

    router.layer(cors).with_state(state)
}

/// Start the playground server
pub async fn start_server(
    state: Arc<AppState>,
    server: &ServerSettings,
    metrics: &MetricsSettings,
) -> anyhow::Result<()> {
    let app = build_router(state, metrics);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    info!("Starting playground server on http://{}", addr);
    if metrics.enabled {
        info!("Prometheus metrics at http://{}{}", addr, metrics.path);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
