pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;

use state::AppState;

/// Wires every route this service exposes: health/emergency-stop, the
/// experiment CRUD + rollback + dry-run surface, topology reads and the
/// Prometheus scrape endpoint. All routes (`/metrics` included) run through
/// `track_metrics` so the scrape endpoint reports its own traffic too.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/emergency-stop", post(handlers::health::trigger_emergency_stop))
        .route(
            "/api/chaos/experiments",
            post(handlers::experiments::create_experiment).get(handlers::experiments::list_experiments),
        )
        .route("/api/chaos/experiments/:id", get(handlers::experiments::get_experiment))
        .route(
            "/api/chaos/experiments/:id/rollback",
            post(handlers::experiments::rollback_experiment),
        )
        .route("/api/chaos/dry-run", post(handlers::experiments::dry_run_experiment))
        .route("/api/topology/:provider", get(handlers::topology::get_topology))
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route_layer(from_fn(middleware::track_metrics))
        .with_state(state)
}
