use crate::engine::InterceptionEngine;
use crate::hits::{HitCounter, HitRecord};
use crate::rule::Rule;
use crate::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::info;

/// Shared state for metrics
#[derive(Debug, Default)]
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub intercepted_requests: AtomicU64,
    pub passed_through_requests: AtomicU64,
}

/// State shared by the admin routes
#[derive(Clone)]
pub struct AdminState {
    pub metrics: Arc<Metrics>,
    pub engine: Arc<InterceptionEngine>,
    pub hits: HitCounter,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct MetricsResponse {
    total_requests: u64,
    intercepted_requests: u64,
    passed_through_requests: u64,
    active_rules: usize,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/rules", get(rules_handler))
        .route("/hits", get(hits_handler))
        .route("/hits/:origin", get(origin_hits_handler).delete(clear_hits_handler))
        .with_state(state)
}

pub async fn start_admin_server(port: u16, state: AdminState) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting Admin API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        crate::error::MockError::Network(format!("Failed to bind admin port {}: {}", port, e))
    })?;

    axum::serve(listener, admin_router(state))
        .await
        .map_err(|e| crate::error::MockError::Network(format!("Admin server failed: {}", e)))?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn metrics_handler(State(state): State<AdminState>) -> Json<MetricsResponse> {
    let metrics = &state.metrics;
    Json(MetricsResponse {
        total_requests: metrics.total_requests.load(Ordering::Relaxed),
        intercepted_requests: metrics.intercepted_requests.load(Ordering::Relaxed),
        passed_through_requests: metrics.passed_through_requests.load(Ordering::Relaxed),
        active_rules: state.engine.rules().iter().filter(|rule| rule.is_active()).count(),
    })
}

async fn rules_handler(State(state): State<AdminState>) -> Json<Vec<Rule>> {
    Json(state.engine.rules())
}

async fn hits_handler(
    State(state): State<AdminState>,
) -> Json<HashMap<String, HashMap<String, HitRecord>>> {
    Json(state.hits.snapshot())
}

async fn origin_hits_handler(
    State(state): State<AdminState>,
    Path(origin): Path<String>,
) -> Json<HashMap<String, HitRecord>> {
    Json(state.hits.hits_for(&origin))
}

async fn clear_hits_handler(
    State(state): State<AdminState>,
    Path(origin): Path<String>,
) -> StatusCode {
    info!("Clearing hits for {}", origin);
    state.hits.clear(&origin);
    StatusCode::NO_CONTENT
}
