use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use scorecard::airtable::RecordTransport;
use scorecard::analysis::HierarchyNode;
use scorecard::domain::{AuditStatus, Criticality};
use scorecard::error::AppError;
use scorecard::service::{ScorecardService, SimulationOutcome, SimulationRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct FunctionScoreView {
    pub(crate) function: String,
    /// Canonical 0-100 scale.
    pub(crate) score: f64,
    /// 0-10 scale shown on the dashboard.
    pub(crate) display_score: f64,
    pub(crate) kpi_count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) functions: Vec<FunctionScoreView>,
    pub(crate) global_score: f64,
    pub(crate) global_display_score: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimulateRequest {
    pub(crate) requests: Vec<SimulationRequest>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KpiValueUpdate {
    pub(crate) value: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    pub(crate) status: AuditStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CriticalityUpdate {
    pub(crate) criticality: Criticality,
}

pub(crate) fn with_dashboard_routes<T>(service: Arc<ScorecardService<T>>) -> Router
where
    T: RecordTransport + 'static,
{
    Router::new()
        .route("/api/v1/dashboard", get(dashboard_endpoint::<T>))
        .route("/api/v1/audit/hierarchy", get(hierarchy_endpoint::<T>))
        .route("/api/v1/impact/simulate", post(simulate_endpoint::<T>))
        .route("/api/v1/projects", get(action_items_endpoint::<T>))
        .route("/api/v1/projects/:table", get(projects_endpoint::<T>))
        .route("/api/v1/kpis/:id/value", patch(kpi_value_endpoint::<T>))
        .route("/api/v1/audit/:id/status", patch(audit_status_endpoint::<T>))
        .route(
            "/api/v1/audit/:id/criticality",
            patch(audit_criticality_endpoint::<T>),
        )
        .route(
            "/api/v1/tasks/:table/:id/status",
            patch(task_status_endpoint::<T>),
        )
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(service)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn dashboard_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
) -> Result<Json<DashboardResponse>, AppError>
where
    T: RecordTransport + 'static,
{
    let scores = service.dashboard().await?;
    let functions = scores
        .functions
        .iter()
        .map(|entry| FunctionScoreView {
            function: entry.function.clone(),
            score: entry.score,
            display_score: entry.display_score(),
            kpi_count: entry.kpi_count,
        })
        .collect();

    Ok(Json(DashboardResponse {
        functions,
        global_score: scores.global,
        global_display_score: scores.global_display(),
    }))
}

pub(crate) async fn hierarchy_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
) -> Result<Json<BTreeMap<String, HierarchyNode>>, AppError>
where
    T: RecordTransport + 'static,
{
    Ok(Json(service.audit_hierarchy().await?))
}

pub(crate) async fn simulate_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
    Json(payload): Json<SimulateRequest>,
) -> Result<Json<SimulationOutcome>, AppError>
where
    T: RecordTransport + 'static,
{
    Ok(Json(service.simulate(&payload.requests).await?))
}

pub(crate) async fn action_items_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: RecordTransport + 'static,
{
    let table = service.action_items_table().to_string();
    let tasks = service.fetch_tasks(&table).await?;
    Ok(Json(json!({ "table": table, "tasks": tasks })))
}

pub(crate) async fn projects_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
    Path(table): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: RecordTransport + 'static,
{
    let tasks = service.fetch_tasks(&table).await?;
    Ok(Json(json!({ "table": table, "tasks": tasks })))
}

pub(crate) async fn kpi_value_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
    Path(kpi_id): Path<String>,
    Json(payload): Json<KpiValueUpdate>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: RecordTransport + 'static,
{
    service.update_kpi_value(&kpi_id, payload.value).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub(crate) async fn audit_status_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
    Path(item_id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: RecordTransport + 'static,
{
    service.update_audit_status(&item_id, payload.status).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub(crate) async fn audit_criticality_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
    Path(item_id): Path<String>,
    Json(payload): Json<CriticalityUpdate>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: RecordTransport + 'static,
{
    service
        .update_audit_criticality(&item_id, payload.criticality)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub(crate) async fn task_status_endpoint<T>(
    State(service): State<Arc<ScorecardService<T>>>,
    Path((table, task_id)): Path<(String, String)>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: RecordTransport + 'static,
{
    service
        .update_task_status(&table, &task_id, payload.status)
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}
