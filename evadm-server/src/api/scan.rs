//! Check-in and gift redemption endpoints
//!
//! Both workflows expose the same three routes, nested under
//! `/api/checkin` and `/api/redemption`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::catalog::WorkflowSummary;
use crate::scan::{ClearOutcome, ScanReport, Workflow};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Raw scanner or keyboard input
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub location_id: Option<String>,
}

/// POST /api/{workflow}/scan
pub async fn scan(
    State(state): State<AppState>,
    workflow: Workflow,
    Json(request): Json<ScanRequest>,
) -> Json<ScanReport> {
    Json(state.scan.process_scan(&request.code, workflow).await)
}

/// POST /api/{workflow}/:id/clear
pub async fn clear(
    State(state): State<AppState>,
    workflow: Workflow,
    Path(id): Path<String>,
) -> (StatusCode, Json<ClearResponse>) {
    let status = match state.scan.clear(&id, workflow).await {
        ClearOutcome::ClearApplied => StatusCode::OK,
        ClearOutcome::RecordMissing => StatusCode::NOT_FOUND,
        ClearOutcome::ClearFailed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let success = status == StatusCode::OK;
    (status, Json(ClearResponse { success }))
}

/// GET /api/{workflow}/summary
pub async fn summary(
    State(state): State<AppState>,
    workflow: Workflow,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<WorkflowSummary>, ApiError> {
    let location_id = query.location_id.as_deref().filter(|s| !s.is_empty());
    let summary = state.customers.summary(workflow, location_id).await?;
    Ok(Json(summary))
}

pub fn workflow_routes(workflow: Workflow) -> Router<AppState> {
    Router::new()
        .route(
            "/scan",
            post(move |state: State<AppState>, body: Json<ScanRequest>| scan(state, workflow, body)),
        )
        .route(
            "/:id/clear",
            post(move |state: State<AppState>, id: Path<String>| clear(state, workflow, id)),
        )
        .route(
            "/summary",
            get(move |state: State<AppState>, query: Query<SummaryQuery>| {
                summary(state, workflow, query)
            }),
        )
}
