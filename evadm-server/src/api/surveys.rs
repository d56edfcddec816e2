//! Survey response endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use evadm_common::models::SurveyResponse;
use serde::Deserialize;

use super::{ApiError, DeleteResponse};
use crate::listing::{filter_surveys, sort_records, SortDirection, SortSpec, SurveyFilter};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SurveyQuery {
    pub search: Option<String>,
    pub event_location_id: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

/// GET /api/surveys
///
/// Most recent submissions first unless `sort` is given.
pub async fn list_surveys(
    State(state): State<AppState>,
    Query(query): Query<SurveyQuery>,
) -> Result<Json<Vec<SurveyResponse>>, ApiError> {
    let filter = SurveyFilter {
        search: query.search,
        event_location_id: query.event_location_id.filter(|s| !s.is_empty()),
    };

    let responses = filter_surveys(state.surveys.list().await?, &filter);
    let responses = match query.sort {
        Some(key) => sort_records(responses, &SortSpec::new(key, query.direction)),
        None => responses,
    };

    Ok(Json(responses))
}

/// GET /api/surveys/:id
pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SurveyResponse>, ApiError> {
    state
        .surveys
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Survey response not found: {}", id)))
}

/// DELETE /api/surveys/:id
pub async fn delete_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.surveys.delete(&id).await? {
        return Err(ApiError::NotFound(format!("Survey response not found: {}", id)));
    }
    Ok(Json(DeleteResponse { deleted: true }))
}
