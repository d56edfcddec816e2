//! Event location endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use evadm_common::models::{EventLocation, EventLocationPatch, EventLocationStatus, NewEventLocation};
use serde::{Deserialize, Serialize};

use super::{ApiError, DeleteResponse};
use crate::listing::{filter_locations, sort_locations, LocationFilter, SortDirection, SortSpec};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub search: Option<String>,
    pub status: Option<EventLocationStatus>,
    /// Defaults to `pos`
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub locations: Vec<NewEventLocation>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub locations: Vec<EventLocation>,
}

/// GET /api/locations
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Vec<EventLocation>>, ApiError> {
    let filter = LocationFilter {
        search: query.search,
        status: query.status,
    };
    let sort = SortSpec::new(query.sort.unwrap_or_else(|| "pos".to_string()), query.direction);

    let locations = filter_locations(state.locations.list().await?, &filter);
    Ok(Json(sort_locations(locations, &sort)))
}

/// POST /api/locations
pub async fn upload_locations(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let locations = state.locations.bulk_upload(&request.locations).await?;
    let message = format!("Successfully uploaded {} event locations.", locations.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            message,
            locations,
        }),
    ))
}

/// PUT /api/locations/:id
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EventLocationPatch>,
) -> Result<Json<EventLocation>, ApiError> {
    Ok(Json(state.locations.update(&id, &patch).await?))
}

/// DELETE /api/locations/:id
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.locations.delete(&id).await? {
        return Err(ApiError::NotFound(format!("Event location not found: {}", id)));
    }
    Ok(Json(DeleteResponse { deleted: true }))
}
