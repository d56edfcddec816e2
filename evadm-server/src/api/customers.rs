//! Registration listing endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use evadm_common::models::Customer;
use serde::Deserialize;

use super::{ApiError, DeleteResponse};
use crate::listing::{filter_customers, sort_records, CustomerFilter, RedemptionFilter, SortDirection, SortSpec};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub location_id: Option<String>,
    pub status: Option<String>,
    pub redemption: Option<RedemptionFilter>,
    /// Serialized field name, e.g. `fullName`
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

/// GET /api/customers
///
/// Newest registrations first unless `sort` is given.
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let filter = CustomerFilter {
        search: query.search,
        location_id: query.location_id.filter(|s| !s.is_empty()),
        status: query.status.filter(|s| !s.is_empty()),
        redemption: query.redemption,
    };

    let customers = filter_customers(state.customers.list().await?, &filter);
    let customers = match query.sort {
        Some(key) => sort_records(customers, &SortSpec::new(key, query.direction)),
        None => customers,
    };

    Ok(Json(customers))
}

/// DELETE /api/customers/:id
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.customers.delete(&id).await? {
        return Err(ApiError::NotFound(format!("Customer not found: {}", id)));
    }
    Ok(Json(DeleteResponse { deleted: true }))
}
