//! evadm-server library - event administration service
//!
//! Scan-driven check-in and gift redemption plus the registration, event
//! location and survey catalogs behind the admin dashboard.

use std::sync::Arc;

use axum::Router;
use evadm_common::config::ServiceConfig;
use evadm_common::db::DocumentStore;
use evadm_common::time::Clock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod listing;
pub mod scan;

use catalog::{CustomerCatalog, LocationCatalog, SurveyCatalog};
use scan::{ScanService, Workflow};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub scan: ScanService,
    pub customers: CustomerCatalog,
    pub locations: LocationCatalog,
    pub surveys: SurveyCatalog,
    /// 0 disables API authentication
    pub shared_secret: i64,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: &ServiceConfig,
        shared_secret: i64,
    ) -> Self {
        Self {
            scan: ScanService::new(
                store.clone(),
                clock.clone(),
                &config.scan,
                config.display_utc_offset_minutes,
            ),
            customers: CustomerCatalog::new(store.clone()),
            locations: LocationCatalog::new(store.clone(), clock),
            surveys: SurveyCatalog::new(store),
            shared_secret,
        }
    }
}

/// Build application router
///
/// `/health` is public; everything under `/api` passes the auth middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, put};

    let protected = Router::new()
        .nest("/api/checkin", api::workflow_routes(Workflow::CheckIn))
        .nest("/api/redemption", api::workflow_routes(Workflow::Redemption))
        .route("/api/customers", get(api::list_customers))
        .route("/api/customers/:id", delete(api::delete_customer))
        .route(
            "/api/locations",
            get(api::list_locations).post(api::upload_locations),
        )
        .route(
            "/api/locations/:id",
            put(api::update_location).delete(api::delete_location),
        )
        .route("/api/surveys", get(api::list_surveys))
        .route(
            "/api/surveys/:id",
            get(api::get_survey).delete(api::delete_survey),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
