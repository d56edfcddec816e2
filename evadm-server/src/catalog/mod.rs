//! Record catalogs backing the dashboard listings
//!
//! Thin typed wrappers over document store collections. Filtering and
//! sorting of the returned lists is in [`crate::listing`].

use evadm_common::db::Document;
use serde::de::DeserializeOwned;
use tracing::warn;

pub mod customers;
pub mod locations;
pub mod surveys;

pub use customers::{CustomerCatalog, WorkflowSummary};
pub use locations::LocationCatalog;
pub use surveys::SurveyCatalog;

/// Decode a listing, skipping documents that do not fit the model
fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match doc.decode() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection, id = %doc.id, "Skipping malformed document: {}", e);
                None
            }
        })
        .collect()
}
