//! Event locations

use std::sync::Arc;

use chrono::SecondsFormat;
use evadm_common::db::{encode_fields, DocumentStore, FieldUpdates, OrderBy};
use evadm_common::models::{fields, EventLocation, EventLocationPatch, NewEventLocation, EVENT_LOCATIONS};
use evadm_common::time::Clock;
use evadm_common::Result;
use serde_json::Value;
use tracing::info;

use super::decode_all;

#[derive(Clone)]
pub struct LocationCatalog {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl LocationCatalog {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All locations, newest first
    pub async fn list(&self) -> Result<Vec<EventLocation>> {
        let docs = self
            .store
            .list(EVENT_LOCATIONS, Some(&OrderBy::desc(fields::CREATED_AT)))
            .await?;
        Ok(decode_all(EVENT_LOCATIONS, docs))
    }

    /// Apply the fields present in `patch` and stamp `updatedAt`
    ///
    /// Fails with `Error::NotFound` for an unknown id.
    pub async fn update(&self, id: &str, patch: &EventLocationPatch) -> Result<EventLocation> {
        let updates =
            FieldUpdates::from_fields(encode_fields(patch)?).set(fields::UPDATED_AT, self.stamp());

        let doc = self.store.update_fields(EVENT_LOCATIONS, id, &updates).await?;
        info!(location_id = id, "Event location updated");
        doc.decode()
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete(EVENT_LOCATIONS, id).await?;
        if deleted {
            info!(location_id = id, "Event location deleted");
        }
        Ok(deleted)
    }

    /// Insert each location under a fresh id, all sharing one creation stamp
    pub async fn bulk_upload(&self, locations: &[NewEventLocation]) -> Result<Vec<EventLocation>> {
        let stamp = self.stamp();
        let mut created = Vec::with_capacity(locations.len());

        for location in locations {
            let mut body = encode_fields(location)?;
            body.insert(fields::CREATED_AT.to_string(), stamp.clone());
            body.insert(fields::UPDATED_AT.to_string(), stamp.clone());

            let doc = self.store.insert(EVENT_LOCATIONS, body).await?;
            created.push(doc.decode()?);
        }

        info!(count = created.len(), "Uploaded event locations");
        Ok(created)
    }

    fn stamp(&self) -> Value {
        Value::String(self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
