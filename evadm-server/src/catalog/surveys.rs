//! Post-event survey responses

use std::sync::Arc;

use evadm_common::db::{DocumentStore, OrderBy};
use evadm_common::models::{fields, SurveyResponse, SURVEY_RESPONSES};
use evadm_common::Result;
use tracing::info;

use super::decode_all;

#[derive(Clone)]
pub struct SurveyCatalog {
    store: Arc<dyn DocumentStore>,
}

impl SurveyCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All responses, most recently submitted first
    pub async fn list(&self) -> Result<Vec<SurveyResponse>> {
        let docs = self
            .store
            .list(SURVEY_RESPONSES, Some(&OrderBy::desc(fields::SUBMITTED)))
            .await?;
        Ok(decode_all(SURVEY_RESPONSES, docs))
    }

    pub async fn get(&self, id: &str) -> Result<Option<SurveyResponse>> {
        self.store
            .get(SURVEY_RESPONSES, id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete(SURVEY_RESPONSES, id).await?;
        if deleted {
            info!(response_id = id, "Survey response deleted");
        }
        Ok(deleted)
    }
}
