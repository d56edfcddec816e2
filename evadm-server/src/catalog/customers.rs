//! Attendee registrations

use std::sync::Arc;

use evadm_common::db::{DocumentStore, OrderBy};
use evadm_common::models::{fields, Customer, REGISTRATIONS};
use evadm_common::Result;
use serde::Serialize;
use tracing::info;

use super::decode_all;
use crate::scan::Workflow;

/// Progress of one workflow across registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    pub total: usize,
    /// Registrations checked in, or with the gift redeemed
    pub applied: usize,
}

#[derive(Clone)]
pub struct CustomerCatalog {
    store: Arc<dyn DocumentStore>,
}

impl CustomerCatalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All registrations, newest first
    pub async fn list(&self) -> Result<Vec<Customer>> {
        let docs = self
            .store
            .list(REGISTRATIONS, Some(&OrderBy::desc(fields::CREATED_AT)))
            .await?;
        Ok(decode_all(REGISTRATIONS, docs))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete(REGISTRATIONS, id).await?;
        if deleted {
            info!(record_id = id, "Registration deleted");
        }
        Ok(deleted)
    }

    /// Totals for `workflow`, optionally restricted to one event location
    pub async fn summary(&self, workflow: Workflow, location_id: Option<&str>) -> Result<WorkflowSummary> {
        let customers = self.list().await?;
        let in_scope: Vec<&Customer> = customers
            .iter()
            .filter(|c| location_id.map_or(true, |loc| c.location_id.as_deref() == Some(loc)))
            .collect();

        let applied = in_scope
            .iter()
            .filter(|c| match workflow {
                Workflow::CheckIn => c.is_checked_in(),
                Workflow::Redemption => c.redeemed_gift,
            })
            .count();

        Ok(WorkflowSummary {
            total: in_scope.len(),
            applied,
        })
    }
}
