//! Scan orchestration and operator-facing results

use std::sync::Arc;

use chrono::{DateTime, Utc};
use evadm_common::config::ScanConfig;
use evadm_common::db::DocumentStore;
use evadm_common::models::Customer;
use evadm_common::time::{format_display, Clock};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::normalize::CodeNormalizer;
use super::resolve::RecordResolver;
use super::transition::{ClearOutcome, TransitionEngine, TransitionOutcome};
use super::Workflow;

/// Result of one scan, shown to the operator at the desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Customer>,
}

impl ScanReport {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            record: None,
        }
    }

    fn with_record(success: bool, message: impl Into<String>, record: Customer) -> Self {
        Self {
            success,
            message: message.into(),
            record: Some(record),
        }
    }
}

/// Normalize, resolve and transition in one call
#[derive(Clone)]
pub struct ScanService {
    normalizer: CodeNormalizer,
    resolver: RecordResolver,
    engine: TransitionEngine,
    display_utc_offset_minutes: i32,
}

impl ScanService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        scan: &ScanConfig,
        display_utc_offset_minutes: i32,
    ) -> Self {
        Self {
            normalizer: CodeNormalizer::new(scan),
            resolver: RecordResolver::new(store.clone()),
            engine: TransitionEngine::new(store, clock),
            display_utc_offset_minutes,
        }
    }

    /// Handle one scanned code for `workflow`
    ///
    /// Never fails: store errors are logged and reported with a generic
    /// message.
    pub async fn process_scan(&self, raw: &str, workflow: Workflow) -> ScanReport {
        let key = match self.normalizer.normalize(raw) {
            Ok(key) => key,
            Err(e) => {
                info!(workflow = %workflow, "{}", e);
                return ScanReport::failure("Invalid QR code format");
            }
        };

        let not_found = || ScanReport::failure(format!("No customer found with ID number: {}", key));

        let record = match self.resolver.resolve(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(workflow = %workflow, identity_key = %key, "No registration for scanned code");
                return not_found();
            }
            Err(e) => {
                error!(workflow = %workflow, identity_key = %key, "Lookup failed: {}", e);
                return self.store_failure(workflow);
            }
        };

        match self.engine.apply(workflow, &record).await {
            Ok(TransitionOutcome::Applied { record, .. }) => {
                let message = match workflow {
                    Workflow::CheckIn => "Check-in successful",
                    Workflow::Redemption => "Gift redemption successful",
                };
                ScanReport::with_record(true, message, record)
            }
            Ok(TransitionOutcome::AlreadyApplied { previous, record }) => {
                let at = self.display_time(previous.as_ref());
                let message = match workflow {
                    Workflow::CheckIn => format!("User has already checked in at {}", at),
                    Workflow::Redemption => format!("Gift has already been redeemed at {}", at),
                };
                ScanReport::with_record(false, message, record)
            }
            Ok(TransitionOutcome::OtherStatus { status, record }) => {
                ScanReport::with_record(false, format!("User status is {}", status), record)
            }
            Ok(TransitionOutcome::NotFound) => not_found(),
            Err(e) => {
                error!(workflow = %workflow, record_id = %record.id, "Transition failed: {}", e);
                self.store_failure(workflow)
            }
        }
    }

    /// Reset `workflow` on a registration; false if the record is unknown
    /// or the store fails
    pub async fn clear_status(&self, record_id: &str, workflow: Workflow) -> bool {
        self.clear(record_id, workflow).await == ClearOutcome::ClearApplied
    }

    /// [`clear_status`](Self::clear_status) with the failure kind kept
    pub async fn clear(&self, record_id: &str, workflow: Workflow) -> ClearOutcome {
        self.engine.clear(workflow, record_id).await
    }

    fn store_failure(&self, workflow: Workflow) -> ScanReport {
        ScanReport::failure(format!("An error occurred while processing the {}", workflow))
    }

    fn display_time(&self, at: Option<&DateTime<Utc>>) -> String {
        match at {
            Some(ts) => format_display(ts, self.display_utc_offset_minutes),
            None => "an unknown time".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use evadm_common::db::{
        encode_fields, ConditionalUpdate, Document, FieldUpdates, Fields, MemoryDocumentStore,
        OrderBy, Precondition,
    };
    use evadm_common::models::REGISTRATIONS;
    use evadm_common::{Error, Result};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Store whose every call fails
    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn find_by_field(&self, _: &str, _: &str, _: &str) -> Result<Vec<Document>> {
            Err(Error::Internal("store offline".to_string()))
        }
        async fn get(&self, _: &str, _: &str) -> Result<Option<Document>> {
            Err(Error::Internal("store offline".to_string()))
        }
        async fn list(&self, _: &str, _: Option<&OrderBy>) -> Result<Vec<Document>> {
            Err(Error::Internal("store offline".to_string()))
        }
        async fn put(&self, _: &str, _: &str, _: Fields) -> Result<Document> {
            Err(Error::Internal("store offline".to_string()))
        }
        async fn update_fields(&self, _: &str, _: &str, _: &FieldUpdates) -> Result<Document> {
            Err(Error::Internal("store offline".to_string()))
        }
        async fn update_fields_if(
            &self,
            _: &str,
            _: &str,
            _: &Precondition,
            _: &FieldUpdates,
        ) -> Result<ConditionalUpdate> {
            Err(Error::Internal("store offline".to_string()))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<bool> {
            Err(Error::Internal("store offline".to_string()))
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 5, 18, 1, 5, 0).unwrap()))
    }

    async fn service_with(record: Customer, offset: i32) -> ScanService {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .put(REGISTRATIONS, &record.id, encode_fields(&record).unwrap())
            .await
            .unwrap();
        ScanService::new(store, clock(), &ScanConfig::default(), offset)
    }

    fn attendee() -> Customer {
        Customer {
            id: "r1".to_string(),
            id_number: "950920-08-6687".to_string(),
            full_name: "Tan Ah Kow".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_code_message() {
        let service = service_with(attendee(), 0).await;
        let report = service.process_scan("12345", Workflow::CheckIn).await;
        assert_eq!(report, ScanReport::failure("Invalid QR code format"));
    }

    #[tokio::test]
    async fn test_unknown_key_message() {
        let service = service_with(attendee(), 0).await;
        let report = service.process_scan("010101010101", Workflow::Redemption).await;
        assert!(!report.success);
        assert_eq!(report.message, "No customer found with ID number: 010101-01-0101");
        assert!(report.record.is_none());
    }

    #[tokio::test]
    async fn test_repeat_message_uses_display_offset() {
        // UTC+8
        let service = service_with(attendee(), 480).await;

        let first = service.process_scan("aux-training-950920086687", Workflow::CheckIn).await;
        assert!(first.success);
        assert_eq!(first.message, "Check-in successful");

        let second = service.process_scan("950920-08-6687", Workflow::CheckIn).await;
        assert!(!second.success);
        assert_eq!(second.message, "User has already checked in at May 18, 2025 9:05 AM");
        assert!(second.record.is_some());
    }

    #[tokio::test]
    async fn test_redemption_messages() {
        let service = service_with(attendee(), 0).await;

        let first = service.process_scan("950920086687", Workflow::Redemption).await;
        assert_eq!(first.message, "Gift redemption successful");
        assert!(first.record.as_ref().is_some_and(|r| r.redeemed_gift));

        let second = service.process_scan("950920086687", Workflow::Redemption).await;
        assert_eq!(second.message, "Gift has already been redeemed at May 18, 2025 1:05 AM");
    }

    #[tokio::test]
    async fn test_other_status_message() {
        let record = Customer {
            status: Some("cancelled".to_string()),
            ..attendee()
        };
        let service = service_with(record, 0).await;

        let report = service.process_scan("950920086687", Workflow::CheckIn).await;
        assert!(!report.success);
        assert_eq!(report.message, "User status is cancelled");
    }

    #[tokio::test]
    async fn test_store_failure_is_generic() {
        let service = ScanService::new(Arc::new(BrokenStore), clock(), &ScanConfig::default(), 0);

        let report = service.process_scan("950920086687", Workflow::CheckIn).await;
        assert_eq!(
            report,
            ScanReport::failure("An error occurred while processing the check-in")
        );

        let report = service.process_scan("950920086687", Workflow::Redemption).await;
        assert_eq!(report.message, "An error occurred while processing the gift redemption");

        assert!(!service.clear_status("r1", Workflow::CheckIn).await);
        assert_eq!(service.clear("r1", Workflow::CheckIn).await, ClearOutcome::ClearFailed);
    }

    #[tokio::test]
    async fn test_clear_unknown_record() {
        let service = service_with(attendee(), 0).await;
        assert!(!service.clear_status("nobody", Workflow::Redemption).await);
        assert_eq!(
            service.clear("nobody", Workflow::Redemption).await,
            ClearOutcome::RecordMissing
        );
    }

    #[tokio::test]
    async fn test_clear_status_reports_success() {
        let service = service_with(attendee(), 0).await;
        service.process_scan("950920086687", Workflow::CheckIn).await;

        assert!(service.clear_status("r1", Workflow::CheckIn).await);
        let again = service.process_scan("950920086687", Workflow::CheckIn).await;
        assert!(again.success);
    }
}
