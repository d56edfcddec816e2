//! Status transition engine
//!
//! Both workflows are one-way switches on a registration: check-in sets
//! `status = "checked-in"` plus `checkTimeStamp`, redemption sets
//! `redeemedGift = true` plus `redemptionTimeStamp`. Each stays set until
//! explicitly cleared.
//!
//! `apply` is a single conditional write: the store checks that the
//! workflow's field is still unset and writes in the same step. When two
//! terminals scan the same badge at once exactly one of them sees
//! `Applied`; the other is classified from the state the store observed.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use evadm_common::db::{ConditionalUpdate, DocumentStore, FieldUpdates, Precondition};
use evadm_common::models::{fields, Customer, CHECKED_IN, REGISTRATIONS};
use evadm_common::time::Clock;
use evadm_common::{Error, Result};
use serde_json::Value;
use tracing::{error, info, warn};

use super::Workflow;

/// Result of [`TransitionEngine::apply`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Fresh transition; `record` reflects the written fields
    Applied { at: DateTime<Utc>, record: Customer },
    /// Already in the target state since `previous`
    AlreadyApplied {
        previous: Option<DateTime<Utc>>,
        record: Customer,
    },
    /// Check-in only: the record carries a status this workflow must not overwrite
    OtherStatus { status: String, record: Customer },
    /// The record disappeared between lookup and write
    NotFound,
}

/// Result of [`TransitionEngine::clear`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    ClearApplied,
    /// No registration with that id
    RecordMissing,
    ClearFailed,
}

/// Applies and clears workflow state on registrations
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl TransitionEngine {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn apply(&self, workflow: Workflow, record: &Customer) -> Result<TransitionOutcome> {
        let now = self.clock.now();
        let stamp = timestamp_value(&now);

        let (guard, updates) = match workflow {
            Workflow::CheckIn => (
                Precondition::unset(fields::STATUS),
                FieldUpdates::new()
                    .set(fields::STATUS, CHECKED_IN)
                    .set(fields::CHECK_TIME_STAMP, stamp),
            ),
            Workflow::Redemption => (
                Precondition::unset(fields::REDEEMED_GIFT),
                FieldUpdates::new()
                    .set(fields::REDEEMED_GIFT, true)
                    .set(fields::REDEMPTION_TIME_STAMP, stamp),
            ),
        };

        let written = self
            .store
            .update_fields_if(REGISTRATIONS, &record.id, &guard, &updates)
            .await?;

        let outcome = match written {
            ConditionalUpdate::Applied(doc) => {
                info!(workflow = %workflow, record_id = %record.id, "Transition applied");
                TransitionOutcome::Applied {
                    at: now,
                    record: doc.decode()?,
                }
            }
            ConditionalUpdate::Rejected(doc) => {
                let current: Customer = doc.decode()?;
                let outcome = classify_rejection(workflow, current);
                info!(workflow = %workflow, record_id = %record.id, outcome = outcome_kind(&outcome), "Transition rejected");
                outcome
            }
            ConditionalUpdate::Missing => {
                info!(workflow = %workflow, record_id = %record.id, "Record vanished before transition");
                TransitionOutcome::NotFound
            }
        };

        Ok(outcome)
    }

    /// Reset the workflow fields; succeeds even if nothing was set
    pub async fn clear(&self, workflow: Workflow, record_id: &str) -> ClearOutcome {
        let updates = match workflow {
            Workflow::CheckIn => FieldUpdates::new()
                .delete(fields::STATUS)
                .delete(fields::CHECK_TIME_STAMP),
            Workflow::Redemption => FieldUpdates::new()
                .set(fields::REDEEMED_GIFT, false)
                .delete(fields::REDEMPTION_TIME_STAMP),
        };

        match self
            .store
            .update_fields(REGISTRATIONS, record_id, &updates)
            .await
        {
            Ok(_) => {
                info!(workflow = %workflow, record_id, "Workflow status cleared");
                ClearOutcome::ClearApplied
            }
            Err(Error::NotFound(_)) => {
                warn!(workflow = %workflow, record_id, "Clear requested for unknown registration");
                ClearOutcome::RecordMissing
            }
            Err(e) => {
                error!(workflow = %workflow, record_id, "Failed to clear workflow status: {}", e);
                ClearOutcome::ClearFailed
            }
        }
    }
}

fn classify_rejection(workflow: Workflow, current: Customer) -> TransitionOutcome {
    match workflow {
        Workflow::CheckIn if current.is_checked_in() => TransitionOutcome::AlreadyApplied {
            previous: current.check_time_stamp,
            record: current,
        },
        Workflow::CheckIn => TransitionOutcome::OtherStatus {
            status: current.status.clone().unwrap_or_default(),
            record: current,
        },
        Workflow::Redemption => TransitionOutcome::AlreadyApplied {
            previous: current.redemption_time_stamp,
            record: current,
        },
    }
}

fn outcome_kind(outcome: &TransitionOutcome) -> &'static str {
    match outcome {
        TransitionOutcome::Applied { .. } => "applied",
        TransitionOutcome::AlreadyApplied { .. } => "already-applied",
        TransitionOutcome::OtherStatus { .. } => "other-status",
        TransitionOutcome::NotFound => "not-found",
    }
}

fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use evadm_common::db::{encode_fields, MemoryDocumentStore};
    use std::sync::Mutex;

    /// Clock that advances one second per reading
    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut t = self.0.lock().unwrap();
            *t += Duration::seconds(1);
            *t
        }
    }

    async fn setup(record: Customer) -> (TransitionEngine, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .put(REGISTRATIONS, &record.id, encode_fields(&record).unwrap())
            .await
            .unwrap();
        let clock = SteppingClock(Mutex::new(Utc.with_ymd_and_hms(2025, 5, 18, 1, 0, 0).unwrap()));
        let engine = TransitionEngine::new(store.clone(), Arc::new(clock));
        (engine, store)
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
    async fn test_check_in_applies_once() {
        let record = attendee();
        let (engine, _) = setup(record.clone()).await;

        let first = engine.apply(Workflow::CheckIn, &record).await.unwrap();
        let TransitionOutcome::Applied { at, record: updated } = first else {
            panic!("expected Applied");
        };
        assert_eq!(updated.status.as_deref(), Some(CHECKED_IN));
        assert_eq!(updated.check_time_stamp, Some(at));

        let second = engine.apply(Workflow::CheckIn, &record).await.unwrap();
        assert!(matches!(
            second,
            TransitionOutcome::AlreadyApplied { previous: Some(p), .. } if p == at
        ));
    }

    #[tokio::test]
    async fn test_check_in_respects_foreign_status() {
        let record = Customer {
            status: Some("cancelled".to_string()),
            ..attendee()
        };
        let (engine, store) = setup(record.clone()).await;

        let outcome = engine.apply(Workflow::CheckIn, &record).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::OtherStatus { ref status, .. } if status == "cancelled"));

        let stored = store.get(REGISTRATIONS, "r1").await.unwrap().unwrap();
        assert_eq!(stored.fields[fields::STATUS], "cancelled");
        assert!(!stored.fields.contains_key(fields::CHECK_TIME_STAMP));
    }

    #[tokio::test]
    async fn test_clear_then_apply_gets_later_timestamp() {
        let record = attendee();
        let (engine, store) = setup(record.clone()).await;

        let TransitionOutcome::Applied { at: first, .. } =
            engine.apply(Workflow::CheckIn, &record).await.unwrap()
        else {
            panic!("expected Applied");
        };

        assert_eq!(engine.clear(Workflow::CheckIn, "r1").await, ClearOutcome::ClearApplied);
        let cleared = store.get(REGISTRATIONS, "r1").await.unwrap().unwrap();
        assert!(!cleared.fields.contains_key(fields::STATUS));
        assert!(!cleared.fields.contains_key(fields::CHECK_TIME_STAMP));

        let TransitionOutcome::Applied { at: second, .. } =
            engine.apply(Workflow::CheckIn, &record).await.unwrap()
        else {
            panic!("expected Applied after clear");
        };
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_clear_never_applied_succeeds() {
        let (engine, _) = setup(attendee()).await;
        assert_eq!(engine.clear(Workflow::CheckIn, "r1").await, ClearOutcome::ClearApplied);
        assert_eq!(engine.clear(Workflow::Redemption, "r1").await, ClearOutcome::ClearApplied);
    }

    #[tokio::test]
    async fn test_clear_unknown_record_is_missing() {
        let (engine, _) = setup(attendee()).await;
        assert_eq!(engine.clear(Workflow::CheckIn, "missing").await, ClearOutcome::RecordMissing);
    }

    #[tokio::test]
    async fn test_redemption_cycle() {
        let record = attendee();
        let (engine, store) = setup(record.clone()).await;

        let outcome = engine.apply(Workflow::Redemption, &record).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied { ref record, .. } if record.redeemed_gift));

        let TransitionOutcome::Applied { at: first_at, .. } = outcome else {
            unreachable!()
        };

        let again = engine.apply(Workflow::Redemption, &record).await.unwrap();
        assert!(matches!(again, TransitionOutcome::AlreadyApplied { previous: Some(_), .. }));

        assert_eq!(engine.clear(Workflow::Redemption, "r1").await, ClearOutcome::ClearApplied);
        let stored = store.get(REGISTRATIONS, "r1").await.unwrap().unwrap();
        assert_eq!(stored.fields[fields::REDEEMED_GIFT], false);
        assert!(!stored.fields.contains_key(fields::REDEMPTION_TIME_STAMP));

        // redeemedGift is now an explicit false, which still counts as unset
        let reapplied = engine.apply(Workflow::Redemption, &record).await.unwrap();
        let TransitionOutcome::Applied { at, record: updated } = reapplied else {
            panic!("redemption must apply again after clear");
        };
        assert!(at > first_at);
        assert!(updated.redeemed_gift);
        assert_eq!(updated.redemption_time_stamp, Some(at));
    }

    #[tokio::test]
    async fn test_workflows_touch_disjoint_fields() {
        let record = attendee();
        let (engine, _) = setup(record.clone()).await;

        engine.apply(Workflow::Redemption, &record).await.unwrap();
        let outcome = engine.apply(Workflow::CheckIn, &record).await.unwrap();

        let TransitionOutcome::Applied { record: updated, .. } = outcome else {
            panic!("check-in must not be blocked by redemption");
        };
        assert!(updated.redeemed_gift);
        assert!(updated.is_checked_in());
    }

    #[tokio::test]
    async fn test_apply_on_deleted_record_is_not_found() {
        let record = attendee();
        let (engine, store) = setup(record.clone()).await;
        store.delete(REGISTRATIONS, "r1").await.unwrap();

        let outcome = engine.apply(Workflow::CheckIn, &record).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::NotFound);
    }
}
