//! Identity key → attendee record lookup

use std::sync::Arc;

use evadm_common::db::DocumentStore;
use evadm_common::models::{fields, Customer, REGISTRATIONS};
use evadm_common::Result;
use tracing::warn;

use super::normalize::IdentityKey;

/// Finds the registration for an identity key
///
/// The identity key is not unique by schema. The first match in store order
/// wins and duplicates are logged so operators can clean up the data.
#[derive(Clone)]
pub struct RecordResolver {
    store: Arc<dyn DocumentStore>,
}

impl RecordResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, key: &IdentityKey) -> Result<Option<Customer>> {
        let matches = self
            .store
            .find_by_field(REGISTRATIONS, fields::ID_NUMBER, key.as_str())
            .await?;

        if matches.len() > 1 {
            let ids: Vec<&str> = matches.iter().map(|d| d.id.as_str()).collect();
            warn!(
                identity_key = %key,
                count = matches.len(),
                "Multiple registrations share an identity key; using {} of {:?}",
                ids[0],
                ids
            );
        }

        matches.first().map(|doc| doc.decode()).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::CodeNormalizer;
    use evadm_common::config::ScanConfig;
    use evadm_common::db::{encode_fields, MemoryDocumentStore};

    async fn seed(store: &MemoryDocumentStore, id: &str, id_number: &str) {
        let record = Customer {
            id: id.to_string(),
            id_number: id_number.to_string(),
            ..Default::default()
        };
        store
            .put(REGISTRATIONS, id, encode_fields(&record).unwrap())
            .await
            .unwrap();
    }

    fn key(raw: &str) -> IdentityKey {
        CodeNormalizer::new(&ScanConfig::default()).normalize(raw).unwrap()
    }

    #[tokio::test]
    async fn test_first_of_duplicates_wins() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed(&store, "second-desk", "950920-08-6687").await;
        seed(&store, "other", "010101-01-0101").await;
        seed(&store, "late-entry", "950920-08-6687").await;

        let resolver = RecordResolver::new(store);
        let found = resolver.resolve(&key("950920086687")).await.unwrap().unwrap();
        assert_eq!(found.id, "second-desk");
    }

    #[tokio::test]
    async fn test_unknown_key_resolves_to_none() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed(&store, "r1", "950920-08-6687").await;

        let resolver = RecordResolver::new(store);
        assert!(resolver.resolve(&key("000000-00-0000")).await.unwrap().is_none());
    }
}
