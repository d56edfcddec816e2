//! In-process document store
//!
//! Holds every collection behind one `RwLock`; conditional updates evaluate
//! and write under the write guard so they are atomic with respect to each
//! other.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::document::{
    compare_values, ConditionalUpdate, Document, DocumentStore, FieldUpdates, Fields, OrderBy,
    Precondition,
};
use crate::{Error, Result};

/// Volatile [`DocumentStore`] used by tests and `store = "memory"`
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.get(field).and_then(|v| v.as_str()) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<Document>> {
        let mut docs = {
            let collections = self.collections.read().await;
            collections.get(collection).cloned().unwrap_or_default()
        };

        if let Some(order) = order {
            // Stable sort keeps insertion order among equal keys
            docs.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        Ok(docs)
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let doc = Document::new(id, fields);

        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }

        Ok(doc)
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        updates: &FieldUpdates,
    ) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| Error::NotFound(format!("{}/{}", collection, id)))?;

        updates.apply_to(&mut doc.fields);
        Ok(doc.clone())
    }

    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        precondition: &Precondition,
        updates: &FieldUpdates,
    ) -> Result<ConditionalUpdate> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(ConditionalUpdate::Missing);
        };

        if !precondition.holds(&doc.fields) {
            return Ok(ConditionalUpdate::Rejected(doc.clone()));
        }

        updates.apply_to(&mut doc.fields);
        Ok(ConditionalUpdate::Applied(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }
}
