//! Document store abstraction
//!
//! Records live as JSON objects grouped into named collections. The store
//! supports exact-match lookup on a top-level field, partial updates with an
//! explicit field-delete marker, and a conditional update that evaluates a
//! precondition and writes atomically.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Top-level fields of a stored document
pub type Fields = Map<String, Value>;

/// A stored document and its identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decode into a model type, exposing the document id as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut map = self.fields.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// Encode a model into stored fields, dropping its `id`
pub fn encode_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(Error::InvalidInput(format!(
            "Documents must be JSON objects, got {}",
            other
        ))),
    }
}

/// New value for a single field in a partial update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Set(Value),
    /// Remove the field entirely (distinct from writing `null`)
    Delete,
}

/// Ordered set of field writes applied in one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdates {
    entries: Vec<(String, FieldValue)>,
}

impl FieldUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((field.into(), FieldValue::Set(value.into())));
        self
    }

    pub fn delete(mut self, field: impl Into<String>) -> Self {
        self.entries.push((field.into(), FieldValue::Delete));
        self
    }

    /// Build from a JSON object, one `Set` per key
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            entries: fields
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Set(v)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Apply the writes to a document body in order
    pub fn apply_to(&self, fields: &mut Fields) {
        for (name, value) in &self.entries {
            match value {
                FieldValue::Set(v) => {
                    fields.insert(name.clone(), v.clone());
                }
                FieldValue::Delete => {
                    fields.remove(name);
                }
            }
        }
    }
}

/// Guard evaluated by the store at write time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    field: String,
}

impl Precondition {
    /// Holds while `field` is absent, null, `false` or the empty string
    pub fn unset(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn holds(&self, fields: &Fields) -> bool {
        match fields.get(&self.field) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }
}

/// Result of [`DocumentStore::update_fields_if`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalUpdate {
    /// Precondition held; carries the document as written
    Applied(Document),
    /// Precondition failed; carries the state the store evaluated
    Rejected(Document),
    /// No document with that id
    Missing,
}

/// Sort order for [`DocumentStore::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Async document database
///
/// Result order for `find_by_field` and unordered `list` is insertion order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents whose top-level string `field` equals `value`
    async fn find_by_field(&self, collection: &str, field: &str, value: &str)
        -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<Document>>;

    /// Create or replace the document with this id
    async fn put(&self, collection: &str, id: &str, fields: Fields) -> Result<Document>;

    /// Partial update; fails with [`Error::NotFound`] when the id is unknown
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        updates: &FieldUpdates,
    ) -> Result<Document>;

    /// Apply `updates` only if `precondition` holds, atomically
    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        precondition: &Precondition,
        updates: &FieldUpdates,
    ) -> Result<ConditionalUpdate>;

    /// Returns false when no such document existed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Create a document under a fresh random id
    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.put(collection, &id, fields).await
    }
}

/// Ordering of JSON field values used when sorting documents
///
/// Missing and null sort first, then booleans and numbers by numeric
/// value, then strings. Matches SQLite's ordering of `json_extract`.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) | Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }
    fn numeric(v: &Value) -> f64 {
        match v {
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => match (a, b) {
            (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
            (Some(x), Some(y)) if rank(a) == 1 => numeric(x)
                .partial_cmp(&numeric(y))
                .unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        other => other,
    }
}
