//! SQLite-backed document store
//!
//! Each document is one row of the `documents` table holding its JSON body
//! and a `version` counter. Partial updates run as a single `UPDATE` that
//! edits the body with `json_set`/`json_remove`; a precondition is part of
//! the same statement's `WHERE` clause, so concurrent writers are serialized
//! by SQLite's write lock (and the pool's busy timeout) instead of racing.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::document::{
    ConditionalUpdate, Document, DocumentStore, FieldUpdates, FieldValue, Fields, OrderBy,
    Precondition,
};
use crate::{Error, Result};

/// Times a rejected conditional write is retried after its guard field was
/// cleared again before the rejection could be read back
const MAX_WRITE_ATTEMPTS: usize = 8;

/// [`DocumentStore`] persisted in the `documents` table
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Shared write path behind both update flavours
    async fn write_fields(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<&Precondition>,
        updates: &FieldUpdates,
    ) -> Result<ConditionalUpdate> {
        let (sql, values) = update_statement(precondition, updates)?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut query = sqlx::query_as::<_, (String,)>(&sql);
            for value in &values {
                query = query.bind(value.as_str());
            }
            let written = query
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

            if let Some((body,)) = written {
                return Ok(ConditionalUpdate::Applied(Document::new(id, parse_body(&body)?)));
            }

            // Nothing matched: either no such row or the guard failed
            let Some(current) = self.get(collection, id).await? else {
                return Ok(ConditionalUpdate::Missing);
            };
            match precondition {
                Some(guard) if !guard.holds(&current.fields) => {
                    return Ok(ConditionalUpdate::Rejected(current));
                }
                _ => debug!(collection, id, attempt, "Document changed during write, retrying"),
            }
        }

        Err(Error::Conflict(format!(
            "{}/{} still contended after {} attempts",
            collection, id, MAX_WRITE_ATTEMPTS
        )))
    }
}

/// Build the single-statement partial update
///
/// Returns the SQL and the JSON-encoded values to bind, in order; the
/// statement then takes `collection` and `id` and yields the new body.
fn update_statement(
    precondition: Option<&Precondition>,
    updates: &FieldUpdates,
) -> Result<(String, Vec<String>)> {
    let mut body = String::from("body");
    let mut values = Vec::new();
    for (field, value) in updates.iter() {
        let path = json_path(field)?;
        body = match value {
            FieldValue::Set(v) => {
                values.push(serde_json::to_string(v)?);
                format!("json_set({}, '{}', json(?))", body, path)
            }
            FieldValue::Delete => format!("json_remove({}, '{}')", body, path),
        };
    }

    let mut sql = format!(
        "UPDATE documents SET body = {}, version = version + 1, updated_at = CURRENT_TIMESTAMP \
         WHERE collection = ? AND id = ?",
        body
    );
    if let Some(guard) = precondition {
        sql.push_str(&unset_clause(guard)?);
    }
    sql.push_str(" RETURNING body");

    Ok((sql, values))
}

/// SQL form of [`Precondition::holds`]
fn unset_clause(guard: &Precondition) -> Result<String> {
    let path = json_path(guard.field())?;
    Ok(format!(
        " AND (json_type(body, '{p}') IS NULL \
         OR json_type(body, '{p}') IN ('null', 'false') \
         OR (json_type(body, '{p}') = 'text' AND json_extract(body, '{p}') = ''))",
        p = path
    ))
}

/// Quoted JSON path for a top-level field
///
/// Field names are interpolated into SQL, so only identifier characters are
/// accepted.
fn json_path(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(Error::InvalidInput(format!("Invalid field name: {:?}", field)));
    }
    Ok(format!("$.\"{}\"", field))
}

fn parse_body(body: &str) -> Result<Fields> {
    Ok(serde_json::from_str(body)?)
}

fn rows_to_documents(rows: Vec<(String, String)>) -> Result<Vec<Document>> {
    rows.into_iter()
        .map(|(id, body)| Ok(Document::new(id, parse_body(&body)?)))
        .collect()
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        // Literal path so the expression index on idNumber applies
        let sql = format!(
            "SELECT id, body FROM documents \
             WHERE collection = ? AND json_extract(body, '{}') = ? \
             ORDER BY rowid",
            json_path(field)?
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        rows_to_documents(rows)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(body,)| Ok(Document::new(id, parse_body(&body)?)))
            .transpose()
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<Document>> {
        let rows: Vec<(String, String)> = match order {
            Some(order) => {
                let sql = format!(
                    "SELECT id, body FROM documents WHERE collection = ? \
                     ORDER BY json_extract(body, '{}') {}, rowid",
                    json_path(&order.field)?,
                    if order.descending { "DESC" } else { "ASC" }
                );
                sqlx::query_as(&sql)
                    .bind(collection)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid")
                    .bind(collection)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows_to_documents(rows)
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        let body = serde_json::to_string(&fields)?;

        // Upsert keeps the rowid (and so the insertion order) of existing rows
        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?) \
             ON CONFLICT(collection, id) DO UPDATE SET \
             body = excluded.body, version = version + 1, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        Ok(Document::new(id, fields))
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        updates: &FieldUpdates,
    ) -> Result<Document> {
        match self.write_fields(collection, id, None, updates).await? {
            ConditionalUpdate::Applied(doc) => Ok(doc),
            ConditionalUpdate::Missing => Err(Error::NotFound(format!("{}/{}", collection, id))),
            ConditionalUpdate::Rejected(_) => Err(Error::Internal(
                "Unconditional update reported a failed precondition".to_string(),
            )),
        }
    }

    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        precondition: &Precondition,
        updates: &FieldUpdates,
    ) -> Result<ConditionalUpdate> {
        self.write_fields(collection, id, Some(precondition), updates)
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_path_quotes_field() {
        assert_eq!(json_path("idNumber").unwrap(), "$.\"idNumber\"");
        assert_eq!(
            json_path("presenter-JaydenKok").unwrap(),
            "$.\"presenter-JaydenKok\""
        );
    }

    #[test]
    fn test_json_path_rejects_injection() {
        assert!(json_path("a') OR 1=1 --").is_err());
        assert!(json_path("").is_err());
        assert!(json_path("a.b").is_err());
    }

    #[test]
    fn test_update_statement_nests_writes_in_order() {
        let updates = FieldUpdates::new()
            .set("redeemedGift", false)
            .delete("redemptionTimeStamp");
        let (sql, values) = update_statement(None, &updates).unwrap();

        assert!(sql.contains(
            "json_remove(json_set(body, '$.\"redeemedGift\"', json(?)), '$.\"redemptionTimeStamp\"')"
        ));
        assert!(!sql.contains("json_type"));
        assert_eq!(values, vec!["false".to_string()]);
    }

    #[test]
    fn test_update_statement_guards_on_unset_field() {
        let updates = FieldUpdates::new().set("status", "checked-in");
        let (sql, values) =
            update_statement(Some(&Precondition::unset("status")), &updates).unwrap();

        assert!(sql.contains("json_type(body, '$.\"status\"') IS NULL"));
        assert!(sql.ends_with("RETURNING body"));
        assert_eq!(values, vec!["\"checked-in\"".to_string()]);
    }

    #[test]
    fn test_update_statement_rejects_bad_field() {
        let updates = FieldUpdates::new().set("a') --", 1);
        assert!(update_statement(None, &updates).is_err());
    }
}
