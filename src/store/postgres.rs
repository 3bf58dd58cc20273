//! PostgreSQL document store: one `("_id", "__v", doc JSONB)` table per collection.

use super::{Document, FindOptions, Store};
use crate::config::ModelDescriptor;
use crate::error::StoreError;
use crate::object_id::{ObjectId, ID_FIELD, VERSION_FIELD};
use crate::query::Predicate;
use crate::sql::{self, bind_all, qualified_table, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Schema holding collection tables. From env `RESTIFY_SCHEMA`, default `restify`.
pub fn restify_schema() -> String {
    std::env::var("RESTIFY_SCHEMA").unwrap_or_else(|_| "restify".into())
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    /// Store in the schema named by `RESTIFY_SCHEMA`.
    pub fn from_env(pool: PgPool) -> Self {
        Self::new(pool, restify_schema())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table(&self, collection: &str) -> String {
        qualified_table(&self.schema, collection)
    }

    fn map_err(collection: &str, e: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = db
                    .constraint()
                    .and_then(|c| sql::field_from_index_name(collection, c))
                    .unwrap_or(ID_FIELD)
                    .to_string();
                return StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    field,
                };
            }
            if db.code().as_deref() == Some("42P01") {
                return StoreError::UnknownCollection(collection.to_string());
            }
        }
        StoreError::Db(e)
    }

    async fn fetch_all(&self, collection: &str, q: &QueryBuf) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_err(collection, e))?;
        rows.iter().map(row_to_document).collect()
    }

    async fn fetch_optional(&self, collection: &str, q: &QueryBuf) -> Result<Option<Document>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_err(collection, e))?;
        row.as_ref().map(row_to_document).transpose()
    }
}

fn row_to_document(row: &PgRow) -> Result<Document, StoreError> {
    let id: String = row.try_get(ID_FIELD)?;
    let version: i64 = row.try_get(VERSION_FIELD)?;
    let body: Value = row.try_get("doc")?;
    let mut doc = Document::new();
    doc.insert(ID_FIELD.to_string(), Value::String(id));
    match body {
        Value::Object(fields) => doc.extend(fields),
        other => {
            return Err(StoreError::InvalidDocument(format!("stored doc is not an object: {}", other)));
        }
    }
    doc.insert(VERSION_FIELD.to_string(), Value::from(version));
    Ok(doc)
}

#[async_trait]
impl Store for PgStore {
    async fn ensure_collection(&self, model: &ModelDescriptor) -> Result<(), StoreError> {
        let unique: Vec<&str> = model.unique_fields().map(|f| f.name.as_str()).collect();
        for ddl in sql::create_collection(&self.schema, &model.collection, &unique) {
            tracing::debug!(sql = %ddl, "ddl");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        tracing::info!(schema = %self.schema, collection = %model.collection, "collection ready");
        Ok(())
    }

    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError> {
        let q = sql::count(&self.table(collection), filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n: i64 = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_err(collection, e))?
            .try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let q = sql::select(&self.table(collection), filter, options);
        self.fetch_all(collection, &q).await
    }

    async fn find_one(&self, collection: &str, filter: &Predicate) -> Result<Option<Document>, StoreError> {
        let q = sql::select_one(&self.table(collection), filter);
        self.fetch_optional(collection, &q).await
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<Document, StoreError> {
        let id = match doc.remove(ID_FIELD) {
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(StoreError::InvalidDocument(format!("_id must be a string, got {}", other)));
            }
            None => ObjectId::new().to_hex(),
        };
        doc.remove(VERSION_FIELD);
        let q = sql::insert(&self.table(collection), &id, &Value::Object(doc));
        self.fetch_optional(collection, &q)
            .await?
            .ok_or_else(|| StoreError::Db(sqlx::Error::RowNotFound))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        mut set: Document,
    ) -> Result<Option<Document>, StoreError> {
        set.remove(ID_FIELD);
        set.remove(VERSION_FIELD);
        let q = sql::update_one(&self.table(collection), filter, &Value::Object(set));
        self.fetch_optional(collection, &q).await
    }

    async fn delete_one(&self, collection: &str, filter: &Predicate) -> Result<Option<Document>, StoreError> {
        let q = sql::delete_one(&self.table(collection), filter);
        self.fetch_optional(collection, &q).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}
