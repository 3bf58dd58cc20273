//! Document store seam. Handlers never talk to a database directly; they go
//! through [`Store`], implemented in memory and on PostgreSQL.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{restify_schema, PgStore};

use crate::config::ModelDescriptor;
use crate::error::StoreError;
use crate::query::{Predicate, Sort};
use async_trait::async_trait;

/// A stored document: `_id`, `__v` and field values.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Modifiers for [`Store::find`]. `sort.field` is a stored key (`_id`, not `id`).
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Create the collection and its unique indexes if missing.
    async fn ensure_collection(&self, model: &ModelDescriptor) -> Result<(), StoreError>;

    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    /// First match in `_id` order.
    async fn find_one(&self, collection: &str, filter: &Predicate) -> Result<Option<Document>, StoreError>;

    /// Insert a document. Assigns `_id` when absent and sets `__v` to 0. Returns the stored document.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Merge `set` into the first match. Returns the updated document, or `None` when nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        set: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove the first match. Returns the removed document.
    async fn delete_one(&self, collection: &str, filter: &Predicate) -> Result<Option<Document>, StoreError>;

    /// Liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
