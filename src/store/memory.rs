//! In-process document store. Collections are created on first use.

use super::{Document, FindOptions, Store};
use crate::config::ModelDescriptor;
use crate::error::StoreError;
use crate::object_id::{ObjectId, ID_FIELD, VERSION_FIELD};
use crate::query::{json_eq, Predicate, SortDirection};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    unique: Vec<String>,
}

impl Collection {
    fn check_unique(&self, name: &str, doc: &Document, skip: Option<usize>) -> Result<(), StoreError> {
        let id = doc.get(ID_FIELD);
        let mut keys: Vec<&str> = self.unique.iter().map(String::as_str).collect();
        keys.push(ID_FIELD);
        for key in keys {
            let Some(value) = doc.get(key).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self.docs.iter().enumerate().any(|(i, other)| {
                Some(i) != skip
                    && (key == ID_FIELD || other.get(ID_FIELD) != id)
                    && other.get(key).map(|o| json_eq(o, value)).unwrap_or(false)
            });
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: name.to_string(),
                    field: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Index of the match with the smallest `_id`.
    fn position(&self, filter: &Predicate) -> Option<usize> {
        self.docs
            .iter()
            .enumerate()
            .filter(|(_, d)| filter.matches(d))
            .min_by(|(_, a), (_, b)| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)))
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_collection(&self, model: &ModelDescriptor) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let c = collections.entry(model.collection.clone()).or_default();
        c.unique = model.unique_fields().map(|f| f.name.clone()).collect();
        tracing::info!(collection = %model.collection, unique = ?c.unique, "memory collection ready");
        Ok(())
    }

    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Predicate,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(c) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<&Document> = c.docs.iter().filter(|d| filter.matches(d)).collect();
        if let Some(sort) = &options.sort {
            hits.sort_by(|a, b| {
                let ord = compare_values(a.get(&sort.field), b.get(&sort.field));
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_one(&self, collection: &str, filter: &Predicate) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.position(filter).map(|i| c.docs[i].clone())))
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
        let mut stored = Document::new();
        stored.insert(ID_FIELD.to_string(), Value::String(id));
        stored.extend(doc);
        stored.insert(VERSION_FIELD.to_string(), Value::from(0));

        let mut collections = self.collections.write().await;
        let c = collections.entry(collection.to_string()).or_default();
        c.check_unique(collection, &stored, None)?;
        c.docs.push(stored.clone());
        Ok(stored)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Predicate,
        mut set: Document,
    ) -> Result<Option<Document>, StoreError> {
        set.remove(ID_FIELD);
        set.remove(VERSION_FIELD);
        let mut collections = self.collections.write().await;
        let Some(c) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(idx) = c.position(filter) else {
            return Ok(None);
        };
        let mut updated = c.docs[idx].clone();
        updated.extend(set);
        c.check_unique(collection, &updated, Some(idx))?;
        c.docs[idx] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_one(&self, collection: &str, filter: &Predicate) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(c) = collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(c.position(filter).map(|idx| c.docs.remove(idx)))
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Sort order across JSON types: missing/null, numbers, strings, objects, arrays, booleans.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
