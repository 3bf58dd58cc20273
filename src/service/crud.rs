//! One resource's operations: list, get, create, update, delete, over a [`Store`].

use crate::config::{ModelDescriptor, RestifyOptions, CREATED_AT, UPDATED_AT};
use crate::error::AppError;
use crate::object_id::ID_FIELD;
use crate::query::{build_filter, match_condition, ListQuery, Predicate, Sort};
use crate::response::{ContentRange, ListPage};
use crate::service::processors::{postprocess, preprocess};
use crate::service::shape::{shape_embedded, shape_record};
use crate::service::RecordValidator;
use crate::store::{Document, FindOptions, Store};
use chrono::SecondsFormat;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Configuration captured at bind time plus the store handle. Cheap to clone.
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn Store>,
    model: Arc<ModelDescriptor>,
    options: Arc<RestifyOptions>,
}

fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn body_to_document(body: Value) -> Result<Document, AppError> {
    match body {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

impl ResourceService {
    pub fn new(store: Arc<dyn Store>, model: ModelDescriptor, options: RestifyOptions) -> Self {
        ResourceService {
            store,
            model: Arc::new(model),
            options: Arc::new(options),
        }
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn options(&self) -> &RestifyOptions {
        &self.options
    }

    fn collection(&self) -> &str {
        &self.model.collection
    }

    /// `id` sorts by the primary key (or `_id`); anything else is a stored key.
    fn storage_sort(&self, sort: &Sort) -> Sort {
        let field = if sort.field == "id" {
            self.options.primary_key.clone().unwrap_or_else(|| ID_FIELD.to_string())
        } else {
            sort.field.clone()
        };
        Sort {
            field,
            direction: sort.direction,
        }
    }

    /// Filtered, sorted page plus total count.
    pub async fn list(&self, query: &ListQuery) -> Result<ListPage, AppError> {
        let filter = build_filter(query.filter.as_ref(), &self.model, self.options.primary_key.as_deref())?;
        let total = self.store.count(self.collection(), &filter).await?;
        let find = FindOptions {
            sort: query.sort.as_ref().map(|s| self.storage_sort(s)),
            skip: query.range.map(|r| r.skip()).unwrap_or(0),
            limit: query.range.map(|r| r.limit()),
        };
        let mut docs = self.store.find(self.collection(), &filter, &find).await?;
        self.populate(&mut docs).await?;

        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            if let Some(r) = self.finish(doc).await? {
                records.push(r);
            }
        }
        Ok(ListPage {
            range: ContentRange {
                collection: self.model.collection.clone(),
                start: find.skip,
                len: records.len() as u64,
                total,
            },
            records,
        })
    }

    pub async fn get(&self, keyword: &str) -> Result<Document, AppError> {
        let condition = match_condition(keyword, &self.model, &self.options);
        let found = self.store.find_one(self.collection(), &condition).await?;
        let Some(doc) = found else {
            return Err(AppError::NotFound(keyword.to_string()));
        };
        let mut docs = vec![doc];
        self.populate(&mut docs).await?;
        let doc = docs.remove(0);
        self.finish(doc).await?.ok_or_else(|| AppError::NotFound(keyword.to_string()))
    }

    pub async fn create(&self, body: Value) -> Result<Document, AppError> {
        let body = body_to_document(body)?;
        let body = preprocess(body, self.options.preprocessor.as_deref()).await?;
        let mut body = RecordValidator::validate(body, &self.model)?;
        if self.model.timestamps {
            let ts = now();
            body.insert(CREATED_AT.to_string(), ts.clone());
            body.insert(UPDATED_AT.to_string(), ts);
        }
        let stored = self.store.insert(self.collection(), body).await.map_err(|e| {
            tracing::error!(collection = %self.collection(), error = %e, "create failed");
            AppError::from(e)
        })?;
        tracing::debug!(collection = %self.collection(), id = ?stored.get(ID_FIELD), "created");
        Ok(self.shape(stored))
    }

    pub async fn update(&self, keyword: &str, body: Value) -> Result<Document, AppError> {
        let mut body = body_to_document(body)?;
        body.remove("id");
        let body = preprocess(body, self.options.preprocessor.as_deref()).await?;
        let mut body = RecordValidator::validate_partial(body, &self.model)?;
        if self.model.timestamps {
            body.insert(UPDATED_AT.to_string(), now());
        }
        let condition = match_condition(keyword, &self.model, &self.options);
        let updated = self
            .store
            .update_one(self.collection(), &condition, body)
            .await
            .map_err(|e| {
                tracing::error!(collection = %self.collection(), keyword = %keyword, error = %e, "update failed");
                AppError::from(e)
            })?;
        updated
            .map(|d| self.shape(d))
            .ok_or_else(|| AppError::NotFound(keyword.to_string()))
    }

    pub async fn delete(&self, keyword: &str) -> Result<Document, AppError> {
        let condition = match_condition(keyword, &self.model, &self.options);
        let deleted = self.store.delete_one(self.collection(), &condition).await?;
        deleted
            .map(|d| self.shape(d))
            .ok_or_else(|| AppError::NotFound(keyword.to_string()))
    }

    fn shape(&self, doc: Document) -> Document {
        shape_record(Some(doc), &self.model, &self.options).unwrap_or_default()
    }

    /// Postprocess then shape a record read from the store.
    async fn finish(&self, doc: Document) -> Result<Option<Document>, AppError> {
        let doc = postprocess(doc, self.options.postprocessor.as_deref()).await?;
        Ok(shape_record(Some(doc), &self.model, &self.options))
    }

    /// Replace reference ids with the referenced documents, one query per populated field.
    /// Dangling references become null (single) or are dropped (arrays).
    async fn populate(&self, docs: &mut [Document]) -> Result<(), AppError> {
        if docs.is_empty() {
            return Ok(());
        }
        for field in &self.options.populate {
            let Some(target) = self
                .model
                .field_spec(field)
                .and_then(|f| f.ty.reference_target())
            else {
                continue;
            };
            let mut ids: Vec<Value> = Vec::new();
            let mut seen = HashSet::new();
            for doc in docs.iter() {
                for id in reference_ids(doc.get(field)) {
                    if seen.insert(id.to_string()) {
                        ids.push(Value::String(id.to_string()));
                    }
                }
            }
            if ids.is_empty() {
                continue;
            }
            let related = self
                .store
                .find(target, &Predicate::one_of(ID_FIELD, ids), &FindOptions::default())
                .await?;
            let by_id: HashMap<String, Document> = related
                .into_iter()
                .filter_map(|d| {
                    let id = d.get(ID_FIELD).and_then(Value::as_str)?.to_string();
                    Some((id, shape_embedded(d)))
                })
                .collect();
            tracing::debug!(field = %field, target = %target, found = by_id.len(), "populated");
            for doc in docs.iter_mut() {
                if let Some(v) = doc.get_mut(field) {
                    *v = substitute(v.take(), &by_id);
                }
            }
        }
        Ok(())
    }
}

fn reference_ids(v: Option<&Value>) -> Vec<&str> {
    match v {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn substitute(v: Value, by_id: &HashMap<String, Document>) -> Value {
    match v {
        Value::String(id) => by_id.get(&id).cloned().map(Value::Object).unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter_map(|i| match i {
                    Value::String(id) => by_id.get(&id).cloned().map(Value::Object),
                    other => Some(other),
                })
                .collect(),
        ),
        other => other,
    }
}
