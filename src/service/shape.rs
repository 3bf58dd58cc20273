//! Stored document -> public representation.

use crate::config::{ModelDescriptor, RestifyOptions};
use crate::object_id::{ID_FIELD, VERSION_FIELD};
use crate::store::Document;
use serde_json::Value;

/// Public shape of a record: `id` first, then the model's declared keys that are
/// present. `id` is the primary-key value when one is configured (that key is then
/// not repeated), else `_id`. `_id`, `__v` and undeclared keys are dropped.
pub fn shape_record(
    record: Option<Document>,
    model: &ModelDescriptor,
    options: &RestifyOptions,
) -> Option<Document> {
    let mut record = record?;
    let pk = options.primary_key.as_deref();
    let id = match pk {
        Some(pk) => record.remove(pk),
        None => record.remove(ID_FIELD),
    }
    .unwrap_or(Value::Null);

    let mut out = Document::new();
    out.insert("id".to_string(), id);
    for key in model.declared_keys() {
        if Some(key) == pk {
            continue;
        }
        if let Some(v) = record.remove(key) {
            out.insert(key.to_string(), v);
        }
    }
    Some(out)
}

/// Generic shape for populated sub-documents: `_id` becomes `id`, `__v` is dropped.
pub fn shape_embedded(mut doc: Document) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.remove(ID_FIELD) {
        out.insert("id".to_string(), id);
    }
    doc.remove(VERSION_FIELD);
    out.extend(doc);
    out
}
