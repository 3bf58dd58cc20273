//! Write-body validation against the model's field types.

use crate::config::{FieldType, ModelDescriptor};
use crate::error::AppError;
use crate::object_id::ObjectId;
use crate::store::Document;
use chrono::SecondsFormat;
use serde_json::Value;

pub struct RecordValidator;

impl RecordValidator {
    /// Validate a create body. Required fields must be present and non-null.
    /// Returns the body restricted to declared fields, with values normalized.
    pub fn validate(body: Document, model: &ModelDescriptor) -> Result<Document, AppError> {
        for f in model.fields.iter().filter(|f| f.required) {
            if body.get(&f.name).map(Value::is_null).unwrap_or(true) {
                return Err(AppError::Validation(format!("{} is required", f.name)));
            }
        }
        Self::normalize(body, model)
    }

    /// Validate only the fields present in body (for PUT/PATCH). Required fields may
    /// be omitted but not set to null.
    pub fn validate_partial(body: Document, model: &ModelDescriptor) -> Result<Document, AppError> {
        for f in model.fields.iter().filter(|f| f.required) {
            if body.get(&f.name).map(Value::is_null).unwrap_or(false) {
                return Err(AppError::Validation(format!("{} is required", f.name)));
            }
        }
        Self::normalize(body, model)
    }

    fn normalize(body: Document, model: &ModelDescriptor) -> Result<Document, AppError> {
        let mut out = Document::new();
        for (key, value) in body {
            let Some(spec) = model.field_spec(&key) else {
                tracing::debug!(model = %model.name, field = %key, "dropping undeclared field");
                continue;
            };
            let value = normalize_value(&key, &spec.ty, value)?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

fn normalize_value(field: &str, ty: &FieldType, v: Value) -> Result<Value, AppError> {
    if v.is_null() {
        return Ok(v);
    }
    let mismatch = |expected: &str| AppError::Validation(format!("{} must be {}", field, expected));
    match ty {
        FieldType::String => match v {
            Value::String(_) => Ok(v),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(mismatch("a string")),
        },
        FieldType::Number => match v {
            Value::Number(_) => Ok(v),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|f| {
                    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Some(Value::from(f as i64))
                    } else {
                        serde_json::Number::from_f64(f).map(Value::Number)
                    }
                })
                .ok_or_else(|| mismatch("a number")),
            _ => Err(mismatch("a number")),
        },
        FieldType::Boolean => match v {
            Value::Bool(_) => Ok(v),
            _ => Err(mismatch("a boolean")),
        },
        FieldType::Date => match &v {
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|d| {
                    Value::String(
                        d.with_timezone(&chrono::Utc)
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                    )
                })
                .map_err(|_| mismatch("an RFC 3339 date")),
            _ => Err(mismatch("an RFC 3339 date")),
        },
        FieldType::Reference { .. } => reference_id(&v)
            .map(Value::String)
            .ok_or_else(|| mismatch("an object id")),
        FieldType::Array(items) => match v {
            Value::Array(values) => values
                .into_iter()
                .map(|item| normalize_value(field, items, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(mismatch("an array")),
        },
        FieldType::Object => match v {
            Value::Object(_) => Ok(v),
            _ => Err(mismatch("an object")),
        },
    }
}

/// Accepts an id string or a populated document carrying `id`/`_id`.
fn reference_id(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.as_str(),
        Value::Object(m) => m.get("id").or_else(|| m.get("_id")).and_then(Value::as_str)?,
        _ => return None,
    };
    ObjectId::is_valid(s).then(|| s.to_lowercase())
}
