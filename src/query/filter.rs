//! Translate a list `filter` object into a predicate.
//!
//! `{"q": "term"}` is a free-text search: an OR over every string field
//! (substring, case-insensitive), every identifier field (when the term is an
//! object id) and every number field (when the term is an integer).
//! Any other key is a structured term: arrays become `In`, scalars `Eq`, and
//! `id` maps to the primary key (or `_id`). Free-text and structured terms are
//! AND-ed together.

use crate::config::{FieldType, ModelDescriptor};
use crate::error::AppError;
use crate::object_id::{ObjectId, ID_FIELD};
use crate::query::Predicate;
use serde_json::Value;

/// Key holding the free-text term.
pub const SEARCH_KEY: &str = "q";

pub fn build_filter(
    filter: Option<&Value>,
    model: &ModelDescriptor,
    primary_key: Option<&str>,
) -> Result<Predicate, AppError> {
    let Some(filter) = filter else {
        return Ok(Predicate::All);
    };
    let obj = match filter {
        Value::Object(obj) => obj,
        Value::Null => return Ok(Predicate::All),
        _ => return Err(AppError::BadRequest("filter must be a JSON object".into())),
    };

    let mut terms = Vec::with_capacity(obj.len());
    for (key, needle) in obj {
        if key == SEARCH_KEY {
            if let Some(term) = search_term(needle)? {
                terms.push(free_text(&term, model));
            }
            continue;
        }
        let field = if key == "id" {
            primary_key.unwrap_or(ID_FIELD)
        } else {
            key.as_str()
        };
        terms.push(structured(field, needle, model));
    }
    let predicate = Predicate::and(terms);
    tracing::debug!(model = %model.name, predicate = ?predicate, "built filter");
    Ok(predicate)
}

fn search_term(needle: &Value) -> Result<Option<String>, AppError> {
    match needle {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(AppError::BadRequest("filter.q must be a string".into())),
    }
}

/// OR over every field whose type accepts the term's shape.
pub fn free_text(term: &str, model: &ModelDescriptor) -> Predicate {
    let as_id = ObjectId::is_valid(term).then(|| term.to_lowercase());
    let as_int = term.trim().parse::<i64>().ok();

    let mut any = Vec::new();
    if let Some(id) = &as_id {
        any.push(Predicate::eq(ID_FIELD, id.as_str()));
    }
    for f in &model.fields {
        match &f.ty {
            FieldType::String => any.push(Predicate::contains(f.name.as_str(), term)),
            FieldType::Reference { .. } => {
                if let Some(id) = &as_id {
                    any.push(Predicate::eq(f.name.as_str(), id.as_str()));
                }
            }
            FieldType::Number => {
                if let Some(n) = as_int {
                    any.push(Predicate::eq(f.name.as_str(), n));
                }
            }
            _ => {}
        }
    }
    Predicate::or(any)
}

fn structured(field: &str, needle: &Value, model: &ModelDescriptor) -> Predicate {
    let ty = model.field_type(field);
    match needle {
        Value::Array(items) => {
            let values: Vec<Value> = items
                .iter()
                .filter_map(|v| coerce(ty.as_ref(), v))
                .collect();
            Predicate::one_of(field, values)
        }
        scalar => match coerce(ty.as_ref(), scalar) {
            Some(v) => Predicate::eq(field, v),
            None => Predicate::Never,
        },
    }
}

/// Shape a filter value for the field's type. `None` means the value can never match.
pub(crate) fn coerce(ty: Option<&FieldType>, v: &Value) -> Option<Value> {
    match (ty, v) {
        (Some(FieldType::Reference { .. }), Value::String(s)) => {
            s.parse::<ObjectId>().ok().map(|id| Value::String(id.to_hex()))
        }
        (Some(FieldType::Reference { .. }), Value::Null) => Some(Value::Null),
        (Some(FieldType::Reference { .. }), _) => None,
        (Some(FieldType::Number), Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(n) => Some(Value::from(n)),
            Err(_) => s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number),
        },
        (Some(FieldType::Boolean), Value::String(s)) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        (Some(FieldType::Boolean), Value::String(s)) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        _ => Some(v.clone()),
    }
}
