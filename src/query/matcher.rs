//! Resolve the `/:id` path keyword into a predicate.

use crate::config::{ModelDescriptor, RestifyOptions};
use crate::object_id::{ObjectId, ID_FIELD};
use crate::query::filter::coerce;
use crate::query::Predicate;
use serde_json::Value;

/// Primary key set: equality on it alone. Otherwise `_id` (when the keyword is
/// an object id) OR-ed with every match field. The keyword is cast to each
/// field's type first; a field that cannot hold it is skipped. A keyword
/// nothing can accept yields `Never`, which reads as "not found".
pub fn match_condition(keyword: &str, model: &ModelDescriptor, options: &RestifyOptions) -> Predicate {
    if let Some(pk) = &options.primary_key {
        return keyword_term(pk, keyword, model).unwrap_or(Predicate::Never);
    }
    let by_id = keyword
        .parse::<ObjectId>()
        .ok()
        .map(|id| Predicate::eq(ID_FIELD, id.to_hex()));
    if options.match_fields.is_empty() {
        return by_id.unwrap_or(Predicate::Never);
    }
    let mut any: Vec<Predicate> = by_id.into_iter().collect();
    any.extend(
        options
            .match_fields
            .iter()
            .filter_map(|f| keyword_term(f, keyword, model)),
    );
    Predicate::or(any)
}

fn keyword_term(field: &str, keyword: &str, model: &ModelDescriptor) -> Option<Predicate> {
    let ty = model.field_type(field);
    coerce(ty.as_ref(), &Value::String(keyword.to_string())).map(|v| Predicate::eq(field, v))
}
