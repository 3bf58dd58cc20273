//! Descriptor and option validation: field names, key references, resource paths.

use crate::config::{FieldType, ModelDescriptor, ResolvedModel, RestifyOptions, CREATED_AT, UPDATED_AT};
use crate::error::ConfigError;
use crate::object_id::{ID_FIELD, VERSION_FIELD};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const RESERVED_FIELDS: &[&str] = &[ID_FIELD, VERSION_FIELD, "id"];

fn field_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn invalid(model: &ModelDescriptor, field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidField {
        model: model.name.clone(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_model(model: &ModelDescriptor) -> Result<(), ConfigError> {
    if model.collection.is_empty() {
        return Err(ConfigError::Validation(format!("model {} has an empty collection name", model.name)));
    }
    let mut seen = HashSet::new();
    for f in &model.fields {
        if !field_name_re().is_match(&f.name) {
            return Err(invalid(model, &f.name, "field names must be identifiers"));
        }
        if RESERVED_FIELDS.contains(&f.name.as_str()) {
            return Err(invalid(model, &f.name, "reserved field name"));
        }
        if model.timestamps && (f.name == CREATED_AT || f.name == UPDATED_AT) {
            return Err(invalid(model, &f.name, "managed by timestamps"));
        }
        if !seen.insert(f.name.as_str()) {
            return Err(invalid(model, &f.name, "duplicate field"));
        }
        if let FieldType::Array(inner) = &f.ty {
            if matches!(inner.as_ref(), FieldType::Array(_)) {
                return Err(invalid(model, &f.name, "nested arrays are not supported"));
            }
        }
        if f.unique && !matches!(f.ty, FieldType::String | FieldType::Number) {
            return Err(invalid(model, &f.name, "only string and number fields can be unique"));
        }
    }
    Ok(())
}

pub fn validate_options(model: &ModelDescriptor, options: &RestifyOptions) -> Result<(), ConfigError> {
    if let Some(pk) = &options.primary_key {
        let spec = model.field_spec(pk).ok_or_else(|| ConfigError::MissingReference {
            kind: "primary key",
            model: model.name.clone(),
            name: pk.clone(),
        })?;
        if !matches!(spec.ty, FieldType::String | FieldType::Number) {
            return Err(invalid(model, pk, "primary key must be a string or number field"));
        }
    }
    for m in &options.match_fields {
        let spec = model.field_spec(m).ok_or_else(|| ConfigError::MissingReference {
            kind: "match field",
            model: model.name.clone(),
            name: m.clone(),
        })?;
        if matches!(spec.ty, FieldType::Array(_) | FieldType::Object) {
            return Err(invalid(model, m, "match fields must be scalar"));
        }
    }
    for p in &options.populate {
        let spec = model.field_spec(p).ok_or_else(|| ConfigError::MissingReference {
            kind: "populate field",
            model: model.name.clone(),
            name: p.clone(),
        })?;
        if spec.ty.reference_target().is_none() {
            return Err(invalid(model, p, "only reference fields can be populated"));
        }
    }
    Ok(())
}

/// Cross-model checks: unique collections and paths, reference targets exist.
pub fn validate(resolved: &ResolvedModel) -> Result<(), ConfigError> {
    let mut collections = HashSet::new();
    for m in &resolved.models {
        validate_model(m)?;
        if !collections.insert(m.collection.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate collection: {}", m.collection)));
        }
    }
    for m in &resolved.models {
        for f in &m.fields {
            if let Some(target) = f.ty.reference_target() {
                if !collections.contains(target) {
                    return Err(ConfigError::MissingReference {
                        kind: "collection",
                        model: m.name.clone(),
                        name: target.to_string(),
                    });
                }
            }
        }
    }
    let mut paths = HashSet::new();
    for r in &resolved.resources {
        if !r.path.starts_with('/') {
            return Err(ConfigError::Validation(format!("resource path must start with '/': {}", r.path)));
        }
        if !paths.insert(r.path.as_str()) {
            return Err(ConfigError::DuplicatePath(r.path.clone()));
        }
        validate_options(&r.model, &r.options)?;
    }
    Ok(())
}
