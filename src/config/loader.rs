//! Load model config from a JSON file and resolve it into descriptors and route options.

use crate::config::types::*;
use crate::config::{validate, FieldSpec, FieldType, ModelDescriptor, ResolvedModel, ResolvedResource, RestifyOptions};
use crate::config::resolved::default_collection_name;
use crate::error::ConfigError;
use std::path::Path;

/// Build resolved model from full config, then validate it.
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    let mut models = Vec::with_capacity(config.models.len());
    let mut resources = Vec::new();

    for mc in &config.models {
        let collection = mc
            .collection
            .clone()
            .unwrap_or_else(|| default_collection_name(&mc.name));
        let mut fields = Vec::with_capacity(mc.fields.len());
        for fc in &mc.fields {
            fields.push(FieldSpec {
                name: fc.name.clone(),
                ty: field_type(&mc.name, &fc.name, &fc.ty)?,
                required: fc.required || fc.unique,
                unique: fc.unique,
            });
        }
        let model = ModelDescriptor {
            name: mc.name.clone(),
            collection,
            fields,
            timestamps: mc.timestamps,
        };
        if let Some(rc) = &mc.resource {
            resources.push(ResolvedResource {
                path: rc.path.clone(),
                model: model.clone(),
                options: RestifyOptions::from_resource(rc),
            });
        }
        models.push(model);
    }

    let resolved = ResolvedModel { models, resources };
    validate(&resolved)?;
    Ok(resolved)
}

fn field_type(model: &str, field: &str, ty: &FieldTypeConfig) -> Result<FieldType, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidField {
        model: model.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    };
    Ok(match ty.kind.to_lowercase().as_str() {
        "string" | "text" => FieldType::String,
        "number" | "integer" | "int" | "float" => FieldType::Number,
        "boolean" | "bool" => FieldType::Boolean,
        "date" | "datetime" => FieldType::Date,
        "object" | "mixed" => FieldType::Object,
        "reference" | "ref" | "objectid" => {
            let target = ty
                .reference
                .as_deref()
                .ok_or_else(|| invalid("reference fields need a 'ref' collection"))?;
            FieldType::reference(target)
        }
        "array" => {
            let items = ty
                .items
                .as_deref()
                .ok_or_else(|| invalid("array fields need an 'items' type"))?;
            FieldType::array(field_type(model, field, items)?)
        }
        other => return Err(invalid(&format!("unknown type '{}'", other))),
    })
}

/// Read and resolve a models JSON file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ResolvedModel, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config: FullConfig =
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), models = config.models.len(), "loaded model config");
    resolve(&config)
}
