//! Raw config types matching the models JSON file.

use crate::config::Methods;
use serde::{Deserialize, Serialize};

/// Type tag of a field, possibly nested for arrays.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldTypeConfig {
    #[serde(rename = "type")]
    pub kind: String,
    /// Target collection for `reference` fields.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Element type for `array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldTypeConfig>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(flatten)]
    pub ty: FieldTypeConfig,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
}

/// Route options for one model. Hooks and auth are attached in code, not here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Mount path, e.g. `/api/tags`.
    pub path: String,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default, rename = "match")]
    pub match_fields: Vec<String>,
    #[serde(default)]
    pub populate: Vec<String>,
    #[serde(default)]
    pub methods: Methods,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub collection: Option<String>,
    /// Maintain `createdAt` / `updatedAt`.
    #[serde(default)]
    pub timestamps: bool,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub resource: Option<ResourceConfig>,
}

/// All models in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FullConfig {
    pub models: Vec<ModelConfig>,
}
