//! Resolved model descriptors: config validated and flattened for runtime use.

use crate::config::RestifyOptions;
use crate::object_id::ID_FIELD;

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Coarse field type tag. Drives filter coercion and write validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp stored as a string.
    Date,
    /// Object id of a document in `target` collection.
    Reference { target: String },
    Array(Box<FieldType>),
    /// Free-form nested JSON object.
    Object,
}

impl FieldType {
    pub fn reference(target: impl Into<String>) -> Self {
        FieldType::Reference {
            target: target.into(),
        }
    }

    pub fn array(items: FieldType) -> Self {
        FieldType::Array(Box::new(items))
    }

    /// Reference target, looking through one level of array.
    pub fn reference_target(&self) -> Option<&str> {
        match self {
            FieldType::Reference { target } => Some(target),
            FieldType::Array(inner) => match inner.as_ref() {
                FieldType::Reference { target } => Some(target),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub unique: bool,
}

/// Named entity with typed fields. `_id` is implicit and never listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub collection: String,
    pub fields: Vec<FieldSpec>,
    pub timestamps: bool,
}

/// Lowercased name with a trailing `s` unless it already ends in one.
pub fn default_collection_name(model_name: &str) -> String {
    let lower = model_name.to_lowercase();
    if lower.ends_with('s') {
        lower
    } else {
        format!("{}s", lower)
    }
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let collection = default_collection_name(&name);
        ModelDescriptor {
            name,
            collection,
            fields: Vec::new(),
            timestamps: false,
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn field(self, name: impl Into<String>, ty: FieldType) -> Self {
        self.push_field(name.into(), ty, false, false)
    }

    pub fn required_field(self, name: impl Into<String>, ty: FieldType) -> Self {
        self.push_field(name.into(), ty, true, false)
    }

    pub fn unique_field(self, name: impl Into<String>, ty: FieldType) -> Self {
        self.push_field(name.into(), ty, true, true)
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    fn push_field(mut self, name: String, ty: FieldType, required: bool, unique: bool) -> Self {
        self.fields.push(FieldSpec {
            name,
            ty,
            required,
            unique,
        });
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Type of a declared key; `_id` resolves to a reference into this collection,
    /// timestamps to `Date` when enabled.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if name == ID_FIELD {
            return Some(FieldType::reference(self.collection.clone()));
        }
        if self.timestamps && (name == CREATED_AT || name == UPDATED_AT) {
            return Some(FieldType::Date);
        }
        self.field_spec(name).map(|f| f.ty.clone())
    }

    /// Keys copied into the public representation, in declaration order.
    pub fn declared_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        if self.timestamps {
            keys.push(CREATED_AT);
            keys.push(UPDATED_AT);
        }
        keys
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }
}

/// One model with its mount path and route options.
#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub path: String,
    pub model: ModelDescriptor,
    pub options: RestifyOptions,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub models: Vec<ModelDescriptor>,
    pub resources: Vec<ResolvedResource>,
}

impl ResolvedModel {
    pub fn model_by_collection(&self, collection: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.collection == collection)
    }

    pub fn resource_by_path(&self, path: &str) -> Option<&ResolvedResource> {
        self.resources.iter().find(|r| r.path == path)
    }
}
