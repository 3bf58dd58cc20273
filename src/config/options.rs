//! Per-resource route options, resolved once at registration time.

use crate::config::ResourceConfig;
use crate::service::Processor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which of the five conventional operations are bound. Every flag defaults to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Methods {
    pub list: bool,
    pub get: bool,
    pub post: bool,
    /// Covers both PUT and PATCH.
    pub put: bool,
    pub delete: bool,
}

impl Default for Methods {
    fn default() -> Self {
        Methods {
            list: true,
            get: true,
            post: true,
            put: true,
            delete: true,
        }
    }
}

impl Methods {
    pub fn none() -> Self {
        Methods {
            list: false,
            get: false,
            post: false,
            put: false,
            delete: false,
        }
    }

    pub fn any(&self) -> bool {
        self.list || self.get || self.post || self.put || self.delete
    }
}

/// Options closed over by every generated handler of one resource.
///
/// - `primary_key`: public `id` comes from this field instead of `_id`, and
///   `/:id` matches on it. Default: none.
/// - `match_fields`: extra fields compared against `/:id` when no primary key
///   is set. Default: empty.
/// - `populate`: reference fields expanded into documents on reads. Default: empty.
/// - `preprocessor` / `postprocessor`: optional async hooks. Default: none.
/// - `methods`: enabled operations. Default: all.
#[derive(Clone, Default)]
pub struct RestifyOptions {
    pub primary_key: Option<String>,
    pub match_fields: Vec<String>,
    pub populate: Vec<String>,
    pub preprocessor: Option<Arc<dyn Processor>>,
    pub postprocessor: Option<Arc<dyn Processor>>,
    pub methods: Methods,
}

impl RestifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resource(resource: &ResourceConfig) -> Self {
        RestifyOptions {
            primary_key: resource.primary_key.clone(),
            match_fields: resource.match_fields.clone(),
            populate: resource.populate.clone(),
            methods: resource.methods,
            ..Default::default()
        }
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn match_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn populate<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populate = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn preprocessor<P: Processor + 'static>(mut self, hook: P) -> Self {
        self.preprocessor = Some(Arc::new(hook));
        self
    }

    pub fn postprocessor<P: Processor + 'static>(mut self, hook: P) -> Self {
        self.postprocessor = Some(Arc::new(hook));
        self
    }

    pub fn methods(mut self, methods: Methods) -> Self {
        self.methods = methods;
        self
    }
}

impl fmt::Debug for RestifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestifyOptions")
            .field("primary_key", &self.primary_key)
            .field("match_fields", &self.match_fields)
            .field("populate", &self.populate)
            .field("preprocessor", &self.preprocessor.is_some())
            .field("postprocessor", &self.postprocessor.is_some())
            .field("methods", &self.methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_default_to_enabled_and_partial_json_keeps_defaults() {
        let m: Methods = serde_json::from_str(r#"{"delete": false}"#).unwrap();
        assert!(m.list && m.get && m.post && m.put);
        assert!(!m.delete);
        assert!(!Methods::none().any());
        assert!(Methods::default().any());
    }

    #[test]
    fn from_resource_copies_route_settings() {
        let resource: ResourceConfig = serde_json::from_value(serde_json::json!({
            "path": "/api/tags",
            "primary_key": "slug",
            "match": ["name"],
            "methods": { "post": false }
        }))
        .unwrap();
        let opts = RestifyOptions::from_resource(&resource);
        assert_eq!(opts.primary_key.as_deref(), Some("slug"));
        assert_eq!(opts.match_fields, vec!["name".to_string()]);
        assert!(!opts.methods.post);
        assert!(opts.preprocessor.is_none());
    }
}
