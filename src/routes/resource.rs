//! Binds a model to a router exposing the five conventional operations.
//! Mount the result with `Router::nest` at the resource path.

use crate::config::{validate_model, validate_options, ModelDescriptor, RestifyOptions};
use crate::error::ConfigError;
use crate::handlers::resource::{create, delete, list, read, update};
use crate::service::ResourceService;
use crate::store::Store;
use axum::{
    extract::Request,
    response::IntoResponse,
    routing::{MethodRouter, Route},
    Router,
};
use std::convert::Infallible;
use std::sync::Arc;
use tower::{layer::util::Identity, Layer, Service};
use tower_http::limit::RequestBodyLimitLayer;

/// Builder for one resource router. `L` is an optional layer (typically auth)
/// that runs in front of every bound handler.
pub struct Restify<L = Identity> {
    model: ModelDescriptor,
    store: Arc<dyn Store>,
    options: RestifyOptions,
    layer: Option<L>,
    body_limit: Option<usize>,
}

impl Restify<Identity> {
    pub fn new(model: ModelDescriptor, store: Arc<dyn Store>) -> Self {
        Restify {
            model,
            store,
            options: RestifyOptions::default(),
            layer: None,
            body_limit: None,
        }
    }
}

impl<L> Restify<L> {
    pub fn options(mut self, options: RestifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Middleware applied with `route_layer`: it only sees requests that hit a bound route.
    pub fn layer<L2>(self, layer: L2) -> Restify<L2> {
        Restify {
            model: self.model,
            store: self.store,
            options: self.options,
            layer: Some(layer),
            body_limit: self.body_limit,
        }
    }

    /// Reject request bodies larger than `bytes`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    pub fn into_router(self) -> Result<Router, ConfigError>
    where
        L: Layer<Route> + Clone + Send + 'static,
        L::Service: Service<Request> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        validate_model(&self.model)?;
        validate_options(&self.model, &self.options)?;

        let methods = self.options.methods;
        let collection = self.model.collection.clone();
        let svc = ResourceService::new(self.store, self.model, self.options);

        let mut router: Router<ResourceService> = Router::new();
        let mut root: Option<MethodRouter<ResourceService>> = None;
        if methods.list {
            root = Some(root.unwrap_or_default().get(list));
        }
        if methods.post {
            root = Some(root.unwrap_or_default().post(create));
        }
        if let Some(root) = root {
            router = router.route("/", root);
        }

        let mut item: Option<MethodRouter<ResourceService>> = None;
        if methods.get {
            item = Some(item.unwrap_or_default().get(read));
        }
        if methods.put {
            item = Some(item.unwrap_or_default().put(update).patch(update));
        }
        if methods.delete {
            item = Some(item.unwrap_or_default().delete(delete));
        }
        if let Some(item) = item {
            router = router.route("/:id", item);
        }

        if methods.any() {
            if let Some(layer) = self.layer {
                router = router.route_layer(layer);
            }
        }
        if let Some(bytes) = self.body_limit {
            router = router.layer(RequestBodyLimitLayer::new(bytes));
        }

        tracing::info!(collection = %collection, methods = ?methods, "resource bound");
        Ok(router.with_state(svc))
    }
}

/// Bind `model` with `options` and no extra middleware.
pub fn restify_model(
    model: ModelDescriptor,
    store: Arc<dyn Store>,
    options: RestifyOptions,
) -> Result<Router, ConfigError> {
    Restify::new(model, store).options(options).into_router()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldType, Methods};
    use crate::store::MemoryStore;

    #[test]
    fn rejects_unknown_primary_key() {
        let model = ModelDescriptor::new("Tag").field("name", FieldType::String);
        let err = restify_model(model, Arc::new(MemoryStore::new()), RestifyOptions::new().primary_key("slug"));
        assert!(matches!(err, Err(ConfigError::MissingReference { .. })));
    }

    #[test]
    fn all_methods_disabled_still_builds_with_layer() {
        let model = ModelDescriptor::new("Tag").field("name", FieldType::String);
        let router = Restify::new(model, Arc::new(MemoryStore::new()))
            .options(RestifyOptions::new().methods(Methods::none()))
            .layer(axum::middleware::from_fn(
                |req: Request, next: axum::middleware::Next| async move { next.run(req).await },
            ))
            .into_router();
        assert!(router.is_ok());
    }
}
