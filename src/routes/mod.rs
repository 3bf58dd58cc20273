//! Router construction: per-resource routers and the service-wide common routes.

pub mod common;
pub mod resource;

pub use common::common_routes;
pub use resource::{restify_model, Restify};
