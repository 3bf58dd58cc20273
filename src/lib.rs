//! Restify SDK: REST CRUD routers generated from document model descriptors.

pub mod config;
pub mod error;
pub mod handlers;
pub mod object_id;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_from_path, resolve, FieldType, FullConfig, Methods, ModelDescriptor, ResolvedModel, RestifyOptions};
pub use error::{AppError, ConfigError, StoreError};
pub use object_id::ObjectId;
pub use query::{build_filter, match_condition, Predicate};
pub use routes::{common_routes, restify_model, Restify};
pub use service::{HookError, Processor, ResourceService};
pub use state::AppState;
pub use store::{Document, MemoryStore, PgStore, Store};
