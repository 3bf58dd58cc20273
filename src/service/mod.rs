//! ResourceService: per-resource CRUD over the document store, plus hooks, shaping and validation.

mod crud;
pub mod processors;
pub mod shape;
mod validation;
pub use crud::ResourceService;
pub use processors::{postprocess, preprocess, HookError, Processor, READ_ONLY_FIELDS};
pub use shape::{shape_embedded, shape_record};
pub use validation::RecordValidator;
