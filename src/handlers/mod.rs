//! HTTP handlers for bound resources.

pub mod resource;
pub use resource::*;
