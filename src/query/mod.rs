//! Query construction: predicates from list filters and `/:id` keywords, list parameters.

mod predicate;
pub mod filter;
pub mod matcher;
pub mod params;

pub use predicate::{json_eq, Predicate};
pub use filter::build_filter;
pub use matcher::match_condition;
pub use params::{ListQuery, Range, RawListQuery, Sort, SortDirection};
