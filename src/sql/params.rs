//! Values bound to document-table queries.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A query parameter. Field names and ids bind as text, field values as jsonb.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Text(String),
    Json(Value),
}

impl BindValue {
    pub fn bind<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            BindValue::Text(s) => query.bind(s.clone()),
            BindValue::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        }
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = p.bind(query);
    }
    query
}
