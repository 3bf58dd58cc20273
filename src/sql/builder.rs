//! Builds parameterized SQL over document tables: `("_id" TEXT, "__v" BIGINT, doc JSONB)`.
//! Identifiers come from validated config; field names and values from requests are parameters.

use crate::object_id::ID_FIELD;
use crate::query::{Predicate, Sort, SortDirection};
use crate::sql::BindValue;
use crate::store::FindOptions;
use serde_json::Value;

const COLUMNS: &str = "\"_id\", \"__v\", doc";

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    fn push_text(&mut self, s: &str) -> usize {
        self.push_param(BindValue::Text(s.to_string()))
    }

    fn push_json(&mut self, v: &Value) -> usize {
        self.push_param(BindValue::Json(v.clone()))
    }
}

/// DDL for one collection: schema, table, and one unique expression index per unique field.
pub fn create_collection(schema: &str, collection: &str, unique_fields: &[&str]) -> Vec<String> {
    let table = qualified_table(schema, collection);
    let mut ddl = vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\"_id\" TEXT PRIMARY KEY, \"__v\" BIGINT NOT NULL DEFAULT 0, doc JSONB NOT NULL DEFAULT '{{}}'::jsonb)",
            table
        ),
    ];
    for field in unique_fields {
        ddl.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc -> {}))",
            quoted(&unique_index_name(collection, field)),
            table,
            literal(field)
        ));
    }
    ddl
}

pub fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{}_{}_key", collection, field)
}

/// Inverse of [`unique_index_name`], for mapping constraint violations back to a field.
pub fn field_from_index_name<'a>(collection: &str, index: &'a str) -> Option<&'a str> {
    index
        .strip_prefix(collection)
        .and_then(|s| s.strip_prefix('_'))
        .and_then(|s| s.strip_suffix("_key"))
}

/// Escape LIKE metacharacters and wrap in `%…%`.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn eq_clause(q: &mut QueryBuf, field: &str, value: &Value) -> String {
    if field == ID_FIELD {
        return match value {
            Value::String(s) => format!("\"_id\" = ${}", q.push_text(s)),
            _ => "FALSE".into(),
        };
    }
    let f = q.push_text(field);
    if value.is_null() {
        return format!("(doc -> ${f}::text IS NULL OR doc -> ${f}::text = 'null'::jsonb)");
    }
    let v = q.push_json(value);
    if value.is_array() {
        return format!("doc -> ${f}::text = ${v}::jsonb");
    }
    format!(
        "(doc -> ${f}::text = ${v}::jsonb OR (jsonb_typeof(doc -> ${f}::text) = 'array' AND doc -> ${f}::text @> jsonb_build_array(${v}::jsonb)))"
    )
}

/// Translate a predicate into a SQL boolean expression, pushing parameters onto `q`.
pub fn where_expr(q: &mut QueryBuf, predicate: &Predicate) -> String {
    match predicate {
        Predicate::All => "TRUE".into(),
        Predicate::Never => "FALSE".into(),
        Predicate::Eq { field, value } => eq_clause(q, field, value),
        Predicate::In { field, values } => {
            if values.is_empty() {
                return "FALSE".into();
            }
            if field == ID_FIELD {
                let ids: Vec<String> = values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| format!("${}", q.push_text(s)))
                    .collect();
                if ids.is_empty() {
                    return "FALSE".into();
                }
                return format!("\"_id\" IN ({})", ids.join(", "));
            }
            let parts: Vec<String> = values.iter().map(|v| eq_clause(q, field, v)).collect();
            format!("({})", parts.join(" OR "))
        }
        Predicate::Contains { field, needle } => {
            let p = q.push_text(&like_pattern(needle));
            if field == ID_FIELD {
                return format!("\"_id\" ILIKE ${p} ESCAPE '\\'");
            }
            let f = q.push_text(field);
            format!("(jsonb_typeof(doc -> ${f}::text) = 'string' AND doc ->> ${f}::text ILIKE ${p} ESCAPE '\\')")
        }
        Predicate::And(terms) => join(q, terms, " AND ", "TRUE"),
        Predicate::Or(terms) => join(q, terms, " OR ", "FALSE"),
    }
}

fn join(q: &mut QueryBuf, terms: &[Predicate], sep: &str, empty: &str) -> String {
    if terms.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = terms.iter().map(|t| where_expr(q, t)).collect();
    format!("({})", parts.join(sep))
}

fn order_clause(q: &mut QueryBuf, sort: Option<&Sort>) -> String {
    match sort {
        None => " ORDER BY \"_id\"".into(),
        Some(s) => {
            let dir = match s.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            if s.field == ID_FIELD {
                format!(" ORDER BY \"_id\" {}", dir)
            } else {
                let f = q.push_text(&s.field);
                format!(" ORDER BY doc -> ${}::text {} NULLS {}, \"_id\"", f, dir, if dir == "ASC" { "FIRST" } else { "LAST" })
            }
        }
    }
}

/// SELECT with filter, ORDER BY (sort field then `_id`), optional LIMIT/OFFSET.
pub fn select(table: &str, predicate: &Predicate, options: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_expr(&mut q, predicate);
    let order = order_clause(&mut q, options.sort.as_ref());
    let limit = options.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset = if options.skip > 0 {
        format!(" OFFSET {}", options.skip)
    } else {
        String::new()
    };
    q.sql = format!("SELECT {} FROM {} WHERE {}{}{}{}", COLUMNS, table, where_clause, order, limit, offset);
    q
}

pub fn select_one(table: &str, predicate: &Predicate) -> QueryBuf {
    select(
        table,
        predicate,
        &FindOptions {
            limit: Some(1),
            ..Default::default()
        },
    )
}

pub fn count(table: &str, predicate: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_expr(&mut q, predicate);
    q.sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table, where_clause);
    q
}

/// INSERT one document. `body` excludes `_id` and `__v`.
pub fn insert(table: &str, id: &str, body: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_text(id);
    let doc_param = q.push_json(body);
    q.sql = format!(
        "INSERT INTO {} (\"_id\", \"__v\", doc) VALUES (${}, 0, ${}::jsonb) RETURNING {}",
        table, id_param, doc_param, COLUMNS
    );
    q
}

/// Merge `set` into the first match (by `_id` order).
pub fn update_one(table: &str, predicate: &Predicate, set: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let set_param = q.push_json(set);
    let where_clause = where_expr(&mut q, predicate);
    q.sql = format!(
        "UPDATE {t} SET doc = doc || ${s}::jsonb WHERE \"_id\" = (SELECT \"_id\" FROM {t} WHERE {w} ORDER BY \"_id\" LIMIT 1) RETURNING {c}",
        t = table,
        s = set_param,
        w = where_clause,
        c = COLUMNS
    );
    q
}

/// Delete the first match (by `_id` order).
pub fn delete_one(table: &str, predicate: &Predicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_expr(&mut q, predicate);
    q.sql = format!(
        "DELETE FROM {t} WHERE \"_id\" = (SELECT \"_id\" FROM {t} WHERE {w} ORDER BY \"_id\" LIMIT 1) RETURNING {c}",
        t = table,
        w = where_clause,
        c = COLUMNS
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_equality_uses_the_key_column() {
        let q = select_one("\"s\".\"tags\"", &Predicate::eq("_id", "abc"));
        assert_eq!(
            q.sql,
            "SELECT \"_id\", \"__v\", doc FROM \"s\".\"tags\" WHERE \"_id\" = $1 ORDER BY \"_id\" LIMIT 1"
        );
        assert_eq!(q.params, vec![BindValue::Text("abc".into())]);
    }

    #[test]
    fn field_equality_binds_name_and_json_value() {
        let mut q = QueryBuf::new();
        let sql = where_expr(&mut q, &Predicate::eq("views", 3));
        assert!(sql.starts_with("(doc -> $1::text = $2::jsonb OR"));
        assert_eq!(q.params, vec![BindValue::Text("views".into()), BindValue::Json(json!(3))]);
    }

    #[test]
    fn contains_escapes_like_metacharacters() {
        let mut q = QueryBuf::new();
        let sql = where_expr(&mut q, &Predicate::contains("name", "50%_off"));
        assert!(sql.contains("ILIKE $1 ESCAPE"));
        assert_eq!(q.params[0], BindValue::Text("%50\\%\\_off%".into()));
    }

    #[test]
    fn never_and_empty_in_are_false() {
        let mut q = QueryBuf::new();
        assert_eq!(where_expr(&mut q, &Predicate::Never), "FALSE");
        assert_eq!(where_expr(&mut q, &Predicate::one_of("name", vec![])), "FALSE");
        assert_eq!(where_expr(&mut q, &Predicate::eq("_id", 5)), "FALSE");
        assert!(q.params.is_empty());
    }

    #[test]
    fn select_orders_by_sort_field_then_id() {
        let opts = FindOptions {
            sort: Some(Sort {
                field: "title".into(),
                direction: SortDirection::Desc,
            }),
            skip: 10,
            limit: Some(5),
        };
        let q = select("t", &Predicate::All, &opts);
        assert_eq!(
            q.sql,
            "SELECT \"_id\", \"__v\", doc FROM t WHERE TRUE ORDER BY doc -> $1::text DESC NULLS LAST, \"_id\" LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn update_binds_set_before_filter() {
        let q = update_one("t", &Predicate::eq("_id", "x"), &json!({ "a": 1 }));
        assert!(q.sql.starts_with("UPDATE t SET doc = doc || $1::jsonb WHERE \"_id\" = (SELECT \"_id\" FROM t WHERE \"_id\" = $2"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn ddl_and_index_names_round_trip() {
        let ddl = create_collection("restify", "tags", &["slug"]);
        assert_eq!(ddl.len(), 3);
        assert!(ddl[2].contains("\"tags_slug_key\""));
        assert!(ddl[2].contains("(doc -> 'slug')"));
        assert_eq!(field_from_index_name("tags", "tags_slug_key"), Some("slug"));
        assert_eq!(field_from_index_name("tags", "tags_pkey"), None);
    }
}
