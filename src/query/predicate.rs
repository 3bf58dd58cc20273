//! Storage-neutral condition tree produced by the filter builder and identifier matcher.
//! Stores translate it (SQL) or evaluate it directly (memory).

use crate::store::Document;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Matches every document.
    All,
    /// Matches no document.
    Never,
    /// Field equals value. An array field matches when any element equals the value.
    Eq { field: String, value: Value },
    /// Field equals one of the values.
    In { field: String, values: Vec<Value> },
    /// Case-insensitive literal substring match on a string field.
    Contains { field: String, needle: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Conjunction. `All` terms drop out, any `Never` wins, empty is `All`.
    pub fn and(terms: Vec<Predicate>) -> Self {
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Predicate::All => {}
                Predicate::Never => return Predicate::Never,
                Predicate::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::All,
            1 => out.remove(0),
            _ => Predicate::And(out),
        }
    }

    /// Disjunction. `Never` terms drop out, any `All` wins, empty is `Never`.
    pub fn or(terms: Vec<Predicate>) -> Self {
        let mut out = Vec::with_capacity(terms.len());
        for t in terms {
            match t {
                Predicate::Never => {}
                Predicate::All => return Predicate::All,
                Predicate::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::Never,
            1 => out.remove(0),
            _ => Predicate::Or(out),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Never => false,
            Predicate::Eq { field, value } => field_equals(doc.get(field), value),
            Predicate::In { field, values } => {
                let actual = doc.get(field);
                values.iter().any(|v| field_equals(actual, v))
            }
            Predicate::Contains { field, needle } => {
                let needle = needle.to_lowercase();
                match doc.get(field) {
                    Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                    _ => false,
                }
            }
            Predicate::And(terms) => terms.iter().all(|t| t.matches(doc)),
            Predicate::Or(terms) => terms.iter().any(|t| t.matches(doc)),
        }
    }
}

fn field_equals(actual: Option<&Value>, expected: &Value) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    if let (Value::Array(items), false) = (actual, expected.is_array()) {
        return items.iter().any(|i| json_eq(i, expected));
    }
    json_eq(actual, expected)
}

/// JSON equality with numbers compared by value (1 == 1.0).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn and_or_simplify() {
        assert_eq!(Predicate::and(vec![]), Predicate::All);
        assert_eq!(Predicate::or(vec![]), Predicate::Never);
        assert_eq!(Predicate::and(vec![Predicate::All, Predicate::eq("a", 1)]), Predicate::eq("a", 1));
        assert_eq!(Predicate::and(vec![Predicate::eq("a", 1), Predicate::Never]), Predicate::Never);
        assert_eq!(Predicate::or(vec![Predicate::Never, Predicate::eq("a", 1)]), Predicate::eq("a", 1));
        assert_eq!(Predicate::or(vec![Predicate::eq("a", 1), Predicate::All]), Predicate::All);
    }

    #[test]
    fn eq_matches_scalars_and_array_elements() {
        let d = doc(json!({ "name": "rust", "n": 3, "tags": ["a", "b"] }));
        assert!(Predicate::eq("name", "rust").matches(&d));
        assert!(!Predicate::eq("name", "Rust").matches(&d));
        assert!(Predicate::eq("n", 3.0).matches(&d));
        assert!(Predicate::eq("tags", "b").matches(&d));
        assert!(Predicate::eq("missing", Value::Null).matches(&d));
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        let d = doc(json!({ "name": "Learning ABC" }));
        assert!(Predicate::contains("name", "abc").matches(&d));
        assert!(Predicate::contains("name", "rning a").matches(&d));
        assert!(!Predicate::contains("name", "xyz").matches(&d));
        assert!(!Predicate::contains("n", "1").matches(&doc(json!({ "n": 1 }))));
        // no regex interpretation
        assert!(!Predicate::contains("name", "L.*C").matches(&d));
    }

    #[test]
    fn in_matches_any_value() {
        let d = doc(json!({ "name": "b" }));
        assert!(Predicate::one_of("name", vec![json!("a"), json!("b")]).matches(&d));
        assert!(!Predicate::one_of("name", vec![]).matches(&d));
    }
}
