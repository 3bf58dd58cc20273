//! List query parameters: `filter`, `sort`, `range`, each a JSON string.

use crate::error::AppError;
use serde::Deserialize;
use serde_json::Value;

/// Upper bound on records returned by one list request.
pub const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Inclusive `[start, end]` window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn skip(&self) -> u64 {
        self.start
    }

    pub fn limit(&self) -> u64 {
        self.end
            .saturating_sub(self.start)
            .saturating_add(1)
            .min(MAX_PAGE_SIZE)
    }
}

/// Raw query string as received.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawListQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub range: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Option<Value>,
    pub sort: Option<Sort>,
    pub range: Option<Range>,
}

impl ListQuery {
    pub fn parse(raw: &RawListQuery) -> Result<Self, AppError> {
        let filter = non_empty(&raw.filter)
            .map(|s| serde_json::from_str::<Value>(s))
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("filter: {}", e)))?;
        let sort = non_empty(&raw.sort).map(parse_sort).transpose()?;
        let range = non_empty(&raw.range).map(parse_range).transpose()?;
        Ok(ListQuery { filter, sort, range })
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_sort(s: &str) -> Result<Sort, AppError> {
    let (field, order): (String, String) =
        serde_json::from_str(s).map_err(|e| AppError::BadRequest(format!("sort: {}", e)))?;
    if field.is_empty() {
        return Err(AppError::BadRequest("sort: empty field".into()));
    }
    let direction = if order.eq_ignore_ascii_case("ASC") {
        SortDirection::Asc
    } else if order.eq_ignore_ascii_case("DESC") {
        SortDirection::Desc
    } else {
        return Err(AppError::BadRequest(format!("sort: order must be ASC or DESC, got {}", order)));
    };
    Ok(Sort { field, direction })
}

fn parse_range(s: &str) -> Result<Range, AppError> {
    let (start, end): (u64, u64) =
        serde_json::from_str(s).map_err(|e| AppError::BadRequest(format!("range: {}", e)))?;
    if end < start {
        return Err(AppError::BadRequest(format!("range: end {} before start {}", end, start)));
    }
    if start > i64::MAX as u64 {
        return Err(AppError::BadRequest(format!("range: start {} out of bounds", start)));
    }
    Ok(Range { start, end })
}
