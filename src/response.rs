//! Response helpers: bare JSON bodies plus the `Content-Range` header on lists.

use crate::store::Document;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// `<collection> <start>-<end>/<total>`, or `<collection> */<total>` for an empty page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRange {
    pub collection: String,
    pub start: u64,
    /// Records in this page.
    pub len: u64,
    pub total: u64,
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len == 0 {
            write!(f, "{} */{}", self.collection, self.total)
        } else {
            write!(
                f,
                "{} {}-{}/{}",
                self.collection,
                self.start,
                self.start + self.len - 1,
                self.total
            )
        }
    }
}

/// One page of shaped records.
#[derive(Clone, Debug)]
pub struct ListPage {
    pub records: Vec<Document>,
    pub range: ContentRange,
}

impl IntoResponse for ListPage {
    fn into_response(self) -> Response {
        let mut res = (StatusCode::OK, Json(self.records)).into_response();
        if let Ok(v) = HeaderValue::from_str(&self.range.to_string()) {
            res.headers_mut().insert(header::CONTENT_RANGE, v);
        }
        res.headers_mut().insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("Content-Range"),
        );
        res
    }
}

pub fn ok_one(record: Document) -> (StatusCode, Json<Document>) {
    (StatusCode::OK, Json(record))
}

pub fn created_one(record: Document) -> (StatusCode, Json<Document>) {
    (StatusCode::CREATED, Json(record))
}
