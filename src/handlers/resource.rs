//! Resource handlers: list, create, get, update, delete. State is the bound [`ResourceService`].

use crate::error::AppError;
use crate::query::{ListQuery, RawListQuery};
use crate::response::{created_one, ok_one, ListPage};
use crate::service::ResourceService;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

pub async fn list(
    State(svc): State<ResourceService>,
    Query(raw): Query<RawListQuery>,
) -> Result<ListPage, AppError> {
    let query = ListQuery::parse(&raw)?;
    svc.list(&query).await
}

pub async fn create(
    State(svc): State<ResourceService>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let record = svc.create(body).await?;
    Ok(created_one(record))
}

pub async fn read(
    State(svc): State<ResourceService>,
    Path(keyword): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = svc.get(&keyword).await?;
    Ok(ok_one(record))
}

/// Serves both PUT and PATCH; either merges the body into the stored record.
pub async fn update(
    State(svc): State<ResourceService>,
    Path(keyword): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let record = svc.update(&keyword, body).await?;
    Ok(ok_one(record))
}

pub async fn delete(
    State(svc): State<ResourceService>,
    Path(keyword): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = svc.delete(&keyword).await?;
    Ok(ok_one(record))
}
