//! Optional async hooks run before writes and after reads.

use crate::error::AppError;
use crate::store::Document;
use async_trait::async_trait;
use std::future::Future;

/// Keys a client may never write.
pub const READ_ONLY_FIELDS: &[&str] = &["createdAt", "updatedAt", "id", "_id"];

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        HookError(message.into())
    }
}

impl From<HookError> for AppError {
    fn from(e: HookError) -> Self {
        AppError::Hook(e.0)
    }
}

/// Single-argument document transformation.
///
/// Implemented for any `Fn(Document) -> impl Future<Output = Result<Document, HookError>>`,
/// so plain async closures work as hooks.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, doc: Document) -> Result<Document, HookError>;
}

#[async_trait]
impl<F, Fut> Processor for F
where
    F: Fn(Document) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Document, HookError>> + Send + 'static,
{
    async fn process(&self, doc: Document) -> Result<Document, HookError> {
        (self)(doc).await
    }
}

/// Strip read-only keys, then hand the body to the hook. The hook's output is what gets stored.
pub async fn preprocess(mut body: Document, hook: Option<&dyn Processor>) -> Result<Document, AppError> {
    for key in READ_ONLY_FIELDS {
        body.remove(*key);
    }
    match hook {
        Some(h) => Ok(h.process(body).await?),
        None => Ok(body),
    }
}

/// Replace a stored record with the hook's output; pass it through without a hook.
pub async fn postprocess(record: Document, hook: Option<&dyn Processor>) -> Result<Document, AppError> {
    match hook {
        Some(h) => Ok(h.process(record).await?),
        None => Ok(record),
    }
}
