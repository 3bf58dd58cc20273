//! Demo server: tags, users and posts from `models.json`, mounted under `/api`.
//!
//! Run from repo root: `cargo run -p demo-server`
//! Uses PostgreSQL when `DATABASE_URL` is set, otherwise an in-memory store.
//! When `RESTIFY_API_KEY` is set, every resource route requires `Authorization: Bearer <key>`.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Router,
};
use restify_sdk::{common_routes, load_from_path, MemoryStore, PgStore, Restify, Store};
use std::sync::Arc;
use tokio::net::TcpListener;

const BODY_LIMIT: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("restify_sdk=info,demo_server=info")),
        )
        .init();

    let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;
            Arc::new(PgStore::from_env(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "demo_server/models.json".into());
    let model = load_from_path(&config_path).await?;
    for m in &model.models {
        store.ensure_collection(m).await?;
    }

    let api_key = std::env::var("RESTIFY_API_KEY").ok().map(Arc::new);
    let mut app = Router::new().merge(common_routes(store.clone()));
    for resource in model.resources {
        let restify = Restify::new(resource.model, store.clone())
            .options(resource.options)
            .body_limit(BODY_LIMIT);
        let router = match api_key.clone() {
            Some(key) => restify
                .layer(from_fn(move |req: Request, next: Next| {
                    let key = key.clone();
                    async move { require_key(&key, req, next).await }
                }))
                .into_router()?,
            None => restify.into_router()?,
        };
        app = app.nest(&resource.path, router);
    }

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn require_key(key: &str, req: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", key);
    match req.headers().get(header::AUTHORIZATION) {
        Some(v) if v.as_bytes() == expected.as_bytes() => next.run(req).await,
        _ => {
            tracing::debug!(uri = %req.uri(), "rejected request without valid api key");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}
