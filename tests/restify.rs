//! End-to-end behavior of generated resource routers over the in-memory store.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Router,
};
use restify_sdk::{
    common_routes, Document, FieldType, HookError, MemoryStore, Methods, ModelDescriptor, Restify,
    RestifyOptions, Store,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn tag_model() -> ModelDescriptor {
    ModelDescriptor::new("Tag")
        .required_field("name", FieldType::String)
        .unique_field("slug", FieldType::String)
}

fn post_model() -> ModelDescriptor {
    ModelDescriptor::new("Post")
        .required_field("title", FieldType::String)
        .field("views", FieldType::Number)
        .field("tags", FieldType::array(FieldType::reference("tags")))
        .with_timestamps()
}

fn app(model: ModelDescriptor, path: &str, options: RestifyOptions, store: Arc<dyn Store>) -> Router {
    let router = Restify::new(model, store).options(options).into_router().unwrap();
    Router::new().nest(path, router)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Response) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    (res.status(), res)
}

async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn encode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[tokio::test]
async fn create_then_get_by_returned_id() {
    let app = app(tag_model(), "/tags", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    let (status, res) = send(
        &app,
        Method::POST,
        "/tags",
        Some(json!({ "name": "Rust", "slug": "rust", "_id": "nope", "createdAt": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json_body(res).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 24);

    let (status, res) = send(&app, Method::GET, &format!("/tags/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "id": id, "name": "Rust", "slug": "rust" }));
}

#[tokio::test]
async fn alternate_primary_key_fetches_same_record() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let by_slug = app(tag_model(), "/tags", RestifyOptions::new().primary_key("slug"), store.clone());
    let (status, res) = send(&by_slug, Method::POST, "/tags", Some(json!({ "name": "Rust", "slug": "rust" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_body(res).await, json!({ "id": "rust", "name": "Rust" }));

    let (status, res) = send(&by_slug, Method::GET, "/tags/rust", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "id": "rust", "name": "Rust" }));

    let (status, _) = send(&by_slug, Method::GET, "/tags/go", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn numeric_primary_key_is_reachable() {
    let model = ModelDescriptor::new("Item")
        .unique_field("code", FieldType::Number)
        .field("name", FieldType::String);
    let app = app(model, "/items", RestifyOptions::new().primary_key("code"), Arc::new(MemoryStore::new()));
    let (status, res) = send(&app, Method::POST, "/items", Some(json!({ "code": 7, "name": "x" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_body(res).await, json!({ "id": 7, "name": "x" }));

    let (status, res) = send(&app, Method::GET, "/items/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "id": 7, "name": "x" }));

    let (status, res) = send(&app, Method::PATCH, "/items/7", Some(json!({ "name": "y" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await["name"], json!("y"));

    let (status, _) = send(&app, Method::GET, "/items/seven", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn match_fields_resolve_keyword() {
    let app = app(
        tag_model(),
        "/tags",
        RestifyOptions::new().match_fields(["slug"]),
        Arc::new(MemoryStore::new()),
    );
    let (_, res) = send(&app, Method::POST, "/tags", Some(json!({ "name": "Rust", "slug": "rust" }))).await;
    let created = json_body(res).await;
    let id = created["id"].as_str().unwrap();

    for key in [id, "rust"] {
        let (status, res) = send(&app, Method::GET, &format!("/tags/{}", key), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(res).await, created);
    }
}

#[tokio::test]
async fn free_text_search_is_case_insensitive_substring() {
    let app = app(tag_model(), "/tags", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    for (name, slug) in [("xABCx", "a"), ("abc", "b"), ("ab-c", "c"), ("zzz", "d")] {
        send(&app, Method::POST, "/tags", Some(json!({ "name": name, "slug": slug }))).await;
    }
    let uri = format!("/tags?filter={}", encode(r#"{"q":"abc"}"#));
    let (status, res) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<Value> = json_body(res).await.as_array().unwrap().iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("xABCx"), json!("abc")]);
}

#[tokio::test]
async fn array_filter_selects_any_listed_value() {
    let app = app(tag_model(), "/tags", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    for name in ["a", "b", "c"] {
        send(&app, Method::POST, "/tags", Some(json!({ "name": name, "slug": name }))).await;
    }
    let uri = format!(
        "/tags?filter={}&sort={}",
        encode(r#"{"name":["a","b"]}"#),
        encode(r#"["name","DESC"]"#)
    );
    let (status, res) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_RANGE).unwrap(), "tags 0-1/2");
    let names: Vec<Value> = json_body(res).await.as_array().unwrap().iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("b"), json!("a")]);
}

#[tokio::test]
async fn range_pages_and_reports_total() {
    let app = app(post_model(), "/posts", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    for i in 0..20 {
        let (status, _) = send(&app, Method::POST, "/posts", Some(json!({ "title": format!("p{}", i), "views": i }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let uri = format!("/posts?range={}&sort={}", encode("[0,9]"), encode(r#"["views","ASC"]"#));
    let (status, res) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_RANGE).unwrap(), "posts 0-9/20");
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_EXPOSE_HEADERS).unwrap(),
        "Content-Range"
    );
    let records = json_body(res).await;
    assert_eq!(records.as_array().unwrap().len(), 10);
    assert_eq!(records[0]["views"], json!(0));

    let uri = format!("/posts?range={}", encode("[40,49]"));
    let (_, res) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(res.headers().get(header::CONTENT_RANGE).unwrap(), "posts */20");
}

#[tokio::test]
async fn malformed_list_params_are_rejected() {
    let app = app(tag_model(), "/tags", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    for query in [
        format!("filter={}", encode("{not json")),
        format!("sort={}", encode(r#"["name","SIDEWAYS"]"#)),
        format!("range={}", encode("[5,1]")),
    ] {
        let (status, res) = send(&app, Method::GET, &format!("/tags?{}", query), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(json_body(res).await["error"]["code"], json!("bad_request"));
    }
}

#[tokio::test]
async fn update_merges_and_delete_removes() {
    let app = app(post_model(), "/posts", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    let (_, res) = send(&app, Method::POST, "/posts", Some(json!({ "title": "Hello", "views": 1 }))).await;
    let created = json_body(res).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, res) = send(&app, Method::PATCH, &format!("/posts/{}", id), Some(json!({ "views": "5" }))).await;
    assert_eq!(status, StatusCode::OK);
    let updated = json_body(res).await;
    assert_eq!(updated["title"], json!("Hello"));
    assert_eq!(updated["views"], json!(5));
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let (status, _) = send(&app, Method::PUT, &format!("/posts/{}", id), Some(json!({ "title": null }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, res) = send(&app, Method::DELETE, &format!("/posts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await["id"], json!(id));

    let (status, res) = send(&app, Method::GET, &format!("/posts/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"]["code"], json!("not_found"));

    let (status, _) = send(&app, Method::DELETE, &format!("/posts/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_identifier_is_not_found() {
    let app = app(tag_model(), "/tags", RestifyOptions::new(), Arc::new(MemoryStore::new()));
    let (status, _) = send(&app, Method::GET, "/tags/not-an-object-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_unique_field_conflicts() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store.ensure_collection(&tag_model()).await.unwrap();
    let app = app(tag_model(), "/tags", RestifyOptions::new(), store);
    let body = json!({ "name": "Rust", "slug": "rust" });
    let (status, _) = send(&app, Method::POST, "/tags", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, res) = send(&app, Method::POST, "/tags", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(res).await["error"]["code"], json!("conflict"));
}

#[tokio::test]
async fn disabled_operations_are_not_routed() {
    let methods = Methods {
        post: false,
        delete: false,
        ..Methods::default()
    };
    let some = app(tag_model(), "/tags", RestifyOptions::new().methods(methods), Arc::new(MemoryStore::new()));
    let (status, _) = send(&some, Method::POST, "/tags", Some(json!({ "name": "Rust", "slug": "rust" }))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&some, Method::DELETE, "/tags/5c1a2b3c4d5e6f7a8b9c0d1e", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&some, Method::GET, "/tags", None).await;
    assert_eq!(status, StatusCode::OK);

    let none = app(
        tag_model(),
        "/tags",
        RestifyOptions::new().methods(Methods::none()),
        Arc::new(MemoryStore::new()),
    );
    let (status, _) = send(&none, Method::GET, "/tags/5c1a2b3c4d5e6f7a8b9c0d1e", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn require_token(req: Request, next: Next) -> Response {
    match req.headers().get(header::AUTHORIZATION) {
        Some(v) if v == "Bearer letmein" => next.run(req).await,
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

#[tokio::test]
async fn layer_guards_every_bound_route() {
    let router = Restify::new(tag_model(), Arc::new(MemoryStore::new()))
        .layer(from_fn(require_token))
        .into_router()
        .unwrap();
    let app = Router::new().nest("/tags", router);

    let (status, _) = send(&app, Method::GET, "/tags", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method(Method::GET)
        .uri("/tags")
        .header(header::AUTHORIZATION, "Bearer letmein")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn hooks_shape_writes_and_reads() {
    let options = RestifyOptions::new()
        .preprocessor(|mut d: Document| async move {
            if d.get("name") == Some(&json!("forbidden")) {
                return Err(HookError::new("name not allowed"));
            }
            d.insert("slug".into(), json!("from-hook"));
            Ok(d)
        })
        .postprocessor(|mut d: Document| async move {
            d.insert("name".into(), json!("redacted"));
            Ok::<_, HookError>(d)
        });
    let app = app(tag_model(), "/tags", options, Arc::new(MemoryStore::new()));

    let (status, res) = send(&app, Method::POST, "/tags", Some(json!({ "name": "Rust", "slug": "rust" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json_body(res).await;
    assert_eq!(created["slug"], json!("from-hook"));
    assert_eq!(created["name"], json!("Rust"));

    let (_, res) = send(&app, Method::GET, &format!("/tags/{}", created["id"].as_str().unwrap()), None).await;
    assert_eq!(json_body(res).await["name"], json!("redacted"));

    let (status, _) = send(&app, Method::POST, "/tags", Some(json!({ "name": "forbidden", "slug": "f" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn populate_expands_references_on_reads() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let tags = app(tag_model(), "/tags", RestifyOptions::new(), store.clone());
    let posts = app(post_model(), "/posts", RestifyOptions::new().populate(["tags"]), store);

    let (_, res) = send(&tags, Method::POST, "/tags", Some(json!({ "name": "Rust", "slug": "rust" }))).await;
    let tag = json_body(res).await;
    let (status, res) = send(&posts, Method::POST, "/posts", Some(json!({ "title": "Hello", "tags": [tag["id"]] }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let post = json_body(res).await;
    assert_eq!(post["tags"], json!([tag["id"]]));

    let (_, res) = send(&posts, Method::GET, "/posts", None).await;
    let listed = json_body(res).await;
    assert_eq!(listed[0]["tags"], json!([tag]));
}

#[tokio::test]
async fn common_routes_report_health() {
    let app = common_routes(Arc::new(MemoryStore::new()));
    let (status, res) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "status": "ok" }));
    let (status, res) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(res).await["store"], json!("ok"));
}
