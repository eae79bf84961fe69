//! End-to-end: the address book served through the full axum stack.

use apikit::{
    api_routes, build_registry, common_routes, register_crud, AppState, Dispatcher, EntitySchema, Property,
    StorageBackend,
};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> Router {
    let schema = EntitySchema::builder("addressbook_entry")
        .property("name", Property::string().not_null().max_length(100))
        .property("email", Property::string().max_length(100))
        .build()
        .unwrap();
    let registry = Arc::new(build_registry(vec![schema], &StorageBackend::memory()).await.unwrap());
    let dispatcher = register_crud(Dispatcher::builder(registry), "addressbook_entry")
        .build()
        .unwrap();
    common_routes().nest("/api", api_routes(AppState::new(dispatcher, 1024)))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, name: &str) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/api/addressbook_entry",
        Some(json!({"_type": "addressbook_entry", "name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn post_creates_entity_with_key() {
    let app = app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/addressbook_entry",
        Some(json!({"_type": "addressbook_entry", "name": "Fred Bloggs", "email": "fred@bloggs.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_type"], json!("addressbook_entry"));
    assert!(body["_key"].as_u64().unwrap() > 0);
    assert_eq!(body["name"], json!("Fred Bloggs"));
    assert_eq!(body["email"], json!("fred@bloggs.com"));

    let key = body["_key"].as_u64().unwrap();
    let (status, read) = call(&app, "GET", &format!("/api/addressbook_entry/{}", key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read, body);
}

#[tokio::test]
async fn missing_entity_is_not_found() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/api/addressbook_entry/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"code": 404, "reason": "No addressbook_entry entity with key 42"})
    );
}

#[tokio::test]
async fn null_name_update_is_bad_request() {
    let app = app().await;
    let (status, body) = call(&app, "PUT", "/api/addressbook_entry/3", Some(json!({"name": null}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!(400));

    for name in ["a", "b", "c"] {
        create(&app, name).await;
    }
    let (status, _) = call(&app, "PUT", "/api/addressbook_entry/3", Some(json!({"name": null}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, stored) = call(&app, "GET", "/api/addressbook_entry/3", None).await;
    assert_eq!(stored["name"], json!("c"));
}

#[tokio::test]
async fn list_respects_limit() {
    let app = app().await;
    for name in ["a", "b", "c"] {
        create(&app, name).await;
    }
    let (status, feed) = call(&app, "GET", "/api/addressbook_entry?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["_type"], json!("addressbook_entry"));
    assert_eq!(feed["limit"], json!(2));
    assert_eq!(feed["count"], json!(2));
    assert_eq!(feed["items"].as_array().unwrap().len(), 2);

    let (_, all) = call(&app, "GET", "/api/addressbook_entry", None).await;
    assert_eq!(all["count"], json!(3));
    assert_eq!(all["limit"], Value::Null);

    for bad in ["0", "-5", "abc"] {
        let (status, _) = call(&app, "GET", &format!("/api/addressbook_entry?limit={}", bad), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "limit={bad}");
    }
}

#[tokio::test]
async fn delete_twice_is_not_found() {
    let app = app().await;
    let key = create(&app, "Fred").await["_key"].as_u64().unwrap();
    let uri = format!("/api/addressbook_entry/{}", key);

    let (status, body) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));

    let (status, body) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!(404));
}

#[tokio::test]
async fn unknown_paths_and_methods_are_not_found() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/api/nothing/here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"code": 404, "reason": "Not found, unknown path: /nothing/here"})
    );

    let (status, _) = call(&app, "PATCH", "/api/addressbook_entry/1", Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/addressbook_entry")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/addressbook_entry",
        Some(json!({"_type": "robot", "name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = app().await;
    let name = "x".repeat(2048);
    let (status, body) = call(&app, "POST", "/api/addressbook_entry", Some(json!({"name": name}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"code": 400, "reason": "request body exceeds 1024 bytes"})
    );

    let payload = json!({"name": "x".repeat(2048)}).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/addressbook_entry")
        .header("content-type", "application/json")
        .header("content-length", payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], json!(400));
}

#[tokio::test]
async fn health_is_served_outside_the_api() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}
