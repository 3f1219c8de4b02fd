//! The axum adapter: requests in, JSON:API documents out.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use blog::Blog;
use jsonapi::ApiConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

const MEDIA: &str = "application/vnd.api+json";

fn app() -> axum::Router {
    let blog = Blog::with_demo_data(&ApiConfig::default()).unwrap();
    jsonapi_server::router(Arc::new(blog.into_api()))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[tokio::test]
async fn test_get_collection() {
    let response = app()
        .oneshot(Request::get("/api/posts?sort=title&fields[posts]=title").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA);
    assert_eq!(response.headers()[header::VARY], "Accept");
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["attributes"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Compound documents", "Hello, JSON:API", "Sparse fieldsets"]);
}

#[tokio::test]
async fn test_incoming_request_id_is_propagated() {
    let response = app()
        .oneshot(
            Request::get("/api/users/1")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_errors_are_documents() {
    let response = app()
        .oneshot(Request::get("/api/widgets").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA);
    let body = json_body(response).await;
    assert_eq!(body["errors"][0]["status"], "404");
}

#[tokio::test]
async fn test_malformed_json_body_is_a_bad_request() {
    let response = app()
        .oneshot(
            Request::post("/api/posts")
                .header(header::CONTENT_TYPE, MEDIA)
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::VARY], "Accept");
    assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA);
    let body = json_body(response).await;
    assert_eq!(body["errors"][0]["status"], "400");
}

#[tokio::test]
async fn test_create_then_delete() {
    let app = app();
    let document = json!({
        "data": {
            "type": "comments",
            "attributes": {"text": "Over HTTP"},
            "relationships": {
                "post": {"data": {"type": "posts", "id": "1"}},
                "author": {"data": {"type": "users", "id": "3"}}
            }
        }
    });
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/comments")
                .header(header::CONTENT_TYPE, MEDIA)
                .body(Body::from(document.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let body = json_body(response).await;
    let id = body["data"]["id"].as_str().unwrap();
    assert_eq!(location, format!("/api/comments/{id}"));

    let response = app
        .oneshot(
            Request::delete(location.as_str())
                .header(blog::ROLE_HEADER, "admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    assert_eq!(json_body(response).await, Value::Null);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let big = vec![b' '; jsonapi_server::BODY_LIMIT + 1];
    let response = app()
        .oneshot(
            Request::post("/api/posts")
                .header(header::CONTENT_TYPE, MEDIA)
                .body(Body::from(big))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
