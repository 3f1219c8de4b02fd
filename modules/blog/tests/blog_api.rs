//! End-to-end requests against the demo blog.

use blog::{as_admin, Blog};
use http::StatusCode;
use jsonapi::{ApiConfig, JsonApiRequest};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const MEDIA: &str = "application/vnd.api+json";

fn blog() -> Blog {
    Blog::with_demo_data(&ApiConfig::default()).unwrap()
}

fn send(blog: &Blog, request: JsonApiRequest) -> (StatusCode, Value) {
    let response = blog.api().serve(&request);
    let status = response.status();
    (status, serde_json::to_value(response.body()).unwrap())
}

fn get(blog: &Blog, target: &str) -> (StatusCode, Value) {
    send(blog, JsonApiRequest::get(target))
}

fn post(target: &str, body: Value) -> JsonApiRequest {
    JsonApiRequest::post(target).content_type(MEDIA).with_body(body)
}

fn ids(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect()
}

#[test]
fn test_drafts_are_hidden_from_listing() {
    let blog = blog();

    let (status, body) = get(&blog, "/api/posts");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), vec!["3", "2", "1"]);
    assert_eq!(body["meta"]["page"]["total"], 3);

    let (_, body) = send(&blog, as_admin(JsonApiRequest::get("/api/posts")));
    assert_eq!(ids(&body["data"]), vec!["4", "3", "2", "1"]);
}

#[test]
fn test_draft_show_requires_admin() {
    let blog = blog();
    let (status, _) = get(&blog, "/api/posts/4");
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&blog, as_admin(JsonApiRequest::get("/api/posts/4")));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["attributes"]["published_at"], Value::Null);
}

#[test]
fn test_author_posts_skip_drafts() {
    let blog = blog();
    let (status, body) = get(&blog, "/api/users/3?include=posts");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["relationships"]["posts"]["data"], json!([]));
    assert!(body.get("included").is_none());
}

#[test]
fn test_published_filter() {
    let blog = blog();
    let (_, body) = send(
        &blog,
        as_admin(JsonApiRequest::get("/api/posts?filter[published]=false")),
    );
    assert_eq!(ids(&body["data"]), vec!["4"]);

    let (status, body) = get(&blog, "/api/posts?filter[published]=maybe");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"][0]["source"]["parameter"],
        "filter[published]"
    );
}

#[test]
fn test_comment_count_meta() {
    let blog = blog();
    let (_, body) = get(&blog, "/api/posts/1");
    assert_eq!(body["data"]["meta"], json!({"comment_count": 2}));
}

#[test]
fn test_mentions_are_polymorphic() {
    let blog = blog();
    let (status, body) = get(&blog, "/api/comments/2?include=mentions");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["relationships"]["mentions"]["data"],
        json!([{"type": "users", "id": "2"}, {"type": "posts", "id": "2"}])
    );
    let mut included: Vec<(&str, &str)> = body["included"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| (o["type"].as_str().unwrap(), o["id"].as_str().unwrap()))
        .collect();
    included.sort();
    assert_eq!(included, vec![("posts", "2"), ("users", "2")]);
}

#[test]
fn test_create_post_normalises_timestamps() {
    let blog = blog();
    let (status, body) = send(
        &blog,
        post(
            "/api/posts",
            json!({
                "data": {
                    "type": "posts",
                    "attributes": {
                        "title": "Extensions",
                        "body": "Negotiated per request.",
                        "published_at": "2026-05-01T12:00:00+02:00"
                    },
                    "relationships": {"author": {"data": {"type": "users", "id": "2"}}}
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::CREATED);
    let attributes = &body["data"]["attributes"];
    assert_eq!(attributes["published_at"], "2026-05-01T10:00:00Z");
    assert!(attributes["created_at"].is_string());
    assert_eq!(body["data"]["meta"]["comment_count"], 0);
    assert_eq!(blog.table("posts").len(), 5);
}

#[test]
fn test_invalid_post_fields_are_unprocessable() {
    let blog = blog();
    let (status, body) = send(
        &blog,
        post(
            "/api/posts",
            json!({
                "data": {
                    "type": "posts",
                    "attributes": {"title": "   ", "published_at": "yesterday"},
                    "relationships": {"author": {"data": {"type": "users", "id": "1"}}}
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let mut pointers: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["source"]["pointer"].as_str().unwrap())
        .collect();
    pointers.sort();
    assert_eq!(
        pointers,
        vec!["/data/attributes/published_at", "/data/attributes/title"]
    );
}

#[test]
fn test_created_at_is_read_only() {
    let blog = blog();
    let (status, _) = send(
        &blog,
        JsonApiRequest::patch("/api/posts/1").content_type(MEDIA).with_body(json!({
            "data": {"type": "posts", "id": "1", "attributes": {"created_at": "2020-01-01T00:00:00Z"}}
        })),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[test]
fn test_user_creation_is_for_admins() {
    let blog = blog();
    let body = json!({
        "data": {"type": "users", "attributes": {"name": "Dee", "email": "dee@example.com"}}
    });

    let (status, _) = send(&blog, post("/api/users", body.clone()));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&blog, as_admin(post("/api/users", body)));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["attributes"]["email"], "dee@example.com");
}

#[test]
fn test_invalid_email_is_rejected() {
    let blog = blog();
    let (status, body) = send(
        &blog,
        as_admin(post(
            "/api/users",
            json!({"data": {"type": "users", "attributes": {"name": "Dee", "email": "dee.example.com"}}}),
        )),
    );

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["source"]["pointer"], "/data/attributes/email");
    assert!(body["errors"][0]["detail"]
        .as_str()
        .unwrap()
        .contains("dee.example.com"));
}

#[test]
fn test_comment_mentions_are_stored_as_references() {
    let blog = blog();
    let (status, body) = send(
        &blog,
        post(
            "/api/comments",
            json!({
                "data": {
                    "type": "comments",
                    "attributes": {"text": "Also see Ann's intro"},
                    "relationships": {
                        "post": {"data": {"type": "posts", "id": "3"}},
                        "author": {"data": {"type": "users", "id": "2"}},
                        "mentions": {"data": [{"type": "users", "id": "1"}, {"type": "posts", "id": "1"}]}
                    }
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap();
    let stored = blog.table("comments").get(id).unwrap();
    assert_eq!(stored["post_id"], "3");
    assert_eq!(
        stored["mentions"],
        json!([{"type": "users", "id": "1"}, {"type": "posts", "id": "1"}])
    );
}

#[test]
fn test_comment_delete_requires_admin() {
    let blog = blog();
    let (status, _) = send(&blog, JsonApiRequest::delete("/api/comments/1"));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&blog, as_admin(JsonApiRequest::delete("/api/comments/1")));
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(blog.table("comments").len(), 3);
}
