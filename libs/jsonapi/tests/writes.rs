//! Create, update and delete through the endpoints.

mod common;

use common::{first_error, fixture, get, send};
use http::header::LOCATION;
use http::StatusCode;
use jsonapi::JsonApiRequest;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const MEDIA: &str = "application/vnd.api+json";

fn post(target: &str, body: Value) -> JsonApiRequest {
    JsonApiRequest::post(target).content_type(MEDIA).with_body(body)
}

fn patch(target: &str, body: Value) -> JsonApiRequest {
    JsonApiRequest::patch(target).content_type(MEDIA).with_body(body)
}

#[test]
fn test_create_returns_created_document_and_location() {
    let f = fixture();
    let request = post(
        "/api/posts",
        json!({
            "data": {
                "type": "posts",
                "attributes": {"title": "Epsilon", "body": "new post here", "rating": 2},
                "relationships": {"author": {"data": {"type": "users", "id": "2"}}}
            }
        }),
    );
    let response = f.api.serve(&request);

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = serde_json::to_value(response.body()).unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(
        response.headers()[LOCATION],
        format!("/api/posts/{id}").as_str()
    );
    assert_eq!(body["data"]["attributes"]["title"], "Epsilon");
    assert_eq!(body["data"]["meta"]["words"], 3);
    assert_eq!(
        body["data"]["relationships"]["author"]["data"],
        json!({"type": "users", "id": "2"})
    );

    let stored = f.posts.get(&id).unwrap();
    assert_eq!(stored["author_id"], "2");
    assert_eq!(f.posts.len(), 5);
}

#[test]
fn test_create_honours_include() {
    let f = fixture();
    let request = post(
        "/api/posts?include=author",
        json!({
            "data": {
                "type": "posts",
                "attributes": {"title": "Zeta"},
                "relationships": {"author": {"data": {"type": "users", "id": "3"}}}
            }
        }),
    );
    let (status, body) = send(&f.api, request);

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["included"][0]["type"], "users");
    assert_eq!(body["included"][0]["id"], "3");
}

#[test]
fn test_create_requires_data_object() {
    let f = fixture();
    let (status, body) = send(&f.api, post("/api/posts", json!({"data": []})));

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body)["source"]["pointer"], "/data");
}

#[test]
fn test_create_with_mismatched_type_conflicts() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        post("/api/posts", json!({"data": {"type": "users", "attributes": {"title": "x"}}})),
    );

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(first_error(&body)["source"]["pointer"], "/data/type");
}

#[test]
fn test_client_generated_ids_are_forbidden() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        post(
            "/api/posts",
            json!({"data": {"type": "posts", "id": "77", "attributes": {"title": "x"}}}),
        ),
    );

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(first_error(&body)["source"]["pointer"], "/data/id");
}

#[test]
fn test_unknown_attribute_is_a_bad_request() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        post(
            "/api/posts",
            json!({"data": {"type": "posts", "attributes": {"title": "x", "color": "red"}}}),
        ),
    );

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        first_error(&body)["source"]["pointer"],
        "/data/attributes/color"
    );
}

#[test]
fn test_read_only_relationship_is_forbidden() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        post(
            "/api/posts",
            json!({
                "data": {
                    "type": "posts",
                    "attributes": {"title": "x"},
                    "relationships": {"comments": {"data": []}}
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        first_error(&body)["source"]["pointer"],
        "/data/relationships/comments"
    );
}

#[test]
fn test_validation_errors_are_collected() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        post(
            "/api/posts",
            json!({
                "data": {
                    "type": "posts",
                    "attributes": {"rating": 9, "body": null},
                    "relationships": {"author": {"data": {"type": "users", "id": "404"}}}
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let mut pointers: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            assert_eq!(e["status"], "422");
            e["source"]["pointer"].as_str().unwrap()
        })
        .collect();
    pointers.sort();
    assert_eq!(
        pointers,
        vec![
            "/data/attributes/rating",
            "/data/attributes/title",
            "/data/relationships/author/data",
        ]
    );
    assert_eq!(f.posts.len(), 4, "nothing was stored");
}

#[test]
fn test_non_nullable_attribute_rejects_null() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        patch(
            "/api/posts/1",
            json!({"data": {"type": "posts", "id": "1", "attributes": {"title": null}}}),
        ),
    );

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        first_error(&body)["source"]["pointer"],
        "/data/attributes/title"
    );
}

#[test]
fn test_relationship_to_disallowed_type_is_unprocessable() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        patch(
            "/api/posts/1",
            json!({
                "data": {
                    "type": "posts",
                    "id": "1",
                    "relationships": {"author": {"data": {"type": "comments", "id": "1"}}}
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        first_error(&body)["source"]["pointer"],
        "/data/relationships/author/data"
    );
}

#[test]
fn test_update_changes_only_submitted_fields() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        patch(
            "/api/posts/2",
            json!({
                "data": {
                    "type": "posts",
                    "id": "2",
                    "attributes": {"title": "Beta 2"},
                    "relationships": {"author": {"data": {"type": "users", "id": "3"}}}
                }
            }),
        ),
    );

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["attributes"]["title"], "Beta 2");
    assert_eq!(body["data"]["attributes"]["body"], "second");
    assert_eq!(
        body["data"]["relationships"]["author"]["data"],
        json!({"type": "users", "id": "3"})
    );

    let (_, body) = get(&f.api, "/api/posts/2");
    assert_eq!(body["data"]["attributes"]["title"], "Beta 2");
    assert_eq!(f.posts.get("2").unwrap()["author_id"], "3");
}

#[test]
fn test_update_clears_to_one_relationship() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        patch(
            "/api/posts/3",
            json!({"data": {"type": "posts", "id": "3", "relationships": {"author": {"data": null}}}}),
        ),
    );

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["relationships"]["author"], json!({"data": null}));
}

#[test]
fn test_update_id_must_match_url() {
    let f = fixture();
    let (status, body) = send(
        &f.api,
        patch(
            "/api/posts/1",
            json!({"data": {"type": "posts", "id": "2", "attributes": {"title": "x"}}}),
        ),
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(first_error(&body)["source"]["pointer"], "/data/id");

    let (status, body) = send(
        &f.api,
        patch("/api/posts/1", json!({"data": {"type": "posts", "attributes": {"title": "x"}}})),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body)["source"]["pointer"], "/data/id");
}

#[test]
fn test_update_missing_model_is_not_found() {
    let f = fixture();
    let (status, _) = send(
        &f.api,
        patch(
            "/api/posts/999",
            json!({"data": {"type": "posts", "id": "999", "attributes": {"title": "x"}}}),
        ),
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_delete_returns_no_content() {
    let f = fixture();
    let response = f.api.serve(&JsonApiRequest::delete("/api/posts/2"));

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.body().is_none());
    assert!(response.headers().get(http::header::CONTENT_TYPE).is_none());
    assert!(f.posts.get("2").is_none());

    let (status, _) = get(&f.api, "/api/posts/2");
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&f.api, JsonApiRequest::delete("/api/posts/2"));
    assert_eq!(status, StatusCode::NOT_FOUND);
}
