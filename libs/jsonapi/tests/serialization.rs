//! Resource object rendering: attribute hooks, sparse fieldsets, meta and
//! compound documents built from `include`.

mod common;

use std::sync::Arc;

use common::{as_admin, first_error, fixture, get, key, keys, send};
use http::StatusCode;
use jsonapi::memory::MemoryTable;
use jsonapi::{Field, JsonApi, JsonApiRequest, Resource, Show};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn upper(value: Value) -> Value {
    json!(value.as_str().unwrap_or_default().to_uppercase())
}

fn hooks_api() -> JsonApi {
    let users = Arc::new(MemoryTable::new("users"));
    users.seed([json!({"id": "1", "raw": "raw", "getter": "raw"})]);

    JsonApi::builder()
        .base_path("")
        .resource(
            Resource::new("users")
                .capabilities(users.capabilities())
                .field(Field::attribute("raw"))
                .field(Field::attribute("getter").get(|_, _| Ok(json!("getter"))))
                .field(
                    Field::attribute("serialized")
                        .property("raw")
                        .serialize(|v, _| Ok(upper(v))),
                )
                .field(
                    Field::attribute("combined")
                        .get(|_, _| Ok(json!("getter")))
                        .serialize(|v, _| Ok(upper(v))),
                )
                .endpoint(Show::new()),
        )
        .build()
        .unwrap()
}

#[test]
fn test_getter_overrides_raw_property() {
    let api = hooks_api();
    let (status, body) = get(&api, "/users/1?fields[users]=raw,getter");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["attributes"],
        json!({"raw": "raw", "getter": "getter"})
    );
}

#[test]
fn test_serializer_applies_to_raw_value_and_getter_result() {
    let api = hooks_api();
    let (status, body) = get(&api, "/users/1");

    assert_eq!(status, StatusCode::OK);
    let attributes = &body["data"]["attributes"];
    assert_eq!(attributes["raw"], "raw");
    assert_eq!(attributes["serialized"], "RAW");
    assert_eq!(attributes["combined"], "GETTER");
}

#[test]
fn test_resource_object_shape() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts/1");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonapi"]["version"], "1.1");
    let data = &body["data"];
    assert_eq!(data["type"], "posts");
    assert_eq!(data["id"], "1");
    assert_eq!(
        data["attributes"],
        json!({"title": "Alpha", "body": "first", "rating": 5})
    );
    assert_eq!(data["meta"], json!({"words": 1}));
    assert_eq!(data["links"]["self"], "/api/posts/1");
    // to-one linkage is always present; to-many only when included
    assert_eq!(
        data["relationships"],
        json!({"author": {"data": {"type": "users", "id": "1"}}})
    );
    assert!(body.get("included").is_none());
}

#[test]
fn test_hidden_attribute_is_omitted_until_visible() {
    let f = fixture();
    let (_, body) = get(&f.api, "/api/users/1");
    assert!(body["data"]["attributes"].get("email").is_none());

    let (_, body) = send(&f.api, as_admin(JsonApiRequest::get("/api/users/1")));
    assert_eq!(body["data"]["attributes"]["email"], "ann@example.com");
}

#[test]
fn test_sparse_fieldset_limits_attributes_and_relationships() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts/1?fields[posts]=title");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["attributes"], json!({"title": "Alpha"}));
    assert!(body["data"].get("relationships").is_none());
}

#[test]
fn test_sparse_fieldset_does_not_block_side_loading() {
    let f = fixture();
    let (status, body) = get(
        &f.api,
        "/api/posts/1?include=author&fields[posts]=title&fields[users]=name",
    );

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("relationships").is_none());
    assert_eq!(keys(&body["included"]), vec![key("users", "1")]);
    assert_eq!(body["included"][0]["attributes"], json!({"name": "Ann"}));
}

#[test]
fn test_include_to_one_and_to_many() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts/1?include=author,comments");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["relationships"]["comments"]["data"],
        json!([{"type": "comments", "id": "1"}, {"type": "comments", "id": "2"}])
    );
    assert_eq!(
        keys(&body["included"]),
        vec![key("comments", "1"), key("comments", "2"), key("users", "1")]
    );
}

fn in_order(included: &Value) -> Vec<String> {
    included
        .as_array()
        .unwrap()
        .iter()
        .map(|o| format!("{}/{}", o["type"].as_str().unwrap(), o["id"].as_str().unwrap()))
        .collect()
}

#[test]
fn test_included_follows_breadth_first_discovery() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts/1?include=author.posts,comments");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        in_order(&body["included"]),
        vec!["users/1", "comments/1", "comments/2", "posts/3"]
    );
}

#[test]
fn test_diamond_include_is_deduplicated_and_expanded_on_both_paths() {
    let f = fixture();
    // users/1 is reached as the post author and as the author of comments/2
    let (status, body) = get(
        &f.api,
        "/api/posts/1?include=author.posts,comments.author.comments",
    );

    assert_eq!(status, StatusCode::OK);
    let included = body["included"].as_array().unwrap();
    assert_eq!(
        keys(&body["included"]),
        vec![
            key("comments", "1"),
            key("comments", "2"),
            key("comments", "3"),
            key("posts", "3"),
            key("users", "1"),
            key("users", "2"),
        ]
    );
    assert_eq!(included.len(), 6, "no resource object appears twice");
    assert_eq!(
        in_order(&body["included"]),
        vec!["users/1", "comments/1", "comments/2", "posts/3", "users/2", "comments/3"]
    );

    // the primary resource is never repeated in included
    assert!(!keys(&body["included"]).contains(&key("posts", "1")));

    let ann = included
        .iter()
        .find(|o| o["type"] == "users" && o["id"] == "1")
        .unwrap();
    assert_eq!(
        ann["relationships"]["posts"]["data"],
        json!([{"type": "posts", "id": "1"}, {"type": "posts", "id": "3"}])
    );
    assert_eq!(
        ann["relationships"]["comments"]["data"],
        json!([{"type": "comments", "id": "2"}, {"type": "comments", "id": "3"}])
    );
}

#[test]
fn test_include_on_collection_deduplicates_across_primary_models() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts?include=author&filter[author]=1");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(common::ids(&body["data"]), vec!["1", "3"]);
    assert_eq!(keys(&body["included"]), vec![key("users", "1")]);
}

#[test]
fn test_invalid_include_names_full_path() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts/1?include=author.nope");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = first_error(&body);
    assert_eq!(error["status"], "400");
    assert_eq!(error["source"]["parameter"], "include");
    assert!(error["detail"].as_str().unwrap().contains("author.nope"));
}

#[test]
fn test_include_of_attribute_is_rejected() {
    let f = fixture();
    let (status, body) = get(&f.api, "/api/posts/1?include=title");

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body)["source"]["parameter"], "include");
}

#[test]
fn test_include_deeper_than_limit_is_rejected() {
    let store = jsonapi::memory::MemoryStore::new();
    common::seed(&store);
    let api = JsonApi::builder()
        .max_include_depth(2)
        .resource(common::users_resource(&store))
        .resource(common::posts_resource(&store))
        .resource(common::comments_resource(&store))
        .build()
        .unwrap();

    let (status, _) = get(&api, "/api/posts/1?include=author.posts");
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&api, "/api/posts/1?include=author.posts.comments");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body)["source"]["parameter"], "include");
}

#[test]
fn test_null_to_one_linkage() {
    let f = fixture();
    f.comments
        .seed([json!({"id": "9", "text": "orphan", "post_id": null, "author_id": "2"})]);

    let (status, body) = get(&f.api, "/api/comments/9?include=post");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["relationships"]["post"], json!({"data": null}));
    assert!(body.get("included").is_none());
}
