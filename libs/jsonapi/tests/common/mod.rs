//! Shared fixtures: a small users/posts/comments API over the in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use http::header::HeaderName;
use http::{HeaderValue, StatusCode};
use jsonapi::memory::{sort_by, where_property, MemoryStore, MemoryTable};
use jsonapi::{
    Context, Create, Delete, Error, Field, Index, JsonApi, JsonApiRequest, MetaField,
    OffsetPagination, Resource, Show, Update,
};
use serde_json::{json, Value};

pub const ROLE_HEADER: &str = "x-role";

pub struct Fixture {
    pub api: JsonApi,
    pub users: Arc<MemoryTable>,
    pub posts: Arc<MemoryTable>,
    pub comments: Arc<MemoryTable>,
}

pub fn is_admin(ctx: &Context<'_>) -> bool {
    ctx.request().header(HeaderName::from_static(ROLE_HEADER)) == Some("admin")
}

pub fn as_admin(request: JsonApiRequest) -> JsonApiRequest {
    request.with_header(
        HeaderName::from_static(ROLE_HEADER),
        HeaderValue::from_static("admin"),
    )
}

/// Reads the related model through a foreign key column.
fn belongs_to(table: &Arc<MemoryTable>, column: &'static str) -> impl Fn(&Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static {
    let table = table.clone();
    move |model: &Value, _ctx: &Context<'_>| {
        Ok(match model.get(column) {
            Some(Value::String(id)) => table.get(id).unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }
}

/// Writes the id of a resolved related model into a foreign key column.
fn set_foreign_key(column: &'static str) -> impl Fn(&mut Value, Value, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static {
    move |model: &mut Value, related: Value, _ctx: &Context<'_>| {
        model[column] = related.get("id").cloned().unwrap_or(Value::Null);
        Ok(())
    }
}

fn has_many(table: &Arc<MemoryTable>, column: &'static str) -> impl Fn(&Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static {
    let table = table.clone();
    move |model: &Value, _ctx: &Context<'_>| {
        let id = model.get("id").cloned().unwrap_or(Value::Null);
        Ok(Value::Array(table.where_eq(column, &id)))
    }
}

pub fn seed(store: &MemoryStore) {
    store.table("users").seed([
        json!({"id": "1", "name": "Ann", "email": "ann@example.com"}),
        json!({"id": "2", "name": "Bob", "email": "bob@example.com"}),
        json!({"id": "3", "name": "Cid", "email": "cid@example.com"}),
    ]);
    store.table("posts").seed([
        json!({"id": "1", "title": "Alpha", "body": "first", "rating": 5, "author_id": "1"}),
        json!({"id": "2", "title": "Beta", "body": "second", "rating": 3, "author_id": "2"}),
        json!({"id": "3", "title": "Gamma", "body": null, "rating": 4, "author_id": "1"}),
        json!({"id": "4", "title": "Delta", "body": "draft", "rating": 1, "author_id": "3", "draft": true}),
    ]);
    store.table("comments").seed([
        json!({"id": "1", "text": "Nice", "post_id": "1", "author_id": "2"}),
        json!({"id": "2", "text": "Thanks", "post_id": "1", "author_id": "1"}),
        json!({"id": "3", "text": "Meh", "post_id": "2", "author_id": "1"}),
    ]);
}

pub fn users_resource(store: &MemoryStore) -> Resource {
    let users = store.table("users");
    Resource::new("users")
        .capabilities(users.capabilities())
        .claims(|m| m.get("email").is_some())
        .field(Field::attribute("name").writable().required())
        .field(Field::attribute("email").visible(|_, ctx| is_admin(ctx)))
        .field(
            Field::to_many("posts")
                .types(["posts"])
                .includable()
                .get(has_many(&store.table("posts"), "author_id")),
        )
        .field(
            Field::to_many("comments")
                .types(["comments"])
                .includable()
                .get(has_many(&store.table("comments"), "author_id")),
        )
        .filter(where_property("name", "name"))
        .sort(sort_by("name", "name"))
        .endpoint(Index::new())
        .endpoint(Show::new())
}

pub fn posts_resource(store: &MemoryStore) -> Resource {
    let posts = store.table("posts");
    Resource::new("posts")
        .capabilities(posts.capabilities())
        .claims(|m| m.get("title").is_some())
        .field(
            Field::attribute("title")
                .writable()
                .required()
                .validate(|v, _| match v.as_str() {
                    Some(s) if !s.trim().is_empty() => Ok(()),
                    _ => Err("title must be a non-empty string".to_string()),
                }),
        )
        .field(Field::attribute("body").writable().nullable())
        .field(
            Field::attribute("rating")
                .writable()
                .validate(|v, _| match v.as_u64() {
                    Some(1..=5) => Ok(()),
                    _ => Err("rating must be between 1 and 5".to_string()),
                }),
        )
        .field(
            Field::to_one("author")
                .types(["users"])
                .includable()
                .writable()
                .nullable()
                .get(belongs_to(&store.table("users"), "author_id"))
                .set(set_foreign_key("author_id")),
        )
        .field(
            Field::to_many("comments")
                .types(["comments"])
                .includable()
                .get(has_many(&store.table("comments"), "post_id")),
        )
        .meta(MetaField::new("words", |m, _| {
            let words = m
                .get("body")
                .and_then(Value::as_str)
                .map_or(0, |b| b.split_whitespace().count());
            Ok(json!(words))
        }))
        .filter(where_property("title", "title"))
        .filter(where_property("rating", "rating"))
        .filter(where_property("author", "author_id"))
        .sort(sort_by("title", "title"))
        .sort(sort_by("rating", "rating"))
        .endpoint(Index::new().paginate(OffsetPagination::new(10, 10)))
        .endpoint(Show::new().visible(|model, ctx| {
            let draft = model
                .and_then(|m| m.get("draft"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            !draft || is_admin(ctx)
        }))
        .endpoint(Create::new())
        .endpoint(Update::new())
        .endpoint(Delete::new())
}

pub fn comments_resource(store: &MemoryStore) -> Resource {
    let comments = store.table("comments");
    Resource::new("comments")
        .capabilities(comments.capabilities())
        .claims(|m| m.get("text").is_some())
        .field(Field::attribute("text").writable())
        .field(
            Field::to_one("post")
                .types(["posts"])
                .includable()
                .get(belongs_to(&store.table("posts"), "post_id")),
        )
        .field(
            Field::to_one("author")
                .types(["users"])
                .includable()
                .get(belongs_to(&store.table("users"), "author_id")),
        )
        .endpoint(Index::new())
        .endpoint(Show::new())
}

pub fn fixture() -> Fixture {
    let store = MemoryStore::new();
    seed(&store);
    let api = JsonApi::builder()
        .base_path("/api")
        .resource(users_resource(&store))
        .resource(posts_resource(&store))
        .resource(comments_resource(&store))
        .build()
        .expect("fixture api must build");
    Fixture {
        api,
        users: store.table("users"),
        posts: store.table("posts"),
        comments: store.table("comments"),
    }
}

/// Status and JSON body (`null` when there is none).
pub fn send(api: &JsonApi, request: JsonApiRequest) -> (StatusCode, Value) {
    let response = api.serve(&request);
    let status = response.status();
    let body = serde_json::to_value(response.body()).expect("document serializes");
    (status, body)
}

pub fn get(api: &JsonApi, target: &str) -> (StatusCode, Value) {
    send(api, JsonApiRequest::get(target))
}

pub fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .map(|a| {
            a.iter()
                .map(|o| o["id"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// `(type, id)` pairs, sorted.
pub fn keys(items: &Value) -> Vec<(String, String)> {
    let mut keys: Vec<(String, String)> = items
        .as_array()
        .map(|a| {
            a.iter()
                .map(|o| {
                    (
                        o["type"].as_str().unwrap_or_default().to_string(),
                        o["id"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    keys.sort();
    keys
}

pub fn key(kind: &str, id: &str) -> (String, String) {
    (kind.to_string(), id.to_string())
}

pub fn first_error(body: &Value) -> &Value {
    &body["errors"][0]
}
