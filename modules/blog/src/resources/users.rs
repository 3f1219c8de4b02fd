use std::sync::Arc;

use jsonapi::memory::{sort_by, where_property, MemoryStore, MemoryTable};
use jsonapi::{Context, Create, Error, Field, Index, Model, Resource, Show, Update};
use serde_json::Value;

use super::validators::{email, text};
use crate::access::{can_see_post, is_admin};
use crate::relations::has_many;

/// Authored posts, minus drafts the caller may not see.
fn visible_posts(
    posts: Arc<MemoryTable>,
) -> impl Fn(&Model, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static {
    move |user: &Model, ctx: &Context<'_>| {
        let id = user.get("id").cloned().unwrap_or(Value::Null);
        let authored = posts
            .where_eq("author_id", &id)
            .into_iter()
            .filter(|post| can_see_post(Some(post), ctx))
            .collect();
        Ok(Value::Array(authored))
    }
}

pub fn users(store: &Arc<MemoryStore>) -> Resource {
    Resource::new("users")
        .capabilities(store.table("users").capabilities())
        .claims(|m| m.get("email").is_some())
        .field(
            Field::attribute("name")
                .writable()
                .required()
                .validate(text("name", 64)),
        )
        .field(
            Field::attribute("email")
                .visible(|_, ctx| is_admin(ctx))
                .writable()
                .required()
                .validate(email),
        )
        .field(
            Field::to_many("posts")
                .types(["posts"])
                .includable()
                .get(visible_posts(store.table("posts"))),
        )
        .field(
            Field::to_many("comments")
                .types(["comments"])
                .includable()
                .get(has_many(store.table("comments"), "author_id")),
        )
        .filter(where_property("name", "name"))
        .sort(sort_by("name", "name"))
        .endpoint(Index::new().default_sort("name"))
        .endpoint(Show::new())
        .endpoint(Create::new().visible(|_, ctx| is_admin(ctx)))
        .endpoint(Update::new().visible(|_, ctx| is_admin(ctx)))
}
