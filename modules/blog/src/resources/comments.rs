use std::sync::Arc;

use jsonapi::memory::{where_property, MemoryStore};
use jsonapi::{Create, Delete, Field, Index, Resource, Show};

use super::validators::text;
use crate::access::is_admin;
use crate::relations::{belongs_to, references, set_foreign_key, set_references};

const MENTIONABLE: &[&str] = &["users", "posts"];

pub fn comments(store: &Arc<MemoryStore>) -> Resource {
    Resource::new("comments")
        .capabilities(store.table("comments").capabilities())
        .claims(|m| m.get("text").is_some())
        .field(
            Field::attribute("text")
                .writable()
                .required()
                .validate(text("text", 500)),
        )
        .field(
            Field::to_one("post")
                .types(["posts"])
                .includable()
                .writable()
                .required()
                .get(belongs_to(store.table("posts"), "post_id"))
                .set(set_foreign_key("post_id")),
        )
        .field(
            Field::to_one("author")
                .types(["users"])
                .includable()
                .writable()
                .required()
                .get(belongs_to(store.table("users"), "author_id"))
                .set(set_foreign_key("author_id")),
        )
        .field(
            Field::to_many("mentions")
                .types(MENTIONABLE.iter().copied())
                .includable()
                .with_linkage()
                .writable()
                .get(references(store.clone(), "mentions"))
                .set(set_references(MENTIONABLE, "mentions")),
        )
        .filter(where_property("post", "post_id"))
        .filter(where_property("author", "author_id"))
        .endpoint(Index::new())
        .endpoint(Show::new())
        .endpoint(Create::new())
        .endpoint(Delete::new().visible(|_, ctx| is_admin(ctx)))
}
