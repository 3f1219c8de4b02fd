use std::any::Any;
use std::sync::Arc;

use chrono::Utc;
use jsonapi::memory::{sort_by, where_property, MemoryQuery, MemoryStore, MemoryTable};
use jsonapi::{
    Context, Create, Creatable, Delete, Error, Field, Filter, FilterGroup, Index, Listable,
    MetaField, Model, OffsetPagination, Query, Resource, Show, Update,
};
use serde_json::{json, Value};

use super::validators::{format_utc, text, timestamp, to_utc};
use crate::access::{can_see_post, is_admin, is_published};
use crate::relations::{belongs_to, has_many, set_foreign_key};

/// Listing that hides drafts from everyone but admins. Counting and
/// pagination stay on the table since they share its query type.
pub struct PublishedOnly(pub Arc<MemoryTable>);

impl Listable for PublishedOnly {
    fn query(&self, ctx: &Context<'_>) -> Result<Query, Error> {
        let mut query = MemoryQuery::default();
        if !is_admin(ctx) {
            query.filter(is_published);
        }
        Ok(Box::new(query))
    }

    fn results(
        &self,
        query: &(dyn Any + Send + Sync),
        ctx: &Context<'_>,
    ) -> Result<Vec<Model>, Error> {
        self.0.results(query, ctx)
    }

    fn sub_query(&self, parent: &Query, ctx: &Context<'_>) -> Result<Query, Error> {
        self.0.sub_query(parent, ctx)
    }

    fn combine(
        &self,
        query: &mut Query,
        group: FilterGroup,
        parts: Vec<Query>,
        ctx: &Context<'_>,
    ) -> Result<(), Error> {
        self.0.combine(query, group, parts, ctx)
    }
}

/// Stamps `created_at` on new models before they reach the table.
pub struct Timestamped(pub Arc<MemoryTable>);

impl Creatable for Timestamped {
    fn new_model(&self, _ctx: &Context<'_>) -> Result<Model, Error> {
        Ok(json!({"created_at": format_utc(Utc::now())}))
    }

    fn create(&self, model: Model, ctx: &Context<'_>) -> Result<Model, Error> {
        self.0.create(model, ctx)
    }
}

/// `filter[published]=true|false`
fn published_filter() -> Filter {
    Filter::new::<MemoryQuery, _>(
        "published",
        |query: &mut MemoryQuery, value: &Value, _ctx: &Context<'_>| {
            let wanted = match value {
                Value::Bool(b) => *b,
                Value::String(s) if s == "true" => true,
                Value::String(s) if s == "false" => false,
                _ => return Err(Error::bad_request("Expected true or false")),
            };
            query.filter(move |m| is_published(m) == wanted);
            Ok(())
        },
    )
}

pub fn posts(store: &Arc<MemoryStore>) -> Resource {
    let table = store.table("posts");
    let mut caps = table
        .capabilities()
        .with_list(Arc::new(PublishedOnly(table.clone())));
    caps.create = Some(Arc::new(Timestamped(table)));

    let comments = store.table("comments");
    Resource::new("posts")
        .capabilities(caps)
        .claims(|m| m.get("title").is_some())
        .field(
            Field::attribute("title")
                .writable()
                .required()
                .validate(text("title", 120)),
        )
        .field(Field::attribute("body").writable().nullable())
        .field(
            Field::attribute("published_at")
                .writable()
                .nullable()
                .deserialize(to_utc)
                .validate(timestamp),
        )
        .field(Field::attribute("created_at"))
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
            Field::to_many("comments")
                .types(["comments"])
                .includable()
                .get(has_many(comments.clone(), "post_id")),
        )
        .meta(MetaField::new("comment_count", move |m: &Model, _ctx: &Context<'_>| {
            let id = m.get("id").cloned().unwrap_or(Value::Null);
            Ok(json!(comments.where_eq("post_id", &id).len()))
        }))
        .filter(where_property("title", "title"))
        .filter(where_property("author", "author_id"))
        .filter(published_filter())
        .sort(sort_by("title", "title"))
        .sort(sort_by("published_at", "published_at"))
        .sort(sort_by("created_at", "created_at"))
        .endpoint(
            Index::new()
                .default_sort("-created_at")
                .paginate(OffsetPagination::default()),
        )
        .endpoint(Show::new().visible(can_see_post))
        .endpoint(Create::new())
        .endpoint(Update::new().visible(can_see_post))
        .endpoint(Delete::new().visible(|_, ctx| is_admin(ctx)))
}
