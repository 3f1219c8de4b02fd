//! Request roles. The demo trusts a plain header; a real deployment would
//! put an authenticating proxy in front.

use http::header::HeaderName;
use http::HeaderValue;
use jsonapi::{Context, JsonApiRequest, Model};
use serde_json::Value;

pub const ROLE_HEADER: &str = "x-blog-role";

pub fn is_admin(ctx: &Context<'_>) -> bool {
    ctx.request().header(HeaderName::from_static(ROLE_HEADER)) == Some("admin")
}

pub fn as_admin(request: JsonApiRequest) -> JsonApiRequest {
    request.with_header(
        HeaderName::from_static(ROLE_HEADER),
        HeaderValue::from_static("admin"),
    )
}

pub fn is_published(post: &Model) -> bool {
    post.get("published_at").is_some_and(Value::is_string)
}

/// Drafts are visible to admins only.
pub fn can_see_post(post: Option<&Model>, ctx: &Context<'_>) -> bool {
    post.map_or(true, is_published) || is_admin(ctx)
}
