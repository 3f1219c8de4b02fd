use jsonapi_core::PageWindow;
use serde_json::{json, Map, Value};

use crate::context::Context;
use crate::document::Document;
use crate::error::Error;
use crate::request::encode_query;

/// `page[offset]` / `page[limit]` pagination. Limits left unset fall back to
/// the API configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetPagination {
    default_limit: Option<u64>,
    max_limit: Option<u64>,
}

impl OffsetPagination {
    pub fn new(default_limit: u64, max_limit: u64) -> Self {
        Self {
            default_limit: Some(default_limit),
            max_limit: Some(max_limit),
        }
    }

    pub fn window(&self, ctx: &Context<'_>) -> Result<PageWindow, Error> {
        let api = ctx.api();
        let window = PageWindow::parse(
            ctx.query_param("page"),
            self.default_limit.unwrap_or(api.default_page_limit()),
            self.max_limit.unwrap_or(api.max_page_limit()),
        )?;
        Ok(window)
    }

    /// Add `meta.page` and the first/prev/next/last links.
    pub fn decorate(
        &self,
        doc: &mut Document,
        ctx: &Context<'_>,
        window: PageWindow,
        count: usize,
        total: Option<u64>,
    ) {
        let mut page = Map::new();
        page.insert("offset".into(), json!(window.offset));
        page.insert("limit".into(), json!(window.limit));
        if let Some(total) = total {
            page.insert("total".into(), json!(total));
        }
        doc.meta.insert("page".into(), Value::Object(page));

        let links = [
            ("first", window.first()),
            ("prev", window.prev()),
            ("next", window.next(count, total)),
            ("last", window.last(total)),
        ];
        for (name, target) in links {
            if let Some(target) = target {
                doc.links
                    .insert(name.to_string(), Value::String(page_url(ctx, target)));
            }
        }
    }
}

/// The current request URL with its page window replaced.
pub fn page_url(ctx: &Context<'_>, window: PageWindow) -> String {
    let request = ctx.request();
    let mut query = request.query.clone();
    let page = query
        .entry("page")
        .or_insert_with(|| Value::Object(Map::new()));
    if !page.is_object() {
        *page = Value::Object(Map::new());
    }
    if let Value::Object(page) = page {
        page.insert("offset".into(), Value::String(window.offset.to_string()));
        page.insert("limit".into(), Value::String(window.limit.to_string()));
    }
    format!(
        "{}{}?{}",
        ctx.api().base_url(),
        request.path,
        encode_query(&query)
    )
}
