use std::any::Any;
use std::sync::Arc;

use http::{Method, StatusCode};
use jsonapi_core::{Expr, SortList};
use serde_json::Value;
use tracing::debug;

use super::{current, default_include, missing, Endpoint, Route};
use crate::capability::Model;
use crate::context::Context;
use crate::document::Document;
use crate::error::{ConfigError, Error};
use crate::filter::apply_filters;
use crate::include::resolve_include;
use crate::pagination::OffsetPagination;
use crate::resource::Resource;
use crate::response::{self, Response};
use crate::schema::{check, Visibility};
use crate::serializer::Serializer;
use crate::sort::apply_sorts;

/// `GET /{type}`: list with sorting, filtering and optional pagination.
#[derive(Clone, Default)]
pub struct Index {
    visible: Option<Visibility>,
    default_include: Vec<String>,
    default_sort: Option<String>,
    pagination: Option<OffsetPagination>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Model>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(f));
        self
    }

    pub fn default_include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_include = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Sort applied when the request has no `sort` parameter, e.g. `-created`.
    pub fn default_sort(mut self, sort: impl Into<String>) -> Self {
        self.default_sort = Some(sort.into());
        self
    }

    pub fn paginate(mut self, pagination: OffsetPagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    fn sorts(&self, ctx: &Context<'_>) -> Result<SortList, Error> {
        match ctx.query_param("sort") {
            Some(Value::String(raw)) => Ok(SortList::parse(raw)?),
            Some(Value::Array(items)) => {
                let tokens = items
                    .iter()
                    .map(|v| v.as_str().ok_or_else(invalid_sort))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SortList::parse(&tokens.join(","))?)
            }
            Some(_) => Err(invalid_sort()),
            None => match &self.default_sort {
                Some(raw) => Ok(SortList::parse(raw)?),
                None => Ok(SortList::empty()),
            },
        }
    }
}

fn invalid_sort() -> Error {
    Error::bad_request("sort must be a string").with_parameter("sort")
}

impl Endpoint for Index {
    fn name(&self) -> &'static str {
        "index"
    }

    fn check(&self, resource: &Resource) -> Result<(), ConfigError> {
        let caps = resource.caps();
        if caps.list.is_none() {
            return Err(missing(resource, self.name(), "list"));
        }
        if self.pagination.is_some() && caps.paginate.is_none() {
            return Err(missing(resource, self.name(), "paginate"));
        }
        if let Some(raw) = &self.default_sort {
            let invalid = || ConfigError::InvalidDefaultSort {
                resource: resource.kind().to_string(),
                sort: raw.clone(),
            };
            let sorts = SortList::parse(raw).map_err(|_| invalid())?;
            if sorts.iter().any(|s| resource.get_sort(&s.name).is_none()) {
                return Err(invalid());
            }
        }
        default_include(resource, &self.default_include).map(|_| ())
    }

    fn handle(&self, ctx: &Context<'_>) -> Result<Option<Response>, Error> {
        if ctx.route() != Route::Collection {
            return Ok(None);
        }
        if ctx.method() != Method::GET {
            return Err(Error::method_not_allowed(ctx.method()));
        }

        let resource = current(ctx)?;
        let caps = resource.caps();
        let list = caps
            .list
            .as_ref()
            .ok_or_else(|| Error::from(missing(resource, self.name(), "list")))?;

        if !check(&self.visible, None, ctx) {
            return Err(Error::forbidden(format!(
                "Collection [{}] is not visible",
                resource.kind()
            )));
        }

        let include = resolve_include(ctx, &[resource], &default_include(resource, &self.default_include)?)?;

        let mut query = list.query(ctx)?;
        apply_sorts(&mut query, &self.sorts(ctx)?, resource, ctx)?;

        if let Some(raw) = ctx.query_param("filter") {
            let expr = Expr::parse(raw)?;
            apply_filters(&mut query, &expr, resource, list.as_ref(), ctx)
                .map_err(|e| e.prepend_parameter("filter"))?;
        }

        let total = match &caps.count {
            Some(count) => count.count(query.as_ref(), ctx)?,
            None => None,
        };

        let window = match (&self.pagination, &caps.paginate) {
            (Some(pagination), Some(paginator)) => {
                let window = pagination.window(ctx)?;
                paginator.paginate(&mut query, window, ctx)?;
                Some((pagination, window))
            }
            _ => None,
        };

        let query: Arc<dyn Any + Send + Sync> = Arc::from(query);
        let ctx = ctx.with_query(query.clone());
        let models = list.results(query.as_ref(), &ctx)?;
        debug!(
            resource = resource.kind(),
            count = models.len(),
            total = ?total,
            "index"
        );

        let mut serializer = Serializer::new(&ctx);
        for model in &models {
            serializer.add_primary(resource, model, &include)?;
        }
        let (data, included) = serializer.finish();
        let mut doc = Document::many(data);
        doc.included = included;

        if let Some((pagination, window)) = window {
            pagination.decorate(&mut doc, &ctx, window, models.len(), total);
        }
        Ok(Some(response::document(StatusCode::OK, doc)))
    }
}
