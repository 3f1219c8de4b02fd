use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::debug;

use super::{current, default_include, missing, render_one, Endpoint, Route};
use crate::capability::Model;
use crate::context::Context;
use crate::error::{ConfigError, Error};
use crate::include::resolve_include;
use crate::resource::Resource;
use crate::response::{self, Response};
use crate::schema::{check, Visibility};

/// `GET /{type}/{id}`
#[derive(Clone, Default)]
pub struct Show {
    visible: Option<Visibility>,
    default_include: Vec<String>,
}

impl Show {
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

    /// Include paths used when the request has no `include` parameter.
    pub fn default_include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_include = paths.into_iter().map(Into::into).collect();
        self
    }
}

impl Endpoint for Show {
    fn name(&self) -> &'static str {
        "show"
    }

    fn check(&self, resource: &Resource) -> Result<(), ConfigError> {
        if resource.caps().find.is_none() {
            return Err(missing(resource, self.name(), "find"));
        }
        default_include(resource, &self.default_include).map(|_| ())
    }

    fn handle(&self, ctx: &Context<'_>) -> Result<Option<Response>, Error> {
        let Route::Resource(id) = ctx.route() else {
            return Ok(None);
        };
        if ctx.method() != Method::GET {
            return Err(Error::method_not_allowed(ctx.method()));
        }

        let resource = current(ctx)?;
        let find = resource
            .caps()
            .find
            .as_ref()
            .ok_or_else(|| Error::from(missing(resource, self.name(), "find")))?;

        let model = find.find(&id, ctx)?.ok_or_else(|| {
            Error::not_found(format!("Resource [{}/{id}] not found", resource.kind()))
        })?;
        if !check(&self.visible, Some(&model), ctx) {
            return Err(Error::forbidden(format!(
                "Resource [{}/{id}] is not visible",
                resource.kind()
            )));
        }

        let include = resolve_include(ctx, &[resource], &default_include(resource, &self.default_include)?)?;
        debug!(resource = resource.kind(), id = %id, "show");
        let doc = render_one(ctx, resource, &model, &include)?;
        Ok(Some(response::document(StatusCode::OK, doc)))
    }
}
