use std::sync::Arc;

use http::{Method, StatusCode};
use jsonapi_core::IncludeTree;
use tracing::debug;

use super::write::{apply, parse_body};
use super::{current, missing, render_one, Endpoint, Route};
use crate::capability::Model;
use crate::context::Context;
use crate::error::{ConfigError, Error};
use crate::include::resolve_include;
use crate::resource::Resource;
use crate::response::{self, Response};
use crate::schema::{check, Visibility};

/// `PATCH /{type}/{id}`
#[derive(Clone, Default)]
pub struct Update {
    visible: Option<Visibility>,
}

impl Update {
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
}

impl Endpoint for Update {
    fn name(&self) -> &'static str {
        "update"
    }

    fn check(&self, resource: &Resource) -> Result<(), ConfigError> {
        let caps = resource.caps();
        if caps.find.is_none() {
            return Err(missing(resource, self.name(), "find"));
        }
        if caps.update.is_none() {
            return Err(missing(resource, self.name(), "update"));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context<'_>) -> Result<Option<Response>, Error> {
        let Route::Resource(id) = ctx.route() else {
            return Ok(None);
        };
        if ctx.method() != Method::PATCH {
            return Err(Error::method_not_allowed(ctx.method()));
        }

        let resource = current(ctx)?;
        let caps = resource.caps();
        let (Some(find), Some(updater)) = (&caps.find, &caps.update) else {
            return Err(missing(resource, self.name(), "update").into());
        };

        let existing = find.find(&id, ctx)?.ok_or_else(|| {
            Error::not_found(format!("Resource [{}/{id}] not found", resource.kind()))
        })?;
        if !check(&self.visible, Some(&existing), ctx) {
            return Err(Error::forbidden(format!(
                "Cannot update [{}/{id}]",
                resource.kind()
            )));
        }

        let include = resolve_include(ctx, &[resource], &IncludeTree::new())?;
        let submitted = parse_body(ctx, resource, Some(&id))?;

        let mut model = existing.clone();
        let scoped = ctx.with_model(&existing);
        apply(&scoped, resource, &mut model, &submitted, Some(&existing))?;

        let model = updater.update(model, ctx)?;
        debug!(resource = resource.kind(), id = %id, "updated");

        let doc = render_one(ctx, resource, &model, &include)?;
        Ok(Some(response::document(StatusCode::OK, doc)))
    }
}
