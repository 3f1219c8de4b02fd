use std::sync::Arc;

use http::Method;
use tracing::debug;

use super::{current, missing, Endpoint, Route};
use crate::capability::Model;
use crate::context::Context;
use crate::error::{ConfigError, Error};
use crate::resource::Resource;
use crate::response::{self, Response};
use crate::schema::{check, Visibility};

/// `DELETE /{type}/{id}`
#[derive(Clone, Default)]
pub struct Delete {
    visible: Option<Visibility>,
}

impl Delete {
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

impl Endpoint for Delete {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn check(&self, resource: &Resource) -> Result<(), ConfigError> {
        let caps = resource.caps();
        if caps.find.is_none() {
            return Err(missing(resource, self.name(), "find"));
        }
        if caps.delete.is_none() {
            return Err(missing(resource, self.name(), "delete"));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context<'_>) -> Result<Option<Response>, Error> {
        let Route::Resource(id) = ctx.route() else {
            return Ok(None);
        };
        if ctx.method() != Method::DELETE {
            return Err(Error::method_not_allowed(ctx.method()));
        }

        let resource = current(ctx)?;
        let caps = resource.caps();
        let (Some(find), Some(deleter)) = (&caps.find, &caps.delete) else {
            return Err(missing(resource, self.name(), "delete").into());
        };

        let model = find.find(&id, ctx)?.ok_or_else(|| {
            Error::not_found(format!("Resource [{}/{id}] not found", resource.kind()))
        })?;
        if !check(&self.visible, Some(&model), ctx) {
            return Err(Error::forbidden(format!(
                "Cannot delete [{}/{id}]",
                resource.kind()
            )));
        }

        deleter.delete(&model, &ctx.with_model(&model))?;
        debug!(resource = resource.kind(), id = %id, "deleted");
        Ok(Some(response::no_content()))
    }
}
