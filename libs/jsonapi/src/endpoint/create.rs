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
use crate::response::{self, with_location, Response};
use crate::schema::{check, Visibility};

/// `POST /{type}`
#[derive(Clone, Default)]
pub struct Create {
    visible: Option<Visibility>,
}

impl Create {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checked without a model.
    pub fn visible<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Model>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(f));
        self
    }
}

impl Endpoint for Create {
    fn name(&self) -> &'static str {
        "create"
    }

    fn check(&self, resource: &Resource) -> Result<(), ConfigError> {
        match resource.caps().create {
            Some(_) => Ok(()),
            None => Err(missing(resource, self.name(), "create")),
        }
    }

    fn handle(&self, ctx: &Context<'_>) -> Result<Option<Response>, Error> {
        if ctx.route() != Route::Collection {
            return Ok(None);
        }
        if ctx.method() != Method::POST {
            return Err(Error::method_not_allowed(ctx.method()));
        }

        let resource = current(ctx)?;
        let creator = resource
            .caps()
            .create
            .as_ref()
            .ok_or_else(|| Error::from(missing(resource, self.name(), "create")))?;

        if !check(&self.visible, None, ctx) {
            return Err(Error::forbidden(format!(
                "Cannot create [{}] resources",
                resource.kind()
            )));
        }

        let include = resolve_include(ctx, &[resource], &IncludeTree::new())?;
        let submitted = parse_body(ctx, resource, None)?;

        let mut model = creator.new_model(ctx)?;
        if let Some(id) = &submitted.id {
            resource.id_descriptor().write(&mut model, id.clone())?;
        }
        apply(ctx, resource, &mut model, &submitted, None)?;

        let model = creator.create(model, ctx)?;
        let id = resource.get_id(&model, &ctx.with_model(&model))?;
        debug!(resource = resource.kind(), id = %id, "created");

        let doc = render_one(ctx, resource, &model, &include)?;
        let location = ctx.api().resource_url(resource.kind(), &id);
        Ok(Some(with_location(
            response::document(StatusCode::CREATED, doc),
            &location,
        )))
    }
}
