//! Endpoints bound to a resource. Each one matches a `(method, route)`
//! shape: the right shape with the wrong method is `MethodNotAllowed`, any
//! other shape is left to the next endpoint.

use jsonapi_core::IncludeTree;

use crate::capability::Model;
use crate::context::Context;
use crate::document::Document;
use crate::error::{ConfigError, Error};
use crate::resource::Resource;
use crate::response::Response;
use crate::serializer::Serializer;

mod create;
mod delete;
mod index;
mod show;
mod update;
mod write;

pub use create::Create;
pub use delete::Delete;
pub use index::Index;
pub use show::Show;
pub use update::Update;

pub trait Endpoint: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build-time check that the resource provides what this endpoint needs.
    fn check(&self, resource: &Resource) -> Result<(), ConfigError>;

    /// `Ok(None)` when the request is not for this endpoint.
    fn handle(&self, ctx: &Context<'_>) -> Result<Option<Response>, Error>;
}

/// Shape of the path after `/{type}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/{type}`
    Collection,
    /// `/{type}/{id}`
    Resource(String),
    /// `/{type}/{id}/...`
    Nested { id: String, rest: Vec<String> },
}

impl Route {
    pub fn from_segments(segments: &[&str]) -> Self {
        match segments {
            [] => Route::Collection,
            [id] => Route::Resource(id.to_string()),
            [id, rest @ ..] => Route::Nested {
                id: id.to_string(),
                rest: rest.iter().map(|s| s.to_string()).collect(),
            },
        }
    }
}

pub(crate) fn missing(
    resource: &Resource,
    endpoint: &'static str,
    capability: &'static str,
) -> ConfigError {
    ConfigError::MissingCapability {
        resource: resource.kind().to_string(),
        endpoint,
        capability,
    }
}

/// The resource an endpoint is running for.
pub(crate) fn current<'a>(ctx: &Context<'a>) -> Result<&'a Resource, Error> {
    ctx.resource()
        .ok_or_else(|| Error::internal("endpoint invoked without a resource"))
}

/// Document with a single primary resource and its includes.
pub(crate) fn render_one<'a>(
    ctx: &Context<'a>,
    resource: &'a Resource,
    model: &Model,
    include: &IncludeTree,
) -> Result<Document, Error> {
    let mut serializer = Serializer::new(ctx);
    serializer.add_primary(resource, model, include)?;
    let (data, included) = serializer.finish();
    let primary = data
        .into_iter()
        .next()
        .ok_or_else(|| Error::internal("serializer produced no primary data"))?;
    let mut doc = Document::one(primary);
    doc.included = included;
    Ok(doc)
}

/// Parse endpoint-level default include paths.
pub(crate) fn default_include(resource: &Resource, paths: &[String]) -> Result<IncludeTree, ConfigError> {
    let mut tree = IncludeTree::new();
    for path in paths {
        tree.insert_path(path)
            .map_err(|_| ConfigError::InvalidDefaultInclude {
                resource: resource.kind().to_string(),
                include: path.clone(),
            })?;
    }
    Ok(tree)
}
