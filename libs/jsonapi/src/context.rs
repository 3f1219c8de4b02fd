use std::any::Any;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::api::JsonApi;
use crate::capability::{query_ref, Model};
use crate::endpoint::{Endpoint, Route};
use crate::error::Error;
use crate::request::JsonApiRequest;
use crate::resource::Resource;
use crate::schema::Field;

/// Per-request processing state. Each transition returns a new value, so
/// a step never observes another step's narrowing.
#[derive(Clone)]
pub struct Context<'a> {
    api: &'a JsonApi,
    request: &'a JsonApiRequest,
    resource: Option<&'a Resource>,
    endpoint: Option<&'a dyn Endpoint>,
    query: Option<Arc<dyn Any + Send + Sync>>,
    model: Option<&'a Model>,
    extensions: Vec<&'a str>,
}

impl<'a> Context<'a> {
    pub fn new(api: &'a JsonApi, request: &'a JsonApiRequest) -> Self {
        Self {
            api,
            request,
            resource: None,
            endpoint: None,
            query: None,
            model: None,
            extensions: Vec::new(),
        }
    }

    pub fn with_resource(&self, resource: &'a Resource) -> Self {
        Self {
            resource: Some(resource),
            ..self.clone()
        }
    }

    pub fn with_endpoint(&self, endpoint: &'a dyn Endpoint) -> Self {
        Self {
            endpoint: Some(endpoint),
            ..self.clone()
        }
    }

    /// Attach the frozen list query so result hooks can inspect it.
    pub fn with_query(&self, query: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            query: Some(query),
            ..self.clone()
        }
    }

    pub fn with_model<'b>(&self, model: &'b Model) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            api: self.api,
            request: self.request,
            resource: self.resource,
            endpoint: self.endpoint,
            query: self.query.clone(),
            model: Some(model),
            extensions: self.extensions.clone(),
        }
    }

    pub fn with_active_extensions(&self, extensions: Vec<&'a str>) -> Self {
        Self {
            extensions,
            ..self.clone()
        }
    }

    pub fn api(&self) -> &'a JsonApi {
        self.api
    }

    pub fn request(&self) -> &'a JsonApiRequest {
        self.request
    }

    pub fn resource(&self) -> Option<&'a Resource> {
        self.resource
    }

    pub fn endpoint(&self) -> Option<&'a dyn Endpoint> {
        self.endpoint
    }

    pub fn model(&self) -> Option<&'a Model> {
        self.model
    }

    pub fn active_extensions(&self) -> &[&'a str] {
        &self.extensions
    }

    pub fn has_extension(&self, uri: &str) -> bool {
        self.extensions.contains(&uri)
    }

    /// Typed view of the frozen list query, once attached.
    pub fn query<T: Any>(&self) -> Result<Option<&T>, Error> {
        match &self.query {
            Some(q) => query_ref::<T>(q.as_ref()).map(Some),
            None => Ok(None),
        }
    }

    pub fn method(&self) -> &'a Method {
        &self.request.method
    }

    /// Request path with the API base path removed, always starting with `/`.
    /// `None` when the request is outside the base path.
    pub fn path(&self) -> Option<&'a str> {
        let base = self.api.base_path();
        let rest = self.request.path.strip_prefix(base)?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else if base.ends_with('/') {
            self.request.path.get(base.len() - 1..)
        } else {
            None
        }
    }

    /// Path segments after the resource type.
    pub fn route(&self) -> Route {
        let segments: Vec<&str> = self
            .path()
            .unwrap_or("/")
            .split('/')
            .filter(|s| !s.is_empty())
            .skip(1)
            .collect();
        Route::from_segments(&segments)
    }

    pub fn query_param(&self, name: &str) -> Option<&'a Value> {
        self.request.query.get(name)
    }

    /// Sparse fieldset for `kind`, from `fields[kind]=a,b`.
    pub fn sparse_fields(&self, kind: &str) -> Option<Vec<&'a str>> {
        let value = self.query_param("fields")?.get(kind)?;
        let names = match value {
            Value::String(s) => s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .flat_map(|s| s.split(','))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        Some(names)
    }

    pub fn field_selected(&self, kind: &str, name: &str) -> bool {
        self.sparse_fields(kind)
            .map_or(true, |names| names.contains(&name))
    }

    /// Fields of `resource` visible for `model` and selected by the sparse
    /// fieldset.
    pub fn visible_fields<'r>(&self, resource: &'r Resource, model: Option<&Model>) -> Vec<&'r Field> {
        resource
            .all_fields()
            .iter()
            .filter(|f| f.is_visible(model, self) && self.field_selected(resource.kind(), f.name()))
            .collect()
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("resource", &self.resource.map(Resource::kind))
            .field("endpoint", &self.endpoint.map(|e| e.name()))
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}
