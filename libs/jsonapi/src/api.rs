use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use runtime::ApiConfig;
use tracing::{debug, error, warn};

use crate::capability::Model;
use crate::context::Context;
use crate::document::Document;
use crate::error::{ConfigError, Error};
use crate::extension::Extension;
use crate::negotiation::{negotiate, validate_query_params};
use crate::request::JsonApiRequest;
use crate::resource::Resource;
use crate::response::{self, finalize, Response};
use crate::schema::Relationship;

/// The frozen API registry and request dispatcher.
///
/// Built once with [`JsonApi::builder`], then shared (usually behind an
/// `Arc`) by every request.
pub struct JsonApi {
    base_path: String,
    base_url: String,
    resources: IndexMap<String, Resource>,
    extensions: Vec<Arc<dyn Extension>>,
    default_page_limit: u64,
    max_page_limit: u64,
    max_include_depth: usize,
}

impl std::fmt::Debug for JsonApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonApi")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.uri()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl JsonApi {
    pub fn builder() -> JsonApiBuilder {
        JsonApiBuilder::default()
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_page_limit(&self) -> u64 {
        self.default_page_limit
    }

    pub fn max_page_limit(&self) -> u64 {
        self.max_page_limit
    }

    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }

    pub fn resource(&self, kind: &str) -> Option<&Resource> {
        self.resources.get(kind)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// Targets of a relationship; all resources when it is unconstrained.
    pub fn related_resources(&self, rel: &Relationship) -> Vec<&Resource> {
        if rel.types.is_empty() {
            self.resources.values().collect()
        } else {
            rel.types.iter().filter_map(|t| self.resource(t)).collect()
        }
    }

    /// First target resource that claims `model`.
    pub fn resource_for_model(&self, rel: &Relationship, model: &Model) -> Option<&Resource> {
        self.related_resources(rel)
            .into_iter()
            .find(|r| r.accepts(model))
    }

    pub fn resource_url(&self, kind: &str, id: &str) -> String {
        format!("{}{}/{}/{}", self.base_url, self.base_path, kind, id)
    }

    /// Process a request. Errors are returned as-is; see [`JsonApi::serve`].
    pub fn handle(&self, request: &JsonApiRequest) -> Result<Response, Error> {
        let span = tracing::debug_span!("jsonapi", method = %request.method, path = %request.path);
        let _guard = span.enter();
        debug!("handling request");

        validate_query_params(request)?;

        let registered: Vec<&str> = self.extensions.iter().map(|e| e.uri()).collect();
        let active = negotiate(&registered, request)?;
        let ctx = Context::new(self, request).with_active_extensions(active.clone());

        for extension in &self.extensions {
            if ctx.has_extension(extension.uri()) {
                if let Some(response) = extension.handle(&ctx)? {
                    debug!(extension = extension.uri(), "answered by extension");
                    return Ok(finalize(response, &active));
                }
            }
        }

        let response = self.route(&ctx)?;
        Ok(finalize(response, &active))
    }

    fn route(&self, ctx: &Context<'_>) -> Result<Response, Error> {
        let path = ctx
            .path()
            .ok_or_else(|| Error::not_found("Route not found"))?;
        let kind = path
            .split('/')
            .find(|s| !s.is_empty())
            .ok_or_else(|| Error::not_found("Route not found"))?;
        let resource = ctx
            .api()
            .resource(kind)
            .ok_or_else(|| Error::not_found(format!("Resource type [{kind}] not found")))?;

        let ctx = ctx.with_resource(resource);
        let mut last = None;
        for endpoint in resource.endpoints() {
            let ctx = ctx.with_endpoint(endpoint.as_ref());
            match endpoint.handle(&ctx) {
                Ok(Some(response)) => {
                    debug!(resource = kind, endpoint = endpoint.name(), status = %response.status(), "handled");
                    return Ok(response);
                }
                Ok(None) => {}
                Err(e @ Error::MethodNotAllowed { .. }) => last = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| Error::not_found("Route not found")))
    }

    /// Process a request, turning any error into an error document.
    pub fn serve(&self, request: &JsonApiRequest) -> Response {
        match self.handle(request) {
            Ok(response) => response,
            Err(e) => self.error_response(&e),
        }
    }

    /// The error document for `error`, with the same headers `serve` puts
    /// on every response.
    pub fn error_response(&self, error: &Error) -> Response {
        let status = error.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?error, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %error, "request rejected");
        }
        finalize(
            response::document(status, Document::errors(error.to_error_objects())),
            &[],
        )
    }
}

/// Collects resources and extensions and validates them on [`build`].
///
/// [`build`]: JsonApiBuilder::build
pub struct JsonApiBuilder {
    base_path: String,
    base_url: String,
    resources: Vec<Resource>,
    extensions: Vec<Arc<dyn Extension>>,
    default_page_limit: u64,
    max_page_limit: u64,
    max_include_depth: usize,
}

impl Default for JsonApiBuilder {
    fn default() -> Self {
        let defaults = ApiConfig::default();
        Self {
            base_path: defaults.base_path,
            base_url: defaults.base_url,
            resources: Vec::new(),
            extensions: Vec::new(),
            default_page_limit: defaults.default_page_limit,
            max_page_limit: defaults.max_page_limit,
            max_include_depth: defaults.max_include_depth,
        }
    }
}

impl JsonApiBuilder {
    pub fn config(mut self, config: &ApiConfig) -> Self {
        self.base_path = config.base_path.clone();
        self.base_url = config.base_url.clone();
        self.default_page_limit = config.default_page_limit;
        self.max_page_limit = config.max_page_limit;
        self.max_include_depth = config.max_include_depth;
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn page_limits(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.default_page_limit = default_limit;
        self.max_page_limit = max_limit;
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn build(self) -> Result<JsonApi, ConfigError> {
        let mut resources = IndexMap::new();
        for resource in self.resources {
            let kind = resource.kind().to_string();
            if resources.contains_key(&kind) {
                return Err(ConfigError::DuplicateResource(kind));
            }
            resources.insert(kind, resource);
        }

        for resource in resources.values() {
            let mut names = HashSet::new();
            for field in resource.all_fields() {
                if !names.insert(field.name()) {
                    return Err(ConfigError::DuplicateField {
                        resource: resource.kind().to_string(),
                        field: field.name().to_string(),
                    });
                }
                if let Some(rel) = field.as_relationship() {
                    if let Some(target) = rel.types.iter().find(|t| !resources.contains_key(*t)) {
                        return Err(ConfigError::UnknownRelatedType {
                            resource: resource.kind().to_string(),
                            field: field.name().to_string(),
                            target: target.clone(),
                        });
                    }
                }
            }
            for endpoint in resource.endpoints() {
                endpoint.check(resource)?;
            }
        }

        let mut uris = HashSet::new();
        for extension in &self.extensions {
            if !uris.insert(extension.uri().to_string()) {
                return Err(ConfigError::DuplicateExtension(extension.uri().to_string()));
            }
        }

        let base_path = normalize_base_path(&self.base_path);
        let base_url = self.base_url.trim_end_matches('/').to_string();
        debug!(
            base_path = %base_path,
            resources = resources.len(),
            extensions = self.extensions.len(),
            "json:api registry built"
        );

        Ok(JsonApi {
            base_path,
            base_url,
            resources,
            extensions: self.extensions,
            default_page_limit: self.default_page_limit.max(1),
            max_page_limit: self.max_page_limit.max(1),
            max_include_depth: self.max_include_depth,
        })
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
