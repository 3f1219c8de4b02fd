use std::sync::Arc;

use serde_json::Value;

use crate::capability::{Capabilities, Model};
use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::filter::Filter;
use crate::schema::{Field, Id, MetaField};
use crate::sort::Sort;

pub type Claims = Arc<dyn Fn(&Model) -> bool + Send + Sync>;

/// A resource type: its schema, endpoints, filters, sorts and backing
/// capabilities.
#[derive(Clone)]
pub struct Resource {
    kind: String,
    id: Id,
    fields: Vec<Field>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    filters: Vec<Filter>,
    sorts: Vec<Sort>,
    meta: Vec<MetaField>,
    claims: Option<Claims>,
    capabilities: Capabilities,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("type", &self.kind)
            .field("fields", &self.fields.iter().map(Field::name).collect::<Vec<_>>())
            .field(
                "endpoints",
                &self.endpoints.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Id::default(),
            fields: Vec::new(),
            endpoints: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
            meta: Vec::new(),
            claims: None,
            capabilities: Capabilities::default(),
        }
    }

    pub fn id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn endpoint<E: Endpoint + 'static>(mut self, endpoint: E) -> Self {
        self.endpoints.push(Arc::new(endpoint));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn meta(mut self, meta: MetaField) -> Self {
        self.meta.push(meta);
        self
    }

    /// Decide whether a related model belongs to this type when a
    /// relationship targets several types.
    pub fn claims<F>(mut self, f: F) -> Self
    where
        F: Fn(&Model) -> bool + Send + Sync + 'static,
    {
        self.claims = Some(Arc::new(f));
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id_descriptor(&self) -> &Id {
        &self.id
    }

    pub fn all_fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn endpoints(&self) -> &[Arc<dyn Endpoint>] {
        &self.endpoints
    }

    pub fn get_filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name() == name)
    }

    pub fn get_sort(&self, name: &str) -> Option<&Sort> {
        self.sorts.iter().find(|s| s.name() == name)
    }

    pub fn meta_fields(&self) -> &[MetaField] {
        &self.meta
    }

    pub fn caps(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn accepts(&self, model: &Model) -> bool {
        self.claims.as_ref().map_or(true, |f| f(model))
    }

    pub fn get_id(&self, model: &Model, ctx: &Context<'_>) -> Result<String, Error> {
        self.id.read(model, ctx)
    }

    /// Default value accessor.
    pub fn get_value(&self, model: &Model, property: &str) -> Value {
        model.get(property).cloned().unwrap_or(Value::Null)
    }
}
