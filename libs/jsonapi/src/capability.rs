//! Persistence seams. A resource exposes whichever of these it supports;
//! endpoints declare which ones they need and the builder checks the pairing.

use std::any::Any;
use std::sync::Arc;

use jsonapi_core::PageWindow;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::error::Error;

/// A backing record. Models are plain JSON values, normally objects.
pub type Model = Value;

/// Opaque, backend-defined list query. Created by [`Listable::query`],
/// mutated by filters, sorts and pagination, then frozen before results are
/// fetched.
pub type Query = Box<dyn Any + Send + Sync>;

/// Typed view of a mutable query. A mismatch means a filter or sort was
/// declared for a different backend.
pub fn query_mut<T: Any>(query: &mut Query) -> Result<&mut T, Error> {
    query
        .as_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| Error::internal(format!("query is not a {}", std::any::type_name::<T>())))
}

pub fn query_ref<T: Any>(query: &(dyn Any + Send + Sync)) -> Result<&T, Error> {
    query
        .downcast_ref::<T>()
        .ok_or_else(|| Error::internal(format!("query is not a {}", std::any::type_name::<T>())))
}

/// Boolean group applied by [`Listable::combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterGroup {
    /// At least one part matches.
    Or,
    /// The conjunction of all parts does not match.
    Not,
}

pub trait Findable: Send + Sync {
    fn find(&self, id: &str, ctx: &Context<'_>) -> Result<Option<Model>, Error>;
}

pub trait Listable: Send + Sync {
    fn query(&self, ctx: &Context<'_>) -> Result<Query, Error>;

    fn results(&self, query: &(dyn Any + Send + Sync), ctx: &Context<'_>)
        -> Result<Vec<Model>, Error>;

    /// A fresh query to collect one branch of an `or`/`not` group.
    fn sub_query(&self, _parent: &Query, _ctx: &Context<'_>) -> Result<Query, Error> {
        Err(Error::bad_request("Boolean filter groups are not supported").with_parameter("filter"))
    }

    /// Merge branch queries into `query` under `group`.
    fn combine(
        &self,
        _query: &mut Query,
        _group: FilterGroup,
        _parts: Vec<Query>,
        _ctx: &Context<'_>,
    ) -> Result<(), Error> {
        Err(Error::bad_request("Boolean filter groups are not supported").with_parameter("filter"))
    }
}

pub trait Countable: Send + Sync {
    /// Total matching records before pagination, when known.
    fn count(&self, query: &(dyn Any + Send + Sync), ctx: &Context<'_>)
        -> Result<Option<u64>, Error>;
}

pub trait Paginatable: Send + Sync {
    fn paginate(&self, query: &mut Query, window: PageWindow, ctx: &Context<'_>)
        -> Result<(), Error>;
}

pub trait Creatable: Send + Sync {
    /// Blank model that field setters write into.
    fn new_model(&self, _ctx: &Context<'_>) -> Result<Model, Error> {
        Ok(Value::Object(Map::new()))
    }

    /// Persist and return the stored model (with its id assigned).
    fn create(&self, model: Model, ctx: &Context<'_>) -> Result<Model, Error>;
}

pub trait Updatable: Send + Sync {
    fn update(&self, model: Model, ctx: &Context<'_>) -> Result<Model, Error>;
}

pub trait Deletable: Send + Sync {
    fn delete(&self, model: &Model, ctx: &Context<'_>) -> Result<(), Error>;
}

/// Optional operation implementations attached to a resource.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub find: Option<Arc<dyn Findable>>,
    pub list: Option<Arc<dyn Listable>>,
    pub count: Option<Arc<dyn Countable>>,
    pub paginate: Option<Arc<dyn Paginatable>>,
    pub create: Option<Arc<dyn Creatable>>,
    pub update: Option<Arc<dyn Updatable>>,
    pub delete: Option<Arc<dyn Deletable>>,
}

impl Capabilities {
    /// Every capability backed by the same store.
    pub fn all<S>(store: Arc<S>) -> Self
    where
        S: Findable
            + Listable
            + Countable
            + Paginatable
            + Creatable
            + Updatable
            + Deletable
            + 'static,
    {
        Self {
            find: Some(store.clone()),
            list: Some(store.clone()),
            count: Some(store.clone()),
            paginate: Some(store.clone()),
            create: Some(store.clone()),
            update: Some(store.clone()),
            delete: Some(store),
        }
    }

    /// Only lookup and listing.
    pub fn read_only<S>(store: Arc<S>) -> Self
    where
        S: Findable + Listable + Countable + Paginatable + 'static,
    {
        Self {
            find: Some(store.clone()),
            list: Some(store.clone()),
            count: Some(store.clone()),
            paginate: Some(store),
            ..Self::default()
        }
    }

    pub fn with_find(mut self, find: Arc<dyn Findable>) -> Self {
        self.find = Some(find);
        self
    }

    pub fn with_list(mut self, list: Arc<dyn Listable>) -> Self {
        self.list = Some(list);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.find.is_some() {
            out.push("find");
        }
        if self.list.is_some() {
            out.push("list");
        }
        if self.count.is_some() {
            out.push("count");
        }
        if self.paginate.is_some() {
            out.push("paginate");
        }
        if self.create.is_some() {
            out.push("create");
        }
        if self.update.is_some() {
            out.push("update");
        }
        if self.delete.is_some() {
            out.push("delete");
        }
        out
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
