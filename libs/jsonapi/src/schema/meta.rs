use std::sync::Arc;

use serde_json::Value;

use super::{check, Getter, Visibility};
use crate::capability::Model;
use crate::context::Context;
use crate::error::Error;

/// A computed entry of a resource object's `meta`.
#[derive(Clone)]
pub struct MetaField {
    name: String,
    getter: Getter,
    visible: Option<Visibility>,
}

impl MetaField {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Model, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(f),
            visible: None,
        }
    }

    pub fn visible<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Model>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self, model: &Model, ctx: &Context<'_>) -> bool {
        check(&self.visible, Some(model), ctx)
    }

    pub fn value(&self, model: &Model, ctx: &Context<'_>) -> Result<Value, Error> {
        (self.getter)(model, ctx)
    }
}
