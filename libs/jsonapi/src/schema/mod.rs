//! Declarative resource schema: fields, id descriptor and meta fields.

use std::sync::Arc;

use serde_json::Value;

use crate::capability::Model;
use crate::context::Context;
use crate::error::Error;

mod field;
mod id;
mod meta;

pub use field::{Cardinality, Field, FieldKind, Relationship};
pub use id::Id;
pub use meta::MetaField;

/// Per-model authorization predicate. The model is `None` when no instance
/// is in play (include validation, create).
pub type Visibility = Arc<dyn Fn(Option<&Model>, &Context<'_>) -> bool + Send + Sync>;

/// Request-level predicate used by filters and sorts.
pub type Predicate = Arc<dyn Fn(&Context<'_>) -> bool + Send + Sync>;

pub type Getter = Arc<dyn Fn(&Model, &Context<'_>) -> Result<Value, Error> + Send + Sync>;

pub type Setter = Arc<dyn Fn(&mut Model, Value, &Context<'_>) -> Result<(), Error> + Send + Sync>;

/// Value mapping used for both serializers and deserializers.
pub type Transform = Arc<dyn Fn(Value, &Context<'_>) -> Result<Value, Error> + Send + Sync>;

/// Returns a human-readable message on failure.
pub type Validator = Arc<dyn Fn(&Value, &Context<'_>) -> Result<(), String> + Send + Sync>;

pub(crate) fn check(visibility: &Option<Visibility>, model: Option<&Model>, ctx: &Context<'_>) -> bool {
    visibility.as_ref().map_or(true, |f| f(model, ctx))
}
