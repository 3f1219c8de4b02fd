use std::sync::Arc;

use serde_json::Value;

use super::{check, Getter, Setter, Transform, Validator, Visibility};
use crate::capability::Model;
use crate::context::Context;
use crate::error::Error;
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub cardinality: Cardinality,
    /// Allowed target resource types. Empty means any registered resource.
    pub types: Vec<String>,
    pub includable: bool,
    /// Emit to-many linkage even when the relationship is not included.
    pub linkage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Attribute,
    Relationship(Relationship),
}

/// An attribute or relationship of a resource, with its hooks.
///
/// ```ignore
/// Field::attribute("title").writable().required()
/// Field::to_one("author").types(["users"]).includable()
/// ```
#[derive(Clone)]
pub struct Field {
    name: String,
    property: Option<String>,
    kind: FieldKind,
    visible: Option<Visibility>,
    writable: Option<Visibility>,
    nullable: bool,
    required: bool,
    getter: Option<Getter>,
    setter: Option<Setter>,
    serializer: Option<Transform>,
    deserializer: Option<Transform>,
    validators: Vec<Validator>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("property", &self.property)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

fn never(_: Option<&Model>, _: &Context<'_>) -> bool {
    false
}

impl Field {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            property: None,
            kind,
            visible: None,
            writable: Some(Arc::new(never)),
            nullable: false,
            required: false,
            getter: None,
            setter: None,
            serializer: None,
            deserializer: None,
            validators: Vec::new(),
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Attribute)
    }

    pub fn to_one(name: impl Into<String>) -> Self {
        Self::relationship(name, Cardinality::ToOne)
    }

    pub fn to_many(name: impl Into<String>) -> Self {
        Self::relationship(name, Cardinality::ToMany)
    }

    fn relationship(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self::new(
            name,
            FieldKind::Relationship(Relationship {
                cardinality,
                types: Vec::new(),
                includable: false,
                linkage: false,
            }),
        )
    }

    /// Model property to read and write; defaults to the field name.
    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(&Model, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(f));
        self
    }

    pub fn set<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Model, Value, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(f));
        self
    }

    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(f));
        self
    }

    pub fn deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.deserializer = Some(Arc::new(f));
        self
    }

    pub fn visible<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Model>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(f));
        self
    }

    pub fn hidden(self) -> Self {
        self.visible(never)
    }

    pub fn writable(mut self) -> Self {
        self.writable = None;
        self
    }

    pub fn writable_if<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Model>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.writable = Some(Arc::new(f));
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Must be present when creating.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Context<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(f));
        self
    }

    /// Restrict relationship targets. No effect on attributes.
    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::Relationship(rel) = &mut self.kind {
            rel.types = types.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn includable(mut self) -> Self {
        if let FieldKind::Relationship(rel) = &mut self.kind {
            rel.includable = true;
        }
        self
    }

    pub fn with_linkage(mut self) -> Self {
        if let FieldKind::Relationship(rel) = &mut self.kind {
            rel.linkage = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_name(&self) -> &str {
        self.property.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.kind, FieldKind::Attribute)
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match &self.kind {
            FieldKind::Relationship(rel) => Some(rel),
            FieldKind::Attribute => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_visible(&self, model: Option<&Model>, ctx: &Context<'_>) -> bool {
        check(&self.visible, model, ctx)
    }

    pub fn is_writable(&self, model: Option<&Model>, ctx: &Context<'_>) -> bool {
        check(&self.writable, model, ctx)
    }

    /// Raw value: the getter if present, else the resource's accessor.
    pub fn get_value(
        &self,
        resource: &Resource,
        model: &Model,
        ctx: &Context<'_>,
    ) -> Result<Value, Error> {
        match &self.getter {
            Some(getter) => getter(model, ctx),
            None => Ok(resource.get_value(model, self.property_name())),
        }
    }

    /// Value as emitted in a document: the raw value passed through the
    /// serializer.
    pub fn serialize_value(
        &self,
        resource: &Resource,
        model: &Model,
        ctx: &Context<'_>,
    ) -> Result<Value, Error> {
        let value = self.get_value(resource, model, ctx)?;
        match &self.serializer {
            Some(serializer) => serializer(value, ctx),
            None => Ok(value),
        }
    }

    pub fn deserialize_value(&self, value: Value, ctx: &Context<'_>) -> Result<Value, Error> {
        match &self.deserializer {
            Some(deserializer) => deserializer(value, ctx),
            None => Ok(value),
        }
    }

    /// Every validator failure message, in declaration order.
    pub fn validation_errors(&self, value: &Value, ctx: &Context<'_>) -> Vec<String> {
        self.validators
            .iter()
            .filter_map(|v| v(value, ctx).err())
            .collect()
    }

    /// Write into the model: the setter if present, else `model[property]`.
    pub fn set_value(&self, model: &mut Model, value: Value, ctx: &Context<'_>) -> Result<(), Error> {
        if let Some(setter) = &self.setter {
            return setter(model, value, ctx);
        }
        match model {
            Value::Object(map) => {
                map.insert(self.property_name().to_string(), value);
                Ok(())
            }
            _ => Err(Error::internal(format!(
                "cannot set '{}' on a non-object model",
                self.name
            ))),
        }
    }
}
