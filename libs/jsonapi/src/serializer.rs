//! Builds the flat `data` + `included` set of a compound document.

use std::collections::{HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use jsonapi_core::IncludeTree;
use serde_json::Value;

use crate::capability::Model;
use crate::context::Context;
use crate::document::{Linkage, RelationshipObject, ResourceIdentifier, ResourceObject};
use crate::error::Error;
use crate::resource::Resource;
use crate::schema::{Cardinality, Field};

type Key = (String, String);

/// A relationship of one resource object walked for one include subtree.
type Expansion = (Key, String, Vec<String>);

/// Deduplicates resource objects by `(type, id)`. A resource reached again
/// through another path is not rebuilt, but its relationships are still
/// walked for the new include subtree.
///
/// Included resources are walked breadth first: a related model is built
/// when discovered and its own relationships are queued behind its siblings.
pub struct Serializer<'c, 'a> {
    ctx: &'c Context<'a>,
    objects: IndexMap<Key, ResourceObject>,
    primary: IndexSet<Key>,
    expanded: HashSet<Expansion>,
    pending: VecDeque<(&'a Resource, Model, IncludeTree)>,
}

impl<'c, 'a> Serializer<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>) -> Self {
        Self {
            ctx,
            objects: IndexMap::new(),
            primary: IndexSet::new(),
            expanded: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn add_primary(
        &mut self,
        resource: &'a Resource,
        model: &Model,
        include: &IncludeTree,
    ) -> Result<ResourceIdentifier, Error> {
        let key = self.insert(resource, model)?;
        self.primary.insert(key.clone());
        self.walk(resource, model, &key, include)?;

        while let Some((resource, model, include)) = self.pending.pop_front() {
            let key = self.key(resource, &model)?;
            self.walk(resource, &model, &key, &include)?;
        }

        Ok(ResourceIdentifier::new(key.0, key.1))
    }

    /// Builds the object now and queues its relationships for `include`.
    pub fn add_included(
        &mut self,
        resource: &'a Resource,
        model: &Model,
        include: &IncludeTree,
    ) -> Result<ResourceIdentifier, Error> {
        let key = self.insert(resource, model)?;
        self.pending
            .push_back((resource, model.clone(), include.clone()));
        Ok(ResourceIdentifier::new(key.0, key.1))
    }

    fn key(&self, resource: &Resource, model: &Model) -> Result<Key, Error> {
        let ctx = self.ctx.with_resource(resource);
        let ctx = ctx.with_model(model);
        let id = resource.get_id(model, &ctx)?;
        Ok((resource.kind().to_string(), id))
    }

    fn insert(&mut self, resource: &'a Resource, model: &Model) -> Result<Key, Error> {
        let key = self.key(resource, model)?;
        if !self.objects.contains_key(&key) {
            let ctx = self.ctx.with_resource(resource);
            let ctx = ctx.with_model(model);
            let object = self.build(resource, model, &key, &ctx)?;
            self.objects.insert(key.clone(), object);
        }
        Ok(key)
    }

    fn walk(
        &mut self,
        resource: &'a Resource,
        model: &Model,
        key: &Key,
        include: &IncludeTree,
    ) -> Result<(), Error> {
        let ctx = self.ctx.with_resource(resource);
        let ctx = ctx.with_model(model);
        self.relationships(resource, model, key, include, &ctx)
    }

    fn build(
        &self,
        resource: &Resource,
        model: &Model,
        key: &Key,
        ctx: &Context<'_>,
    ) -> Result<ResourceObject, Error> {
        let mut object = ResourceObject::new(key.0.clone(), key.1.clone());

        for field in ctx.visible_fields(resource, Some(model)) {
            if field.is_attribute() {
                let value = field.serialize_value(resource, model, ctx)?;
                object.attributes.insert(field.name().to_string(), value);
            }
        }

        for meta in resource.meta_fields() {
            if meta.is_visible(model, ctx) {
                object
                    .meta
                    .insert(meta.name().to_string(), meta.value(model, ctx)?);
            }
        }

        object.links.insert(
            "self".to_string(),
            Value::String(self.ctx.api().resource_url(&key.0, &key.1)),
        );
        Ok(object)
    }

    fn relationships(
        &mut self,
        resource: &'a Resource,
        model: &Model,
        key: &Key,
        include: &IncludeTree,
        ctx: &Context<'_>,
    ) -> Result<(), Error> {
        for field in resource.all_fields() {
            let Some(rel) = field.as_relationship() else {
                continue;
            };
            if !field.is_visible(Some(model), ctx) {
                continue;
            }

            let selected = ctx.field_selected(resource.kind(), field.name());
            let subtree = include.get(field.name());
            let wants_linkage = selected
                && (rel.cardinality == Cardinality::ToOne || rel.linkage || subtree.is_some());
            let has_linkage = self
                .objects
                .get(key)
                .and_then(|o| o.relationships.get(field.name()))
                .is_some_and(|r| r.data.is_some());
            let expand = match subtree {
                Some(tree) => self.expanded.insert((
                    key.clone(),
                    field.name().to_string(),
                    tree.paths(),
                )),
                None => false,
            };

            if !expand && (!wants_linkage || has_linkage) {
                continue;
            }

            let related = self.related(resource, field, model, ctx)?;
            let mut identifiers = Vec::with_capacity(related.len());
            for (target, related_model) in related.iter().map(|(t, m)| (*t, m)) {
                let identifier = match subtree {
                    Some(tree) if expand => self.add_included(target, related_model, tree)?,
                    _ => {
                        let scoped = self.ctx.with_resource(target);
                        let scoped = scoped.with_model(related_model);
                        ResourceIdentifier::new(target.kind(), target.get_id(related_model, &scoped)?)
                    }
                };
                identifiers.push(identifier);
            }

            if wants_linkage && !has_linkage {
                let linkage = match rel.cardinality {
                    Cardinality::ToOne => Linkage::One(identifiers.into_iter().next()),
                    Cardinality::ToMany => Linkage::Many(identifiers),
                };
                if let Some(object) = self.objects.get_mut(key) {
                    object.relationships.insert(
                        field.name().to_string(),
                        RelationshipObject {
                            data: Some(linkage),
                            ..RelationshipObject::default()
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Related models with the resource that claims each of them.
    fn related(
        &self,
        resource: &Resource,
        field: &Field,
        model: &Model,
        ctx: &Context<'_>,
    ) -> Result<Vec<(&'a Resource, Model)>, Error> {
        let Some(rel) = field.as_relationship() else {
            return Ok(Vec::new());
        };
        let models = match (field.get_value(resource, model, ctx)?, rel.cardinality) {
            (Value::Null, _) => Vec::new(),
            (Value::Object(map), Cardinality::ToOne) => vec![Value::Object(map)],
            (Value::Array(items), Cardinality::ToMany) => items,
            (other, _) => {
                return Err(Error::internal(format!(
                    "relationship '{}.{}' resolved to an unexpected value: {other}",
                    resource.kind(),
                    field.name()
                )))
            }
        };

        let api = self.ctx.api();
        models
            .into_iter()
            .map(|related| {
                let target = api.resource_for_model(rel, &related).ok_or_else(|| {
                    Error::internal(format!(
                        "no resource claims a model related through '{}.{}'",
                        resource.kind(),
                        field.name()
                    ))
                })?;
                Ok((target, related))
            })
            .collect()
    }

    /// `data` in primary order and `included` in discovery order.
    pub fn finish(self) -> (Vec<ResourceObject>, Vec<ResourceObject>) {
        let Self {
            mut objects,
            primary,
            ..
        } = self;
        let data = primary
            .iter()
            .filter_map(|key| objects.shift_remove(key))
            .collect();
        let included = objects.into_values().collect();
        (data, included)
    }
}
