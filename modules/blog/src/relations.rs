//! Relationship getters and setters over foreign key columns.

use std::sync::Arc;

use jsonapi::memory::{MemoryStore, MemoryTable};
use jsonapi::{Context, Error};
use serde_json::{json, Value};

/// Related model referenced by `column`, or null.
pub fn belongs_to(
    table: Arc<MemoryTable>,
    column: &'static str,
) -> impl Fn(&Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static {
    move |model: &Value, _ctx: &Context<'_>| {
        Ok(match model.get(column) {
            Some(Value::String(id)) => table.get(id).unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }
}

/// Store the id of the resolved related model in `column`.
pub fn set_foreign_key(
    column: &'static str,
) -> impl Fn(&mut Value, Value, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static {
    move |model: &mut Value, related: Value, _ctx: &Context<'_>| {
        let id = related.get("id").cloned().unwrap_or(Value::Null);
        match model.as_object_mut() {
            Some(map) => {
                map.insert(column.to_string(), id);
                Ok(())
            }
            None => Err(Error::internal("model is not an object")),
        }
    }
}

/// Models in `table` whose `column` holds this model's id.
pub fn has_many(
    table: Arc<MemoryTable>,
    column: &'static str,
) -> impl Fn(&Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static {
    move |model: &Value, _ctx: &Context<'_>| {
        let id = model.get("id").cloned().unwrap_or(Value::Null);
        Ok(Value::Array(table.where_eq(column, &id)))
    }
}

/// Resolve stored `{"type", "id"}` references across several tables.
/// Dangling references are skipped.
pub fn references(
    store: Arc<MemoryStore>,
    column: &'static str,
) -> impl Fn(&Value, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static {
    move |model: &Value, _ctx: &Context<'_>| {
        let refs = model.get(column).and_then(Value::as_array);
        let related = refs
            .into_iter()
            .flatten()
            .filter_map(|r| {
                let kind = r.get("type")?.as_str()?;
                let id = r.get("id")?.as_str()?;
                store.table(kind).get(id)
            })
            .collect();
        Ok(Value::Array(related))
    }
}

/// Store resolved related models as `{"type", "id"}` references. The type
/// is the first of `types` whose resource claims the model.
pub fn set_references(
    types: &'static [&'static str],
    column: &'static str,
) -> impl Fn(&mut Value, Value, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static {
    move |model: &mut Value, related: Value, ctx: &Context<'_>| {
        let mut refs = Vec::new();
        for item in related.as_array().into_iter().flatten() {
            let resource = types
                .iter()
                .filter_map(|kind| ctx.api().resource(kind))
                .find(|r| r.accepts(item))
                .ok_or_else(|| Error::internal("related model is claimed by no resource"))?;
            let id = resource.get_id(item, ctx)?;
            refs.push(json!({"type": resource.kind(), "id": id}));
        }
        match model.as_object_mut() {
            Some(map) => {
                map.insert(column.to_string(), Value::Array(refs));
                Ok(())
            }
            None => Err(Error::internal("model is not an object")),
        }
    }
}
