//! Shared request-body handling for Create and Update.

use http::StatusCode;
use serde_json::{Map, Value};

use crate::capability::Model;
use crate::context::Context;
use crate::error::{Error, ErrorObject};
use crate::resource::Resource;
use crate::schema::{Cardinality, Field, Relationship};

/// The `data` member of a write request, after structural checks.
pub(crate) struct Submitted {
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relationships: Map<String, Value>,
}

/// Check the document shape, its `type` and its `id`. `expected_id` is the
/// id from the URL when updating.
pub(crate) fn parse_body(
    ctx: &Context<'_>,
    resource: &Resource,
    expected_id: Option<&str>,
) -> Result<Submitted, Error> {
    let data = ctx
        .request()
        .body
        .as_ref()
        .and_then(|body| body.get("data"))
        .and_then(Value::as_object)
        .ok_or_else(|| Error::bad_request("data must be a resource object").with_pointer("/data"))?;

    let kind = data
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::bad_request("type must be a string").with_pointer("/data/type"))?;
    if kind != resource.kind() {
        return Err(Error::conflict(format!(
            "type [{kind}] does not match resource [{}]",
            resource.kind()
        ))
        .with_pointer("/data/type"));
    }

    let id = match data.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => {
            return Err(Error::bad_request("id must be a string").with_pointer("/data/id"));
        }
    };
    match (expected_id, &id) {
        (None, Some(_)) if !resource.id_descriptor().allows_client_ids() => {
            return Err(
                Error::forbidden("Client-generated ids are not supported").with_pointer("/data/id")
            );
        }
        (Some(_), None) => {
            return Err(Error::bad_request("id is required").with_pointer("/data/id"));
        }
        (Some(expected), Some(id)) if expected != id => {
            return Err(Error::conflict(format!(
                "id [{id}] does not match the URL id [{expected}]"
            ))
            .with_pointer("/data/id"));
        }
        _ => {}
    }

    Ok(Submitted {
        id,
        attributes: member(data, "attributes")?,
        relationships: member(data, "relationships")?,
    })
}

fn member(data: &Map<String, Value>, name: &str) -> Result<Map<String, Value>, Error> {
    match data.get(name) {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Error::bad_request(format!("{name} must be an object"))
            .with_pointer(format!("/data/{name}"))),
    }
}

fn pointer(field: &Field) -> String {
    let member = if field.is_attribute() {
        "attributes"
    } else {
        "relationships"
    };
    format!("/data/{member}/{}", field.name())
}

fn unprocessable(detail: impl Into<String>, pointer: impl Into<String>) -> ErrorObject {
    ErrorObject::new(StatusCode::UNPROCESSABLE_ENTITY)
        .with_detail(detail)
        .with_pointer(pointer)
}

/// Validate submitted fields and write them into `model`. `existing` is the
/// stored model when updating; visibility and writability are decided
/// against it. Validation failures are collected into one 422.
pub(crate) fn apply(
    ctx: &Context<'_>,
    resource: &Resource,
    model: &mut Model,
    submitted: &Submitted,
    existing: Option<&Model>,
) -> Result<(), Error> {
    let mut fields: Vec<(&Field, &Value)> = Vec::new();
    for (members, attribute) in [(&submitted.attributes, true), (&submitted.relationships, false)] {
        for (name, value) in members {
            let field = resource
                .get_field(name)
                .filter(|f| f.is_attribute() == attribute)
                .ok_or_else(|| {
                    let member = if attribute { "attributes" } else { "relationships" };
                    Error::bad_request(format!("Unknown field [{name}]"))
                        .with_pointer(format!("/data/{member}/{name}"))
                })?;
            if !field.is_visible(existing, ctx) || !field.is_writable(existing, ctx) {
                return Err(Error::forbidden(format!("Field [{name}] is not writable"))
                    .with_pointer(pointer(field)));
            }
            fields.push((field, value));
        }
    }

    let mut errors = Vec::new();
    let mut values = Vec::with_capacity(fields.len());
    for (field, raw) in fields {
        let value = match field.as_relationship() {
            Some(rel) => match resolve_linkage(ctx, field, rel, raw)? {
                Ok(value) => value,
                Err(mut failures) => {
                    errors.append(&mut failures);
                    continue;
                }
            },
            None => raw.clone(),
        };
        let value = field.deserialize_value(value, ctx)?;

        if value.is_null() && !field.is_nullable() {
            errors.push(unprocessable(
                format!("Field [{}] must not be null", field.name()),
                pointer(field),
            ));
        } else {
            for message in field.validation_errors(&value, ctx) {
                errors.push(unprocessable(message, pointer(field)));
            }
        }
        values.push((field, value));
    }

    if existing.is_none() {
        for field in resource.all_fields() {
            let submitted_here = if field.is_attribute() {
                submitted.attributes.contains_key(field.name())
            } else {
                submitted.relationships.contains_key(field.name())
            };
            if field.is_required() && !submitted_here {
                errors.push(unprocessable(
                    format!("Field [{}] is required", field.name()),
                    pointer(field),
                ));
            }
        }
    }

    if !errors.is_empty() {
        return Err(Error::UnprocessableEntity(errors));
    }

    for (field, value) in values {
        field.set_value(model, value, ctx)?;
    }
    Ok(())
}

/// Turn relationship linkage into related models. The outer error is a
/// malformed request; the inner one lists unresolvable identifiers.
fn resolve_linkage(
    ctx: &Context<'_>,
    field: &Field,
    rel: &Relationship,
    raw: &Value,
) -> Result<Result<Value, Vec<ErrorObject>>, Error> {
    let at = pointer(field);
    let data = raw
        .as_object()
        .and_then(|o| o.get("data"))
        .ok_or_else(|| Error::bad_request("relationship must contain data").with_pointer(at.clone()))?;

    let identifiers: Vec<(usize, &Value)> = match (rel.cardinality, data) {
        (Cardinality::ToOne, Value::Null) => return Ok(Ok(Value::Null)),
        (Cardinality::ToOne, Value::Object(_)) => vec![(0, data)],
        (Cardinality::ToMany, Value::Array(items)) => items.iter().enumerate().collect(),
        (Cardinality::ToOne, _) => {
            return Err(Error::bad_request("to-one linkage must be null or an identifier")
                .with_pointer(format!("{at}/data")));
        }
        (Cardinality::ToMany, _) => {
            return Err(Error::bad_request("to-many linkage must be a list")
                .with_pointer(format!("{at}/data")));
        }
    };

    let mut related = Vec::with_capacity(identifiers.len());
    let mut failures = Vec::new();
    for (index, identifier) in identifiers {
        let item_at = match rel.cardinality {
            Cardinality::ToOne => format!("{at}/data"),
            Cardinality::ToMany => format!("{at}/data/{index}"),
        };
        let (kind, id) = match (
            identifier.get("type").and_then(Value::as_str),
            identifier.get("id").and_then(Value::as_str),
        ) {
            (Some(kind), Some(id)) => (kind, id),
            _ => {
                return Err(Error::bad_request("resource identifier needs type and id")
                    .with_pointer(item_at));
            }
        };

        let allowed = rel.types.is_empty() || rel.types.iter().any(|t| t == kind);
        let target = ctx.api().resource(kind).filter(|_| allowed);
        let Some(target) = target else {
            failures.push(unprocessable(
                format!("Type [{kind}] is not allowed for [{}]", field.name()),
                item_at,
            ));
            continue;
        };
        let find = target.caps().find.as_ref().ok_or_else(|| {
            Error::internal(format!("related resource [{kind}] cannot be looked up"))
        })?;
        match find.find(id, &ctx.with_resource(target))? {
            Some(model) => related.push(model),
            None => failures.push(unprocessable(
                format!("Related resource [{kind}/{id}] not found"),
                item_at,
            )),
        }
    }

    if !failures.is_empty() {
        return Ok(Err(failures));
    }
    Ok(Ok(match rel.cardinality {
        Cardinality::ToOne => related.into_iter().next().unwrap_or(Value::Null),
        Cardinality::ToMany => Value::Array(related),
    }))
}
