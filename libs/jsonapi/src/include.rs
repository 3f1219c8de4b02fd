//! `include` resolution against the registered schema.

use jsonapi_core::IncludeTree;
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::resource::Resource;

fn invalid(path: &str) -> Error {
    Error::bad_request(format!("Invalid include [{path}]")).with_parameter("include")
}

/// Read the `include` parameter (or `default` when absent) and validate it
/// for the given primary resources.
pub fn resolve_include<'a>(
    ctx: &Context<'a>,
    resources: &[&'a Resource],
    default: &IncludeTree,
) -> Result<IncludeTree, Error> {
    let tree = match ctx.query_param("include") {
        Some(raw) => IncludeTree::parse(raw).map_err(|e| match e {
            jsonapi_core::Error::InvalidInclude(path) => invalid(&path),
            other => Error::from(other),
        })?,
        None => default.clone(),
    };

    let max_depth = ctx.api().max_include_depth();
    if tree.depth() > max_depth {
        let deepest = tree
            .paths()
            .into_iter()
            .find(|p| p.split('.').count() > max_depth)
            .unwrap_or_default();
        return Err(invalid(&deepest));
    }

    validate_include(ctx, resources, &tree, "")?;
    if !tree.is_empty() {
        debug!(include = ?tree.paths(), "include resolved");
    }
    Ok(tree)
}

/// Each key must name a visible, includable relationship on one of the
/// `candidates`; nested keys are checked against that relationship's targets.
/// Recursion follows the tree, so cyclic schemas terminate.
pub fn validate_include<'a>(
    ctx: &Context<'a>,
    candidates: &[&'a Resource],
    tree: &IncludeTree,
    prefix: &str,
) -> Result<(), Error> {
    for (name, child) in tree.iter() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };

        let relationship = candidates.iter().find_map(|&resource| {
            let field = resource.get_field(name)?;
            let rel = field.as_relationship()?;
            let scoped = ctx.with_resource(resource);
            (rel.includable && field.is_visible(None, &scoped)).then_some(rel)
        });
        let Some(relationship) = relationship else {
            return Err(invalid(&path));
        };

        if !child.is_empty() {
            let targets = ctx.api().related_resources(relationship);
            validate_include(ctx, &targets, child, &path)?;
        }
    }
    Ok(())
}
