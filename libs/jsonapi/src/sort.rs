//! Sort declarations and application of a parsed `sort` list.

use std::any::Any;
use std::sync::Arc;

use jsonapi_core::{SortDir, SortList};

use crate::capability::{query_mut, Query};
use crate::context::Context;
use crate::error::Error;
use crate::resource::Resource;
use crate::schema::Predicate;

pub type SortApply = Arc<dyn Fn(&mut Query, SortDir, &Context<'_>) -> Result<(), Error> + Send + Sync>;

#[derive(Clone)]
pub struct Sort {
    name: String,
    apply: SortApply,
    visible: Option<Predicate>,
}

impl Sort {
    pub fn new<Q, F>(name: impl Into<String>, f: F) -> Self
    where
        Q: Any,
        F: Fn(&mut Q, SortDir, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(move |query: &mut Query, dir: SortDir, ctx: &Context<'_>| {
                f(query_mut::<Q>(query)?, dir, ctx)
            }),
            visible: None,
        }
    }

    pub fn visible<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context<'_>) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self, ctx: &Context<'_>) -> bool {
        self.visible.as_ref().map_or(true, |f| f(ctx))
    }
}

/// Apply sort fields left to right. Unknown or hidden names are rejected
/// before any hook runs.
pub fn apply_sorts(
    query: &mut Query,
    sorts: &SortList,
    resource: &Resource,
    ctx: &Context<'_>,
) -> Result<(), Error> {
    let resolved = sorts
        .iter()
        .map(|field| {
            resource
                .get_sort(&field.name)
                .filter(|s| s.is_visible(ctx))
                .map(|s| (s, field.dir))
                .ok_or_else(|| {
                    Error::bad_request(format!("Invalid sort [{}]", field.name))
                        .with_parameter("sort")
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (sort, dir) in resolved {
        (sort.apply)(query, dir, ctx)?;
    }
    Ok(())
}
