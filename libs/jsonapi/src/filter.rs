//! Filter declarations and the evaluator for parsed `filter` expressions.

use std::any::Any;
use std::sync::Arc;

use jsonapi_core::Expr;
use serde_json::Value;

use crate::capability::{query_mut, FilterGroup, Listable, Query};
use crate::context::Context;
use crate::error::Error;
use crate::resource::Resource;
use crate::schema::Predicate;

pub type FilterApply = Arc<dyn Fn(&mut Query, &Value, &Context<'_>) -> Result<(), Error> + Send + Sync>;

/// A named leaf filter. Its hook receives the raw value and may interpret it
/// as a scalar, a list or an operator mapping.
#[derive(Clone)]
pub struct Filter {
    name: String,
    apply: FilterApply,
    visible: Option<Predicate>,
}

impl Filter {
    /// Filter over a concrete query type `Q`.
    pub fn new<Q, F>(name: impl Into<String>, f: F) -> Self
    where
        Q: Any,
        F: Fn(&mut Q, &Value, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self::raw(name, move |query, value, ctx| f(query_mut::<Q>(query)?, value, ctx))
    }

    pub fn raw<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Query, &Value, &Context<'_>) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(f),
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

    pub fn apply(&self, query: &mut Query, value: &Value, ctx: &Context<'_>) -> Result<(), Error> {
        (self.apply)(query, value, ctx)
    }
}

/// Apply `expr` to `query`. `and` narrows the same query; `or` and `not`
/// collect one sub-query per branch and hand them to [`Listable::combine`].
pub fn apply_filters(
    query: &mut Query,
    expr: &Expr,
    resource: &Resource,
    list: &dyn Listable,
    ctx: &Context<'_>,
) -> Result<(), Error> {
    match expr {
        Expr::Leaf { name, value } => {
            let filter = resource
                .get_filter(name)
                .filter(|f| f.is_visible(ctx))
                .ok_or_else(|| {
                    Error::bad_request(format!("Invalid filter [{name}]")).with_parameter("filter")
                })?;
            filter
                .apply(query, value, ctx)
                .map_err(|e| e.prepend_parameter(&format!("filter[{name}]")))
        }
        Expr::And(items) => items
            .iter()
            .try_for_each(|item| apply_filters(query, item, resource, list, ctx)),
        Expr::Or(items) => {
            let parts = items
                .iter()
                .map(|item| branch(query, item, resource, list, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            list.combine(query, FilterGroup::Or, parts, ctx)
        }
        Expr::Not(inner) => {
            let part = branch(query, inner, resource, list, ctx)?;
            list.combine(query, FilterGroup::Not, vec![part], ctx)
        }
    }
}

fn branch(
    parent: &Query,
    expr: &Expr,
    resource: &Resource,
    list: &dyn Listable,
    ctx: &Context<'_>,
) -> Result<Query, Error> {
    let mut sub = list.sub_query(parent, ctx)?;
    apply_filters(&mut sub, expr, resource, list, ctx)?;
    Ok(sub)
}
