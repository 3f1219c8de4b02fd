//! In-memory reference store implementing every capability.
//!
//! Tables hold JSON models behind a `parking_lot::RwLock`. Filters and sorts
//! declared with [`where_property`] and [`sort_by`] compile into a
//! [`MemoryQuery`] that is evaluated when results are fetched.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use jsonapi_core::{CompareOperator, PageWindow, SortDir};
use parking_lot::RwLock;
use serde_json::Value;

use crate::capability::{
    query_mut, query_ref, Capabilities, Countable, Creatable, Deletable, FilterGroup, Findable,
    Listable, Model, Paginatable, Query, Updatable,
};
use crate::context::Context;
use crate::error::Error;
use crate::filter::Filter;
use crate::sort::Sort;

pub type RowPredicate = Arc<dyn Fn(&Model) -> bool + Send + Sync>;

/// Accumulated filter, order and window for one list request.
#[derive(Clone, Default)]
pub struct MemoryQuery {
    predicates: Vec<RowPredicate>,
    order: Vec<(String, SortDir)>,
    window: Option<PageWindow>,
}

impl std::fmt::Debug for MemoryQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("predicates", &self.predicates.len())
            .field("order", &self.order)
            .field("window", &self.window)
            .finish()
    }
}

impl MemoryQuery {
    pub fn filter<F>(&mut self, f: F)
    where
        F: Fn(&Model) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(f));
    }

    pub fn order_by(&mut self, property: impl Into<String>, dir: SortDir) {
        self.order.push((property.into(), dir));
    }

    pub fn order(&self) -> &[(String, SortDir)] {
        &self.order
    }

    pub fn window(&self) -> Option<PageWindow> {
        self.window
    }

    pub fn matches(&self, model: &Model) -> bool {
        self.predicates.iter().all(|p| p(model))
    }

    fn compare(&self, a: &Model, b: &Model) -> Ordering {
        for (property, dir) in &self.order {
            let left = a.get(property).unwrap_or(&Value::Null);
            let right = b.get(property).unwrap_or(&Value::Null);
            let ordering = sort_order(left, right);
            let ordering = if dir.is_desc() {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// A named collection of models.
pub struct MemoryTable {
    name: String,
    id_property: String,
    rows: RwLock<Vec<Model>>,
}

impl std::fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTable")
            .field("name", &self.name)
            .field("rows", &self.rows.read().len())
            .finish()
    }
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_property: "id".to_string(),
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn with_id_property(mut self, property: impl Into<String>) -> Self {
        self.id_property = property.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seed(&self, models: impl IntoIterator<Item = Model>) {
        self.rows.write().extend(models);
    }

    pub fn all(&self) -> Vec<Model> {
        self.rows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Model> {
        self.rows
            .read()
            .iter()
            .find(|row| self.id_of(row).as_deref() == Some(id))
            .cloned()
    }

    /// Rows whose `property` equals `value`.
    pub fn where_eq(&self, property: &str, value: &Value) -> Vec<Model> {
        self.rows
            .read()
            .iter()
            .filter(|row| {
                row.get(property)
                    .is_some_and(|v| compare_values(v, value) == Some(Ordering::Equal))
            })
            .cloned()
            .collect()
    }

    pub fn capabilities(self: &Arc<Self>) -> Capabilities {
        Capabilities::all(self.clone())
    }

    fn id_of(&self, row: &Model) -> Option<String> {
        match row.get(&self.id_property)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn matching(&self, query: &MemoryQuery) -> Vec<Model> {
        let mut rows: Vec<Model> = self
            .rows
            .read()
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| query.compare(a, b));
        rows
    }
}

impl Findable for MemoryTable {
    fn find(&self, id: &str, _ctx: &Context<'_>) -> Result<Option<Model>, Error> {
        Ok(self.get(id))
    }
}

impl Listable for MemoryTable {
    fn query(&self, _ctx: &Context<'_>) -> Result<Query, Error> {
        Ok(Box::new(MemoryQuery::default()))
    }

    fn results(
        &self,
        query: &(dyn Any + Send + Sync),
        _ctx: &Context<'_>,
    ) -> Result<Vec<Model>, Error> {
        let query = query_ref::<MemoryQuery>(query)?;
        let rows = self.matching(query);
        Ok(match query.window {
            Some(w) => rows
                .into_iter()
                .skip(usize::try_from(w.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(w.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        })
    }

    fn sub_query(&self, _parent: &Query, _ctx: &Context<'_>) -> Result<Query, Error> {
        Ok(Box::new(MemoryQuery::default()))
    }

    fn combine(
        &self,
        query: &mut Query,
        group: FilterGroup,
        parts: Vec<Query>,
        _ctx: &Context<'_>,
    ) -> Result<(), Error> {
        let parts = parts
            .into_iter()
            .map(|part| {
                part.downcast::<MemoryQuery>()
                    .map(|q| *q)
                    .map_err(|_| Error::internal("filter branch is not a MemoryQuery"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let query = query_mut::<MemoryQuery>(query)?;
        match group {
            FilterGroup::Or => query.filter(move |m| parts.iter().any(|p| p.matches(m))),
            FilterGroup::Not => query.filter(move |m| !parts.iter().all(|p| p.matches(m))),
        }
        Ok(())
    }
}

impl Countable for MemoryTable {
    fn count(
        &self,
        query: &(dyn Any + Send + Sync),
        _ctx: &Context<'_>,
    ) -> Result<Option<u64>, Error> {
        let query = query_ref::<MemoryQuery>(query)?;
        let count = self.rows.read().iter().filter(|r| query.matches(r)).count();
        Ok(Some(count as u64))
    }
}

impl Paginatable for MemoryTable {
    fn paginate(&self, query: &mut Query, window: PageWindow, _ctx: &Context<'_>) -> Result<(), Error> {
        query_mut::<MemoryQuery>(query)?.window = Some(window);
        Ok(())
    }
}

impl Creatable for MemoryTable {
    fn create(&self, mut model: Model, _ctx: &Context<'_>) -> Result<Model, Error> {
        let id = match self.id_of(&model) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Value::Object(map) = &mut model {
                    map.insert(self.id_property.clone(), Value::String(id.clone()));
                }
                id
            }
        };

        let mut rows = self.rows.write();
        if rows.iter().any(|row| self.id_of(row).as_deref() == Some(id.as_str())) {
            return Err(Error::conflict(format!("Resource [{}/{id}] already exists", self.name))
                .with_pointer("/data/id"));
        }
        rows.push(model.clone());
        Ok(model)
    }
}

impl Updatable for MemoryTable {
    fn update(&self, model: Model, _ctx: &Context<'_>) -> Result<Model, Error> {
        let id = self
            .id_of(&model)
            .ok_or_else(|| Error::internal("updated model has no id"))?;
        let mut rows = self.rows.write();
        let slot = rows
            .iter_mut()
            .find(|row| self.id_of(row).as_deref() == Some(id.as_str()))
            .ok_or_else(|| Error::not_found(format!("Resource [{}/{id}] not found", self.name)))?;
        *slot = model.clone();
        Ok(model)
    }
}

impl Deletable for MemoryTable {
    fn delete(&self, model: &Model, _ctx: &Context<'_>) -> Result<(), Error> {
        let id = self.id_of(model);
        self.rows.write().retain(|row| self.id_of(row) != id);
        Ok(())
    }
}

/// A set of tables, one per resource type.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Arc<MemoryTable>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table called `name`, created on first use.
    pub fn table(&self, name: &str) -> Arc<MemoryTable> {
        if let Some(table) = self.tables.read().get(name) {
            return table.clone();
        }
        self.tables
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryTable::new(name)))
            .clone()
    }
}

/// Filter on a model property. Accepts a scalar (equality), a list or a
/// comma-separated string (any of), or an operator mapping such as
/// `{"gte": "3", "lt": "10"}`. Operators: `eq`, `ne`, `gt`, `gte`, `lt`,
/// `lte`, `in`.
pub fn where_property(name: impl Into<String>, property: impl Into<String>) -> Filter {
    let property = property.into();
    Filter::new::<MemoryQuery, _>(name, move |query, value, _ctx| {
        let predicate = property_predicate(&property, value)?;
        query.predicates.push(predicate);
        Ok(())
    })
}

pub fn sort_by(name: impl Into<String>, property: impl Into<String>) -> Sort {
    let property = property.into();
    Sort::new::<MemoryQuery, _>(name, move |query, dir, _ctx| {
        query.order_by(property.clone(), dir);
        Ok(())
    })
}

fn property_predicate(property: &str, value: &Value) -> Result<RowPredicate, Error> {
    let property = property.to_string();
    match value {
        Value::Object(ops) => {
            let mut checks: Vec<RowPredicate> = Vec::with_capacity(ops.len());
            for (key, operand) in ops {
                let property = property.clone();
                if key == "in" {
                    let options = candidates(operand);
                    checks.push(Arc::new(move |m: &Model| any_equal(m.get(&property), &options)));
                    continue;
                }
                let op = CompareOperator::from_key(key).ok_or_else(|| {
                    Error::bad_request(format!("Invalid operator [{key}]"))
                        .with_parameter(format!("[{key}]"))
                })?;
                let operand = operand.clone();
                checks.push(Arc::new(move |m: &Model| {
                    let actual = m.get(&property).unwrap_or(&Value::Null);
                    match (op, compare_values(actual, &operand)) {
                        (CompareOperator::Ne, ordering) => ordering != Some(Ordering::Equal),
                        (op, Some(ordering)) => op.matches(ordering),
                        (_, None) => false,
                    }
                }));
            }
            Ok(Arc::new(move |m: &Model| checks.iter().all(|c| c(m))))
        }
        other => {
            let options = candidates(other);
            Ok(Arc::new(move |m: &Model| any_equal(m.get(&property), &options)))
        }
    }
}

fn candidates(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) if s.contains(',') => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

fn any_equal(actual: Option<&Value>, options: &[Value]) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    options
        .iter()
        .any(|o| compare_values(actual, o) == Some(Ordering::Equal))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Compare two JSON scalars, coercing numeric strings when either side is a
/// number. `None` when the values are not comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::String(y)) => Some(x.to_string().as_str().cmp(y.as_str())),
        (Value::String(x), Value::Bool(y)) => Some(x.as_str().cmp(y.to_string().as_str())),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            as_number(a)?.partial_cmp(&as_number(b)?)
        }
        _ => None,
    }
}

/// Total order for sorting: nulls first, then comparable values.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}
