use serde_json::{Map, Value};

use crate::{Error, Result};

/// Maximum nesting of `and`/`or`/`not` groups.
pub const MAX_FILTER_DEPTH: usize = 16;
/// Maximum number of nodes in a parsed filter expression.
pub const MAX_FILTER_NODES: usize = 256;

/// Boolean filter expression parsed from the `filter` query parameter.
///
/// Leaves keep the raw value untouched: interpreting it (scalar, list,
/// operator mapping) is up to the filter that claims the name.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Leaf { name: String, value: Value },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOperator {
    /// Operator keys accepted in `filter[field][op]=value`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "gte" | "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "lte" | "le" => Some(Self::Le),
            _ => None,
        }
    }

    /// Interpret the result of comparing `actual` to an operand.
    pub fn matches(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
        }
    }
}

impl Expr {
    /// Parse a `filter` value. The top level must be a mapping; its entries
    /// are combined with `and`.
    pub fn parse(input: &Value) -> Result<Expr> {
        let expr = match input {
            Value::Object(map) => parse_map(map, 0)?,
            _ => return Err(Error::InvalidFilter("filter must be an object".into())),
        };

        if expr.node_count() > MAX_FILTER_NODES {
            return Err(Error::InvalidFilter("filter too complex".into()));
        }
        Ok(expr)
    }

    pub fn node_count(&self) -> usize {
        match self {
            Expr::Leaf { .. } => 1,
            Expr::Not(inner) => 1 + inner.node_count(),
            Expr::And(items) | Expr::Or(items) => {
                1 + items.iter().map(Expr::node_count).sum::<usize>()
            }
        }
    }

    /// Names of every leaf in document order.
    pub fn leaf_names(&self) -> Vec<&str> {
        fn walk<'a>(e: &'a Expr, out: &mut Vec<&'a str>) {
            match e {
                Expr::Leaf { name, .. } => out.push(name),
                Expr::Not(inner) => walk(inner, out),
                Expr::And(items) | Expr::Or(items) => items.iter().for_each(|i| walk(i, out)),
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}

fn conjunction(mut parts: Vec<Expr>) -> Expr {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        Expr::And(parts)
    }
}

fn parse_map(map: &Map<String, Value>, depth: usize) -> Result<Expr> {
    if depth > MAX_FILTER_DEPTH {
        return Err(Error::InvalidFilter("filter nested too deeply".into()));
    }

    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        let part = match key.as_str() {
            "and" => Expr::And(parse_group(key, value, depth + 1)?),
            "or" => Expr::Or(parse_group(key, value, depth + 1)?),
            "not" => Expr::Not(Box::new(conjunction(parse_group(key, value, depth + 1)?))),
            _ => Expr::Leaf {
                name: key.clone(),
                value: value.clone(),
            },
        };
        parts.push(part);
    }
    Ok(conjunction(parts))
}

/// Children of a combinator: a list of mappings, a mapping with numeric keys
/// (query-string form), or a plain mapping contributing one child per entry.
fn parse_group(op: &str, value: &Value, depth: usize) -> Result<Vec<Expr>> {
    let children = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(m) => parse_map(m, depth),
                _ => Err(Error::InvalidFilter(format!(
                    "[{op}] items must be objects"
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        Value::Object(m) if is_indexed(m) => {
            let mut entries: Vec<(u64, &Value)> = m
                .iter()
                .filter_map(|(k, v)| k.parse::<u64>().ok().map(|i| (i, v)))
                .collect();
            entries.sort_by_key(|(i, _)| *i);
            entries
                .into_iter()
                .map(|(_, item)| match item {
                    Value::Object(m) => parse_map(m, depth),
                    _ => Err(Error::InvalidFilter(format!(
                        "[{op}] items must be objects"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?
        }
        Value::Object(m) => m
            .iter()
            .map(|(k, v)| {
                let mut single = Map::new();
                single.insert(k.clone(), v.clone());
                parse_map(&single, depth)
            })
            .collect::<Result<Vec<_>>>()?,
        _ => {
            return Err(Error::InvalidFilter(format!(
                "[{op}] must be an object or a list"
            )))
        }
    };

    if children.is_empty() {
        return Err(Error::InvalidFilter(format!("[{op}] must not be empty")));
    }
    Ok(children)
}

fn is_indexed(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.parse::<u64>().is_ok())
}
