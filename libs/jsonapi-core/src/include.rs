use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, Result};

/// Relationship paths requested through `include`, merged into a tree.
///
/// `include=author,comments.author` becomes
/// `{author: {}, comments: {author: {}}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncludeTree(BTreeMap<String, IncludeTree>);

impl IncludeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a comma-separated string or a list of strings.
    pub fn parse(raw: &Value) -> Result<Self> {
        let mut tree = Self::new();
        match raw {
            Value::Null => {}
            Value::String(s) => {
                for path in s.split(',') {
                    tree.insert_path(path)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => {
                            for path in s.split(',') {
                                tree.insert_path(path)?;
                            }
                        }
                        _ => return Err(Error::InvalidInclude("include must be a string".into())),
                    }
                }
            }
            _ => return Err(Error::InvalidInclude("include must be a string".into())),
        }
        Ok(tree)
    }

    pub fn parse_str(raw: &str) -> Result<Self> {
        Self::parse(&Value::String(raw.to_string()))
    }

    /// Merge one dotted path. Blank paths are ignored; blank segments are not.
    pub fn insert_path(&mut self, path: &str) -> Result<()> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(());
        }

        let mut node = self;
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(Error::InvalidInclude(path.to_string()));
            }
            node = node.0.entry(segment.to_string()).or_default();
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&IncludeTree> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IncludeTree)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Length of the longest path; an empty tree has depth 0.
    pub fn depth(&self) -> usize {
        self.0
            .values()
            .map(|child| 1 + child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Every leaf path in dotted form, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, child) in &self.0 {
            if child.is_empty() {
                out.push(name.clone());
            } else {
                out.extend(child.paths().into_iter().map(|p| format!("{name}.{p}")));
            }
        }
        out
    }
}
