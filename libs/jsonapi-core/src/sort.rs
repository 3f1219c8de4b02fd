use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MAX_SORT_LEN: usize = 1024;
pub const MAX_SORT_FIELDS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn is_desc(self) -> bool {
        matches!(self, SortDir::Desc)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub dir: SortDir,
}

/// Ordered list of sort fields parsed from `sort=a,-b`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortList(pub Vec<SortField>);

impl SortList {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SortField> {
        self.0.iter()
    }

    /// Parse comma-separated tokens; a leading `-` means descending.
    /// An empty string is an empty list.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::empty());
        }
        if raw.len() > MAX_SORT_LEN {
            return Err(Error::InvalidSort("sort too long".into()));
        }

        let mut fields = Vec::new();
        for token in raw.split(',') {
            let token = token.trim();
            let (name, dir) = match token.strip_prefix('-') {
                Some(rest) => (rest, SortDir::Desc),
                None => (token, SortDir::Asc),
            };
            if name.is_empty() {
                return Err(Error::InvalidSort(format!("empty sort field in '{raw}'")));
            }
            fields.push(SortField {
                name: name.to_string(),
                dir,
            });
        }

        if fields.len() > MAX_SORT_FIELDS {
            return Err(Error::InvalidSort("too many sort fields".into()));
        }
        Ok(Self(fields))
    }

    /// Render back into the `sort` query parameter form.
    pub fn to_tokens(&self) -> String {
        self.0
            .iter()
            .map(|f| match f.dir {
                SortDir::Asc => f.name.clone(),
                SortDir::Desc => format!("-{}", f.name),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<'a> IntoIterator for &'a SortList {
    type Item = &'a SortField;
    type IntoIter = std::slice::Iter<'a, SortField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
