use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Offset/limit window read from `page[offset]` and `page[limit]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Read the window from the `page` parameter mapping. The limit falls back
    /// to `default_limit` and is clamped to `max_limit`.
    pub fn parse(page: Option<&Value>, default_limit: u64, max_limit: u64) -> Result<Self> {
        let page = match page {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(Error::InvalidPage {
                    parameter: "page".into(),
                    reason: "must be an object".into(),
                })
            }
        };

        let offset = match page.and_then(|p| p.get("offset")) {
            None => 0,
            Some(v) => read_integer(v).ok_or_else(|| Error::InvalidPage {
                parameter: "page[offset]".into(),
                reason: "must be a non-negative integer".into(),
            })?,
        };

        let limit = match page.and_then(|p| p.get("limit")) {
            None => default_limit,
            Some(v) => match read_integer(v) {
                Some(n) if n > 0 => n,
                _ => {
                    return Err(Error::InvalidPage {
                        parameter: "page[limit]".into(),
                        reason: "must be a positive integer".into(),
                    })
                }
            },
        };

        let limit = limit.min(max_limit.max(1));
        if offset.checked_add(limit).is_none() {
            return Err(Error::InvalidPage {
                parameter: "page[offset]".into(),
                reason: "is out of range".into(),
            });
        }

        Ok(Self { offset, limit })
    }

    pub fn first(&self) -> Option<PageWindow> {
        (self.offset > 0).then_some(PageWindow {
            offset: 0,
            limit: self.limit,
        })
    }

    pub fn prev(&self) -> Option<PageWindow> {
        (self.offset > 0).then(|| PageWindow {
            offset: self.offset.saturating_sub(self.limit),
            limit: self.limit,
        })
    }

    /// Without a total, a full page suggests there may be more.
    pub fn next(&self, count: usize, total: Option<u64>) -> Option<PageWindow> {
        let offset = self.offset.checked_add(self.limit)?;
        let more = match total {
            Some(total) => offset < total,
            None => count as u64 >= self.limit,
        };
        more.then_some(PageWindow {
            offset,
            limit: self.limit,
        })
    }

    pub fn last(&self, total: Option<u64>) -> Option<PageWindow> {
        let total = total?;
        let last_offset = if total == 0 {
            0
        } else {
            ((total - 1) / self.limit) * self.limit
        };
        (last_offset != self.offset).then_some(PageWindow {
            offset: last_offset,
            limit: self.limit,
        })
    }
}

fn read_integer(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
