//! Transport-agnostic JSON:API query primitives.
//!
//! Everything in this crate is pure parsing over `serde_json::Value` and
//! header strings: the filter expression tree, sort lists, include trees,
//! media types, and offset page windows. The request pipeline lives in the
//! `jsonapi` crate and maps [`Error`] into client errors.

pub mod filter;
pub mod include;
pub mod media_type;
pub mod page;
pub mod sort;

pub use filter::{CompareOperator, Expr};
pub use include::IncludeTree;
pub use media_type::{MediaType, MediaTypeList, JSON_API_MEDIA_TYPE};
pub use page::PageWindow;
pub use sort::{SortDir, SortField, SortList};

/// Unified error type for query primitive parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid include: {0}")]
    InvalidInclude(String),

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid media type: {0}")]
    InvalidMediaType(String),

    /// The offending page parameter (e.g. `page[limit]`) and a reason.
    #[error("invalid {parameter}: {reason}")]
    InvalidPage { parameter: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
