//! JSON:API resource exposure layer.
//!
//! Resources are declared with builders ([`Resource`], [`Field`], endpoints,
//! [`Filter`], [`Sort`]) over a backend that implements the capability
//! traits in [`capability`]. [`JsonApi::handle`] takes a transport-neutral
//! [`JsonApiRequest`] through query validation, media type negotiation,
//! extensions and routing, and returns an `http::Response` carrying a
//! [`Document`].
//!
//! ```ignore
//! let users = Arc::new(MemoryTable::new("users"));
//! let api = JsonApi::builder()
//!     .resource(
//!         Resource::new("users")
//!             .capabilities(users.capabilities())
//!             .field(Field::attribute("name").writable())
//!             .endpoint(Index::new())
//!             .endpoint(Show::new()),
//!     )
//!     .build()?;
//! let response = api.serve(&JsonApiRequest::get("/api/users/1"));
//! ```

pub mod api;
pub mod capability;
pub mod context;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod extension;
pub mod filter;
pub mod include;
pub mod memory;
pub mod negotiation;
pub mod pagination;
pub mod request;
pub mod resource;
pub mod response;
pub mod schema;
pub mod serializer;
pub mod sort;

pub use api::{JsonApi, JsonApiBuilder};
pub use capability::{
    Capabilities, Countable, Creatable, Deletable, FilterGroup, Findable, Listable, Model,
    Paginatable, Query, Updatable,
};
pub use context::Context;
pub use document::{
    Document, Linkage, PrimaryData, RelationshipObject, ResourceIdentifier, ResourceObject,
};
pub use endpoint::{Create, Delete, Endpoint, Index, Route, Show, Update};
pub use error::{ConfigError, Error, ErrorObject, ErrorSource};
pub use extension::Extension;
pub use filter::Filter;
pub use pagination::OffsetPagination;
pub use request::JsonApiRequest;
pub use resource::Resource;
pub use response::Response;
pub use schema::{Cardinality, Field, FieldKind, Id, MetaField, Relationship};
pub use serializer::Serializer;
pub use sort::Sort;

pub use jsonapi_core::{IncludeTree, SortDir, JSON_API_MEDIA_TYPE};
pub use runtime::ApiConfig;
