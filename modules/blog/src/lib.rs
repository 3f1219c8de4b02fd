//! Demo blog API: users, posts and comments over the in-memory store.
//!
//! [`Blog::build`] assembles the [`JsonApi`] from an [`ApiConfig`] and seeds
//! the store with a handful of models so the server has something to answer
//! with out of the box.

use std::sync::Arc;

use jsonapi::memory::{MemoryStore, MemoryTable};
use jsonapi::{ApiConfig, ConfigError, JsonApi};
use tracing::info;

pub mod access;
pub mod error;
pub mod relations;
pub mod resources;
pub mod seed;

pub use access::{as_admin, is_admin, ROLE_HEADER};
pub use error::ValidationError;

pub struct Blog {
    api: JsonApi,
    store: Arc<MemoryStore>,
}

impl Blog {
    /// Build the API over an empty store.
    pub fn build(config: &ApiConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(MemoryStore::new());
        let api = JsonApi::builder()
            .config(config)
            .resource(resources::users(&store))
            .resource(resources::posts(&store))
            .resource(resources::comments(&store))
            .build()?;
        info!(base_path = api.base_path(), "blog API built");
        Ok(Self { api, store })
    }

    /// Build the API and fill it with the demo data set.
    pub fn with_demo_data(config: &ApiConfig) -> Result<Self, ConfigError> {
        let blog = Self::build(config)?;
        seed::demo(&blog.store);
        Ok(blog)
    }

    pub fn api(&self) -> &JsonApi {
        &self.api
    }

    pub fn into_api(self) -> JsonApi {
        self.api
    }

    pub fn table(&self, name: &str) -> Arc<MemoryTable> {
        self.store.table(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registers_every_resource() {
        let blog = Blog::build(&ApiConfig::default()).unwrap();
        for kind in ["users", "posts", "comments"] {
            assert!(blog.api().resource(kind).is_some(), "{kind} registered");
        }
        assert!(blog.table("posts").is_empty());
    }

    #[test]
    fn test_demo_data_is_seeded() {
        let blog = Blog::with_demo_data(&ApiConfig::default()).unwrap();
        assert_eq!(blog.table("users").len(), 3);
        assert_eq!(blog.table("posts").len(), 4);
        assert_eq!(blog.table("comments").len(), 4);
    }

    #[test]
    fn test_config_reaches_the_api() {
        let config = ApiConfig {
            base_path: "/v1".into(),
            ..ApiConfig::default()
        };
        let blog = Blog::build(&config).unwrap();
        assert_eq!(blog.api().base_path(), "/v1");
    }
}
