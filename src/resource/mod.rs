//! Pagination and caching engine
//!
//! # Architecture
//!
//! - [`fetcher`] - Page Walker: follows `next` links into one collection
//! - [`cache`] - Request-scoped single-flight cache and permanent caches
//! - [`api`] - Named read operations and the mutation gateway
//!
//! # Example
//!
//! ```ignore
//! use kong_admin::{AdminApi, Config};
//!
//! async fn list_apis() -> anyhow::Result<Vec<serde_json::Value>> {
//!     let api = AdminApi::connect(&Config::default())?;
//!     Ok(api.fetch_apis().await?)
//! }
//! ```

pub mod api;
pub mod cache;
pub mod fetcher;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AdminApi, MutationParams, PluginList};
pub use cache::{CacheContext, PluginSchema, PluginSchemas, SingleFlight};
pub use fetcher::{PageEnvelope, PageWalker, Resolved};
