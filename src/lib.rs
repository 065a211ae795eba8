//! Client for the Kong admin API
//!
//! Reads transparently follow paginated responses into complete collections.
//! Results are cached per request target until the next mutation, while the
//! server version and plugin schemas are cached for the life of the client.
//!
//! - [`kong`] - Routes, transport, errors and version parsing
//! - [`resource`] - Page walking, caching and the named operations
//! - [`config`] - Persisted client configuration

pub mod config;
pub mod kong;
pub mod resource;

pub use config::Config;
pub use kong::error::{KongError, Result};
pub use kong::http::{format_kong_error, KongHttpClient, RequestOptions, Response, Transport};
pub use kong::router::{RequestTarget, Route, Router};
pub use kong::version::KongVersion;
pub use resource::{AdminApi, MutationParams, PluginSchemas, Resolved};
