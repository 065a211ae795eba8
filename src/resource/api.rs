//! Resource API
//!
//! Named read operations over the admin API plus the mutation gateway.

use super::cache::{CacheContext, PluginSchema, PluginSchemas};
use super::fetcher::{PageWalker, Resolved};
use crate::config::Config;
use crate::kong::error::{KongError, Result};
use crate::kong::http::{KongHttpClient, RequestOptions, Response, Transport};
use crate::kong::router::{RequestTarget, Route, Router};
use crate::kong::version::KongVersion;
use futures::future::{try_join_all, FutureExt};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// `enabled_plugins` as reported by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PluginList {
    /// `["acl", "cors"]`
    Names(Vec<String>),
    /// `{"acl": true, "cors": true}`
    NameMap(serde_json::Map<String, Value>),
}

impl PluginList {
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::Names(names) => names,
            Self::NameMap(map) => map.into_iter().map(|(name, _)| name).collect(),
        }
    }
}

/// Method and optional JSON body of a state-changing call
#[derive(Debug, Clone)]
pub struct MutationParams {
    pub method: Method,
    pub body: Option<Value>,
}

impl MutationParams {
    pub fn new(method: Method) -> Self {
        Self { method, body: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Client for the admin API
pub struct AdminApi {
    router: Router,
    transport: Arc<dyn Transport>,
    walker: PageWalker,
    cache: CacheContext,
    ignore_consumers: bool,
    enable_cache: bool,
    page_size: Option<usize>,
}

impl AdminApi {
    /// Create a client over an arbitrary transport
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let router = Router::new(&config.host, config.use_https)?;

        Ok(Self {
            router,
            walker: PageWalker::new(transport.clone()),
            transport,
            cache: CacheContext::new(),
            ignore_consumers: config.ignore_consumers,
            enable_cache: config.enable_cache,
            page_size: config.page_size,
        })
    }

    /// Create a client talking HTTP through reqwest
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        let http = KongHttpClient::new()?;
        Ok(Self::new(config, Arc::new(http))?)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cache(&self) -> &CacheContext {
        &self.cache
    }

    /// Resolve a route, through the request cache when enabled
    async fn read(&self, route: &Route) -> Result<(RequestTarget, Arc<Resolved>)> {
        let target = self.router.route(route)?;

        if !self.enable_cache {
            let resolved = self.walker.resolve(&target, self.page_size).await?;
            return Ok((target, Arc::new(resolved)));
        }

        let walker = self.walker.clone();
        let page_size = self.page_size;
        let key = target.clone();
        let resolved = self
            .cache
            .read_through(&target, move || {
                async move { walker.resolve(&key, page_size).await.map(Arc::new) }.boxed()
            })
            .await?;

        Ok((target, resolved))
    }

    async fn read_items(&self, route: Route) -> Result<Vec<Value>> {
        let (target, resolved) = self.read(&route).await?;
        resolved.items(&target)
    }

    /// Read any route as plain JSON
    pub async fn fetch_route(&self, route: &Route) -> Result<Value> {
        let (_, resolved) = self.read(route).await?;
        Ok(resolved.to_value())
    }

    pub async fn fetch_apis(&self) -> Result<Vec<Value>> {
        self.read_items(Route::Apis).await
    }

    pub async fn fetch_global_plugins(&self) -> Result<Vec<Value>> {
        self.read_items(Route::Plugins).await
    }

    /// Plugins attached to one API
    pub async fn fetch_plugins(&self, api_id: &str) -> Result<Vec<Value>> {
        self.read_items(Route::ApiPlugins {
            api_id: api_id.to_string(),
        })
        .await
    }

    /// All consumers, or nothing at all when consumers are ignored
    pub async fn fetch_consumers(&self) -> Result<Vec<Value>> {
        if self.ignore_consumers {
            tracing::debug!("consumers ignored by configuration");
            return Ok(Vec::new());
        }
        self.read_items(Route::Consumers).await
    }

    pub async fn fetch_consumer_credentials(&self, consumer_id: &str, plugin: &str) -> Result<Vec<Value>> {
        self.read_items(Route::ConsumerCredentials {
            consumer_id: consumer_id.to_string(),
            plugin: plugin.to_string(),
        })
        .await
    }

    pub async fn fetch_consumer_acls(&self, consumer_id: &str) -> Result<Vec<Value>> {
        self.read_items(Route::ConsumerAcls {
            consumer_id: consumer_id.to_string(),
        })
        .await
    }

    pub async fn fetch_upstreams(&self) -> Result<Vec<Value>> {
        self.read_items(Route::Upstreams).await
    }

    /// Active targets of one upstream
    pub async fn fetch_targets(&self, upstream_id: &str) -> Result<Vec<Value>> {
        self.read_items(Route::UpstreamTargetsActive {
            upstream_id: upstream_id.to_string(),
        })
        .await
    }

    /// Names of the plugins enabled on the server
    pub async fn fetch_enabled_plugins(&self) -> Result<Vec<String>> {
        let (target, resolved) = self.read(&Route::PluginsEnabled).await?;
        let shape_error = || KongError::UnexpectedShape {
            target: target.clone(),
            expected: "enabled_plugins list or map",
        };

        let enabled = match resolved.as_ref() {
            Resolved::Value(body) => body.get("enabled_plugins").cloned().ok_or_else(shape_error)?,
            Resolved::Collection(_) => return Err(shape_error()),
        };

        serde_json::from_value::<PluginList>(enabled)
            .map(PluginList::into_names)
            .map_err(|_| shape_error())
    }

    /// Schemas of all enabled plugins
    ///
    /// Computed once per client. Schemas are fetched concurrently and
    /// nothing is cached unless every fetch succeeds.
    pub async fn fetch_plugin_schemas(&self) -> Result<Arc<PluginSchemas>> {
        if let Some(cached) = self.cache.plugin_schemas().await {
            return Ok(cached);
        }

        let names = self.fetch_enabled_plugins().await?;
        tracing::debug!("fetching {} plugin schemas", names.len());

        let schemas = try_join_all(names.into_iter().map(|name| self.fetch_plugin_schema(name))).await?;
        let schemas = Arc::new(schemas.into_iter().collect::<PluginSchemas>());

        self.cache.store_plugin_schemas(schemas.clone()).await;
        Ok(schemas)
    }

    async fn fetch_plugin_schema(&self, plugin: String) -> Result<PluginSchema> {
        let target = self.router.route(&Route::PluginSchema {
            plugin: plugin.clone(),
        })?;

        let fields = match self.walker.resolve(&target, None).await? {
            Resolved::Value(Value::Object(mut body)) => body.remove("fields").unwrap_or(Value::Null),
            _ => Value::Null,
        };

        Ok(PluginSchema { name: plugin, fields })
    }

    /// Server version, computed once per client
    pub async fn fetch_kong_version(&self) -> Result<KongVersion> {
        if let Some(cached) = self.cache.version().await {
            return Ok(cached);
        }

        let (target, root) = self.read(&Route::Root).await?;
        let raw = match root.as_ref() {
            Resolved::Value(body) => body.get("version").and_then(Value::as_str),
            Resolved::Collection(_) => None,
        }
        .ok_or_else(|| KongError::UnexpectedShape {
            target: target.clone(),
            expected: "version string",
        })?;

        let version: KongVersion = raw.parse()?;
        self.cache.store_version(version.clone()).await;
        Ok(version)
    }

    /// Issue a state-changing request and return the raw response
    ///
    /// The request cache is cleared before the call goes out, so a failed
    /// mutation still invalidates. Status is not checked here.
    pub async fn request_endpoint(&self, route: &Route, params: MutationParams) -> Result<Response> {
        self.cache.invalidate_requests();

        let target = self.router.route(route)?;
        let options = RequestOptions::json(params.method, params.body.as_ref())?;

        tracing::info!("{} {}", options.method, target);
        self.transport.request(&target, options).await
    }
}
