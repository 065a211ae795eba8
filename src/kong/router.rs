//! Resource Router
//!
//! Maps logical admin API resources to concrete request targets.

use super::error::{KongError, Result};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Absolute address of a single HTTP call
///
/// Used both as transport input and as the request cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestTarget(Url);

impl RequestTarget {
    /// Parse an absolute URL into a target
    pub fn parse(url: &str) -> Result<Self> {
        Url::parse(url)
            .map(Self)
            .map_err(|e| KongError::InvalidRoute(format!("{}: {}", url, e)))
    }

    /// Resolve a continuation link (absolute or server-relative) against this target
    pub fn join(&self, next: &str) -> Result<Self> {
        self.0
            .join(next)
            .map(Self)
            .map_err(|e| KongError::InvalidRoute(format!("{}: {}", next, e)))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Logical admin API resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Apis,
    Api { api_id: String },
    ApiPlugins { api_id: String },
    Plugins,
    Plugin { plugin_id: String },
    PluginsEnabled,
    PluginSchema { plugin: String },
    Consumers,
    Consumer { consumer_id: String },
    ConsumerCredentials { consumer_id: String, plugin: String },
    ConsumerAcls { consumer_id: String },
    Upstreams,
    Upstream { upstream_id: String },
    UpstreamTargets { upstream_id: String },
    UpstreamTargetsActive { upstream_id: String },
}

impl Route {
    /// Every route name accepted by [`Route::from_descriptor`]
    pub const NAMES: &'static [&'static str] = &[
        "root",
        "apis",
        "api",
        "api-plugins",
        "plugins",
        "plugin",
        "plugins-enabled",
        "plugins-scheme",
        "consumers",
        "consumer",
        "consumer-credentials",
        "consumer-acls",
        "upstreams",
        "upstream",
        "upstream-targets",
        "upstream-targets-active",
    ];

    /// Build a route from its name and camelCase parameters
    pub fn from_descriptor(name: &str, params: &HashMap<String, String>) -> Result<Self> {
        let param = |key: &str| -> Result<String> {
            params
                .get(key)
                .cloned()
                .ok_or_else(|| KongError::InvalidRoute(format!("{} requires parameter {}", name, key)))
        };

        let route = match name {
            "root" => Self::Root,
            "apis" => Self::Apis,
            "api" => Self::Api { api_id: param("apiId")? },
            "api-plugins" => Self::ApiPlugins { api_id: param("apiId")? },
            "plugins" => Self::Plugins,
            "plugin" => Self::Plugin { plugin_id: param("pluginId")? },
            "plugins-enabled" => Self::PluginsEnabled,
            "plugins-scheme" => Self::PluginSchema { plugin: param("plugin")? },
            "consumers" => Self::Consumers,
            "consumer" => Self::Consumer { consumer_id: param("consumerId")? },
            "consumer-credentials" => Self::ConsumerCredentials {
                consumer_id: param("consumerId")?,
                plugin: param("plugin")?,
            },
            "consumer-acls" => Self::ConsumerAcls { consumer_id: param("consumerId")? },
            "upstreams" => Self::Upstreams,
            "upstream" => Self::Upstream { upstream_id: param("upstreamId")? },
            "upstream-targets" => Self::UpstreamTargets { upstream_id: param("upstreamId")? },
            "upstream-targets-active" => Self::UpstreamTargetsActive {
                upstream_id: param("upstreamId")?,
            },
            _ => return Err(KongError::InvalidRoute(format!("unknown route: {}", name))),
        };

        Ok(route)
    }

    /// Kebab-case name of the route
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Apis => "apis",
            Self::Api { .. } => "api",
            Self::ApiPlugins { .. } => "api-plugins",
            Self::Plugins => "plugins",
            Self::Plugin { .. } => "plugin",
            Self::PluginsEnabled => "plugins-enabled",
            Self::PluginSchema { .. } => "plugins-scheme",
            Self::Consumers => "consumers",
            Self::Consumer { .. } => "consumer",
            Self::ConsumerCredentials { .. } => "consumer-credentials",
            Self::ConsumerAcls { .. } => "consumer-acls",
            Self::Upstreams => "upstreams",
            Self::Upstream { .. } => "upstream",
            Self::UpstreamTargets { .. } => "upstream-targets",
            Self::UpstreamTargetsActive { .. } => "upstream-targets-active",
        }
    }

    /// Path relative to the admin API root, with parameters percent-encoded
    pub fn path(&self) -> String {
        let enc = |s: &str| urlencoding::encode(s).into_owned();

        match self {
            Self::Root => "/".to_string(),
            Self::Apis => "/apis".to_string(),
            Self::Api { api_id } => format!("/apis/{}", enc(api_id)),
            Self::ApiPlugins { api_id } => format!("/apis/{}/plugins", enc(api_id)),
            Self::Plugins => "/plugins".to_string(),
            Self::Plugin { plugin_id } => format!("/plugins/{}", enc(plugin_id)),
            Self::PluginsEnabled => "/plugins/enabled".to_string(),
            Self::PluginSchema { plugin } => format!("/plugins/schema/{}", enc(plugin)),
            Self::Consumers => "/consumers".to_string(),
            Self::Consumer { consumer_id } => format!("/consumers/{}", enc(consumer_id)),
            Self::ConsumerCredentials { consumer_id, plugin } => {
                format!("/consumers/{}/{}", enc(consumer_id), enc(plugin))
            }
            Self::ConsumerAcls { consumer_id } => format!("/consumers/{}/acls", enc(consumer_id)),
            Self::Upstreams => "/upstreams".to_string(),
            Self::Upstream { upstream_id } => format!("/upstreams/{}", enc(upstream_id)),
            Self::UpstreamTargets { upstream_id } => {
                format!("/upstreams/{}/targets", enc(upstream_id))
            }
            Self::UpstreamTargetsActive { upstream_id } => {
                format!("/upstreams/{}/targets/active", enc(upstream_id))
            }
        }
    }
}

/// Builds request targets for one admin API host
#[derive(Debug, Clone)]
pub struct Router {
    base: Url,
}

impl Router {
    /// Create a router for `host` (e.g. `localhost:8001`)
    ///
    /// A host that already carries a scheme is used as-is and `use_https` is ignored.
    pub fn new(host: &str, use_https: bool) -> Result<Self> {
        let raw = if host.contains("://") {
            host.to_string()
        } else {
            let scheme = if use_https { "https" } else { "http" };
            format!("{}://{}", scheme, host)
        };

        let mut base =
            Url::parse(&raw).map_err(|e| KongError::InvalidRoute(format!("{}: {}", raw, e)))?;
        if base.cannot_be_a_base() {
            return Err(KongError::InvalidRoute(format!("{}: not a base URL", raw)));
        }

        // Keep any path prefix (admin API behind a reverse proxy) as a directory
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base })
    }

    /// Produce the request target for a route
    pub fn route(&self, route: &Route) -> Result<RequestTarget> {
        let relative = route.path();
        self.base
            .join(relative.trim_start_matches('/'))
            .map(RequestTarget)
            .map_err(|e| KongError::InvalidRoute(format!("{}: {}", route.name(), e)))
    }
}
