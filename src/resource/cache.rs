//! Cache Layer
//!
//! Three tiers with different lifetimes:
//!
//! - request results, keyed by [`RequestTarget`], shared while in flight and
//!   dropped wholesale on every mutation
//! - the server version, computed once and never reset
//! - plugin schemas, computed once and never reset

use super::fetcher::Resolved;
use crate::kong::error::Result;
use crate::kong::router::RequestTarget;
use crate::kong::version::KongVersion;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Deduplicates concurrent computations per key
///
/// The first caller for a key starts the computation; everyone arriving
/// before [`SingleFlight::clear`] awaits the same handle, including after it
/// has resolved.
pub struct SingleFlight<K, T: Clone> {
    entries: Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Handle for `key`, starting the computation with `start` on a miss
    pub fn get_or_start<F>(&self, key: K, start: F) -> Shared<BoxFuture<'static, T>>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut entries = self.entries.lock();
        entries.entry(key).or_insert_with(|| start().shared()).clone()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry; callers already holding a handle keep it
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K: Eq + Hash, T: Clone> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One plugin's schema fields
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSchema {
    pub name: String,
    pub fields: Value,
}

/// Schemas of every enabled plugin, in enabled-plugin order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginSchemas {
    entries: Vec<PluginSchema>,
}

impl PluginSchemas {
    /// Fields for `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|schema| schema.name == name)
            .map(|schema| &schema.fields)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|schema| schema.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PluginSchema> for PluginSchemas {
    fn from_iter<I: IntoIterator<Item = PluginSchema>>(iter: I) -> Self {
        // A later duplicate name replaces the earlier entry in place
        let mut entries: Vec<PluginSchema> = Vec::new();
        for schema in iter {
            match entries.iter_mut().find(|e| e.name == schema.name) {
                Some(existing) => existing.fields = schema.fields,
                None => entries.push(schema),
            }
        }
        Self { entries }
    }
}

impl Serialize for PluginSchemas {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|e| (&e.name, &e.fields)))
    }
}

/// Shared in-flight or finished read
pub type SharedRead = Shared<BoxFuture<'static, Result<Arc<Resolved>>>>;

/// Cache state owned by one client
///
/// Permanent slots have no single-flight protection: concurrent first
/// callers each compute, and the last store wins.
#[derive(Default)]
pub struct CacheContext {
    requests: SingleFlight<RequestTarget, Result<Arc<Resolved>>>,
    version: RwLock<Option<KongVersion>>,
    plugin_schemas: RwLock<Option<Arc<PluginSchemas>>>,
}

impl CacheContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached read for `target`, starting it with `start` on a miss
    pub fn read_through<F>(&self, target: &RequestTarget, start: F) -> SharedRead
    where
        F: FnOnce() -> BoxFuture<'static, Result<Arc<Resolved>>>,
    {
        if self.requests.contains(target) {
            tracing::debug!("request cache hit: {}", target);
        } else {
            tracing::debug!("request cache miss: {}", target);
        }
        self.requests.get_or_start(target.clone(), start)
    }

    /// Number of request targets currently cached
    pub fn cached_requests(&self) -> usize {
        self.requests.len()
    }

    /// Drop every cached request result
    pub fn invalidate_requests(&self) {
        if self.requests.is_empty() {
            return;
        }
        let dropped = self.requests.len();
        self.requests.clear();
        tracing::info!("request cache cleared ({} entries)", dropped);
    }

    pub async fn version(&self) -> Option<KongVersion> {
        self.version.read().await.clone()
    }

    pub async fn store_version(&self, version: KongVersion) {
        tracing::info!("caching server version {}", version);
        *self.version.write().await = Some(version);
    }

    pub async fn plugin_schemas(&self) -> Option<Arc<PluginSchemas>> {
        self.plugin_schemas.read().await.clone()
    }

    pub async fn store_plugin_schemas(&self, schemas: Arc<PluginSchemas>) {
        tracing::info!("caching {} plugin schemas", schemas.len());
        *self.plugin_schemas.write().await = Some(schemas);
    }
}
