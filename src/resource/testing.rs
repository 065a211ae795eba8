//! In-memory transport for unit tests

use crate::kong::error::Result;
use crate::kong::http::{RequestOptions, Response, Transport};
use crate::kong::router::RequestTarget;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Serves canned responses by path and records every call
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<String, Response>>,
    gets: Mutex<Vec<(String, Option<usize>)>>,
    requests: Mutex<Vec<(String, RequestOptions)>>,
    /// Yield once before answering so concurrent callers overlap
    slow: bool,
}

impl ScriptedTransport {
    pub const BASE: &'static str = "http://kong:8001";

    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow() -> Arc<Self> {
        Arc::new(Self {
            slow: true,
            ..Self::default()
        })
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.respond_raw(path, status, &body.to_string());
    }

    /// Serve `body` exactly as given, JSON or not
    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default();
        self.responses
            .lock()
            .insert(path.to_string(), Response::new(status, reason, body));
    }

    pub fn gets(&self) -> Vec<(String, Option<usize>)> {
        self.gets.lock().clone()
    }

    pub fn get_count(&self, path: &str) -> usize {
        self.gets.lock().iter().filter(|(p, _)| p == path).count()
    }

    pub fn total_gets(&self) -> usize {
        self.gets.lock().len()
    }

    pub fn requests(&self) -> Vec<(String, RequestOptions)> {
        self.requests.lock().clone()
    }

    fn path_of(target: &RequestTarget) -> String {
        target
            .as_str()
            .strip_prefix(Self::BASE)
            .unwrap_or(target.as_str())
            .to_string()
    }

    fn answer(&self, path: &str) -> Response {
        self.responses
            .lock()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found", r#"{"message":"Not found"}"#))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, target: &RequestTarget, page_size: Option<usize>) -> Result<Response> {
        let path = Self::path_of(target);
        self.gets.lock().push((path.clone(), page_size));
        if self.slow {
            tokio::task::yield_now().await;
        }
        Ok(self.answer(&path))
    }

    async fn request(&self, target: &RequestTarget, options: RequestOptions) -> Result<Response> {
        let path = Self::path_of(target);
        self.requests.lock().push((path.clone(), options));
        Ok(self.answer(&path))
    }
}
