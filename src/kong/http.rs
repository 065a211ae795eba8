//! HTTP transport for admin API calls

use super::error::{KongError, Result};
use super::router::RequestTarget;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Query parameter carrying the page-size hint
const PAGE_SIZE_PARAM: &str = "size";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// One raw HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON; an empty body is a decode error
    pub fn json(&self, target: &RequestTarget) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| KongError::decode(target, e))
    }
}

/// Options for a state-changing request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestOptions {
    /// JSON request: `Accept` always set, body and `Content-Type` only when a body is given
    pub fn json(method: Method, body: Option<&Value>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let body = match body {
            Some(body) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                let encoded = serde_json::to_string(body)
                    .map_err(|e| KongError::Encode(std::sync::Arc::new(e)))?;
                Some(encoded)
            }
            None => None,
        };

        Ok(Self {
            method,
            headers,
            body,
        })
    }
}

/// Issues single HTTP requests
///
/// Implementations report transport failures as errors and hand back every
/// response, successful or not, for the caller to judge.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `target`, passing the page-size hint when one is given
    async fn get(&self, target: &RequestTarget, page_size: Option<usize>) -> Result<Response>;

    /// Issue an arbitrary request
    async fn request(&self, target: &RequestTarget, options: RequestOptions) -> Result<Response>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct KongHttpClient {
    client: Client,
}

impl KongHttpClient {
    /// Create a new HTTP client
    pub fn new() -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .user_agent(concat!("kong-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn read(target: &RequestTarget, response: reqwest::Response) -> Result<Response> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KongError::transport(target, e))?;

        if !status.is_success() {
            // Only log sanitized/truncated error body
            tracing::error!("API error: {} {} - {}", target, status, sanitize_for_log(&body));
        }

        Ok(Response::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body,
        ))
    }
}

#[async_trait]
impl Transport for KongHttpClient {
    async fn get(&self, target: &RequestTarget, page_size: Option<usize>) -> Result<Response> {
        tracing::debug!("GET {} (size={:?})", target, page_size);

        let mut request = self.client.get(target.as_url().clone());
        if let Some(size) = page_size {
            request = request.query(&[(PAGE_SIZE_PARAM, size)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KongError::transport(target, e))?;

        Self::read(target, response).await
    }

    async fn request(&self, target: &RequestTarget, options: RequestOptions) -> Result<Response> {
        tracing::debug!("{} {}", options.method, target);

        let mut request = self
            .client
            .request(options.method, target.as_url().clone())
            .headers(options.headers);

        if let Some(body) = options.body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KongError::transport(target, e))?;

        Self::read(target, response).await
    }
}

/// Format an error for display to a terminal user
pub fn format_kong_error(error: &anyhow::Error) -> String {
    if let Some(kong) = error.chain().find_map(|e| e.downcast_ref::<KongError>()) {
        match kong {
            KongError::Http { status: 404, .. } => return "Resource not found.".to_string(),
            KongError::Http { status: 401 | 403, .. } => {
                return "Access denied by the admin API.".to_string()
            }
            KongError::Http { status: 409, .. } => {
                return "Resource conflict. The resource may already exist.".to_string()
            }
            KongError::Http { status: 400, .. } => {
                return "Invalid request. Check your parameters.".to_string()
            }
            KongError::Http { status, .. } if *status >= 500 => {
                return "Admin API temporarily unavailable. Please try again.".to_string()
            }
            KongError::Transport { target, .. } => {
                return format!("Cannot reach the admin API at {}.", target.as_url().origin().ascii_serialization())
            }
            _ => {}
        }
    }

    // Truncate long error messages and strip control characters
    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
