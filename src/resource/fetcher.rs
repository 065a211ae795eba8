//! Page Walker
//!
//! Follows `next` links until a collection is fully materialized.

use crate::kong::error::{KongError, Result};
use crate::kong::http::Transport;
use crate::kong::router::RequestTarget;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// One decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum PageEnvelope {
    /// `{ "data": [...], "next": "..." }`
    Collection { data: Vec<Value>, next: Option<String> },
    /// Any body without a `data` array
    Scalar(Value),
}

impl PageEnvelope {
    /// Classify a decoded body
    ///
    /// An object whose `data` is an array is a page; `next` counts only when
    /// it is a non-empty string. A non-array `data` without `next` unwraps to
    /// that value. Anything else is returned whole.
    pub fn decode(body: Value) -> Self {
        let mut map = match body {
            Value::Object(map) => map,
            other => return Self::Scalar(other),
        };

        let next = match map.get("next") {
            Some(Value::String(next)) if !next.is_empty() => Some(next.clone()),
            _ => None,
        };

        let unwrap = match map.get("data") {
            Some(Value::Array(_)) => true,
            Some(data) => is_truthy(data) && next.is_none(),
            None => false,
        };
        if !unwrap {
            return Self::Scalar(Value::Object(map));
        }

        match map.remove("data") {
            Some(Value::Array(data)) => Self::Collection { data, next },
            Some(data) => Self::Scalar(data),
            None => Self::Scalar(Value::Object(map)),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Result of walking a target
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// All pages' `data`, in server order
    Collection(Vec<Value>),
    /// Non-paginated body, returned verbatim
    Value(Value),
}

impl Resolved {
    /// Items of a collection; a bare JSON array also qualifies
    pub fn items(&self, target: &RequestTarget) -> Result<Vec<Value>> {
        match self {
            Self::Collection(items) => Ok(items.clone()),
            Self::Value(Value::Array(items)) => Ok(items.clone()),
            Self::Value(_) => Err(KongError::UnexpectedShape {
                target: target.clone(),
                expected: "collection",
            }),
        }
    }

    /// Plain JSON view; collections become arrays
    pub fn to_value(&self) -> Value {
        match self {
            Self::Collection(items) => Value::Array(items.clone()),
            Self::Value(value) => value.clone(),
        }
    }
}

/// Walks paginated endpoints over a [`Transport`]
#[derive(Clone)]
pub struct PageWalker {
    transport: Arc<dyn Transport>,
}

impl PageWalker {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Resolve `target` into a complete collection or a plain value
    ///
    /// `page_size` is only sent with the first request. A first page shorter
    /// than `page_size` ends the walk even when it carries a `next` link.
    pub async fn resolve(&self, target: &RequestTarget, page_size: Option<usize>) -> Result<Resolved> {
        let mut visited = HashSet::new();
        let mut items = Vec::new();
        let mut current = target.clone();
        let mut hint = page_size;
        let mut first = true;

        loop {
            visited.insert(current.clone());

            match self.fetch_page(&current, hint).await? {
                PageEnvelope::Scalar(value) if first => return Ok(Resolved::Value(value)),
                PageEnvelope::Scalar(Value::Array(rest)) => {
                    items.extend(rest);
                    return Ok(Resolved::Collection(items));
                }
                // A continuation page must be a page or a bare array; no object is
                // spliced into the collection.
                PageEnvelope::Scalar(_) => {
                    return Err(KongError::UnexpectedShape {
                        target: current,
                        expected: "page envelope",
                    })
                }
                PageEnvelope::Collection { data, next } => {
                    let short = hint.is_some_and(|size| data.len() < size);
                    items.extend(data);

                    let Some(next) = next else {
                        break;
                    };

                    if short {
                        tracing::warn!(
                            "{}: short page with next link, stopping at {} items",
                            current,
                            items.len()
                        );
                        break;
                    }

                    let next_target = current.join(&next)?;
                    if visited.contains(&next_target) {
                        return Err(KongError::PaginationCycle { target: next_target });
                    }

                    current = next_target;
                    hint = None;
                    first = false;
                }
            }
        }

        tracing::debug!("{}: resolved {} items", target, items.len());
        Ok(Resolved::Collection(items))
    }

    async fn fetch_page(&self, target: &RequestTarget, page_size: Option<usize>) -> Result<PageEnvelope> {
        let response = self.transport.get(target, page_size).await?;

        if !response.is_success() {
            return Err(KongError::Http {
                target: target.clone(),
                status: response.status,
                status_text: response.status_text,
            });
        }

        Ok(PageEnvelope::decode(response.json(target)?))
    }
}
