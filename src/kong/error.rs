//! Error taxonomy for admin API calls.
//!
//! `KongError` is `Clone` because a single in-flight read may be awaited by
//! several callers at once; underlying sources are kept behind `Arc`.

use super::router::RequestTarget;
use std::sync::Arc;
use thiserror::Error;

/// Convenience alias used across the library
pub type Result<T, E = KongError> = std::result::Result<T, E>;

/// Errors produced while talking to the admin API
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum KongError {
    /// Server answered with a non-2xx status
    #[error("{target}: {status} {status_text}")]
    Http {
        target: RequestTarget,
        status: u16,
        status_text: String,
    },

    /// Network or connection failure before a response was received
    #[error("{target}: transport error: {source}")]
    Transport {
        target: RequestTarget,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Response body was not valid JSON
    #[error("{target}: failed to decode response body: {source}")]
    Decode {
        target: RequestTarget,
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Request body could not be serialized
    #[error("failed to encode request body: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    /// A route could not be turned into a request target
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// Body decoded fine but does not have the shape the operation needs
    #[error("{target}: unexpected response shape, expected {expected}")]
    UnexpectedShape {
        target: RequestTarget,
        expected: &'static str,
    },

    /// A continuation link pointed back at a page already read in this walk
    #[error("{target}: pagination cycle detected")]
    PaginationCycle { target: RequestTarget },

    /// Server reported a version string we cannot parse
    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),
}

impl KongError {
    pub(crate) fn transport(
        target: &RequestTarget,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            target: target.clone(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn decode(target: &RequestTarget, source: serde_json::Error) -> Self {
        Self::Decode {
            target: target.clone(),
            source: Arc::new(source),
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Target the failing request was addressed to
    pub fn target(&self) -> Option<&RequestTarget> {
        match self {
            Self::Http { target, .. }
            | Self::Transport { target, .. }
            | Self::Decode { target, .. }
            | Self::UnexpectedShape { target, .. }
            | Self::PaginationCycle { target } => Some(target),
            _ => None,
        }
    }
}
