//! The remote record source.
//!
//! A read-only HTTP(S) endpoint parameterized by a selection (the domain's
//! category of data) and an optional `to`-timestamp cursor. Responses are
//! either a map of stable-id → structured record or a map of stable-id →
//! `{timestamp, news}` log line; which one is the domain's business, so the
//! trait hands back the raw selection payload and lets the domain decode it.
//!
//! Failure envelope: `{ "error": { "code": N, "error": "..." } }`. Codes 2
//! and 16 mean the caller's key lacks the required scope — permanent, fatal
//! to the run. Everything else is transient.

pub mod http;
pub mod scopes;

pub use http::{HttpRecordSource, HttpSourceConfig};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Error codes the remote uses for permanent authorization failures.
/// 2 = key denied for the endpoint, 16 = key access level too low.
const AUTH_ERROR_CODES: [u16; 2] = [2, 16];

#[derive(Error, Debug)]
pub enum SourceError {
    /// The credential lacks the scope this selection requires. Fatal;
    /// never retried automatically.
    #[error("missing API permission for '{scope}' ({message})")]
    Authorization {
        code: u16,
        scope: String,
        message: String,
    },
    /// The remote reported a non-authorization error (rate limit,
    /// maintenance, bad parameter). Transient.
    #[error("remote API error {code}: {message}")]
    Api { code: u16, message: String },
    /// Network-level failure. Transient.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The bounded request timeout elapsed. Transient.
    #[error("request timed out")]
    Timeout,
    /// The response body could not be decoded. Transient.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Only authorization failures abort without being retryable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authorization { .. })
    }
}

/// One page request: which selection, optionally bounded to entries at or
/// before `before` (epoch seconds). `before = None` asks for the live
/// (newest) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery<'a> {
    pub selection: &'a str,
    pub category: Option<&'a str>,
    pub before: Option<u64>,
}

impl<'a> PageQuery<'a> {
    #[must_use]
    pub fn live(selection: &'a str, category: Option<&'a str>) -> Self {
        Self {
            selection,
            category,
            before: None,
        }
    }

    #[must_use]
    pub fn before(selection: &'a str, category: Option<&'a str>, before: u64) -> Self {
        Self {
            selection,
            category,
            before: Some(before),
        }
    }
}

/// Read-only remote source of paginated records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one page. Returns the raw selection payload (an id-keyed map,
    /// or null/empty when the history is exhausted).
    async fn fetch_page(&self, query: PageQuery<'_>) -> Result<Value, SourceError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: u16,
    #[serde(rename = "error")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

/// Inspect a decoded response body for the failure envelope.
pub fn check_envelope(selection: &str, body: &Value) -> Result<(), SourceError> {
    let envelope: ErrorEnvelope = match serde_json::from_value(body.clone()) {
        Ok(env) => env,
        // A body without the envelope shape has no error field to report.
        Err(_) => return Ok(()),
    };

    let Some(err) = envelope.error else {
        return Ok(());
    };

    if AUTH_ERROR_CODES.contains(&err.code) {
        let scope = scopes::for_selection(selection)
            .map(|req| req.scope.to_string())
            .unwrap_or_else(|| selection.to_string());
        let message = scopes::for_selection(selection)
            .map(|req| format!("{} — {}", err.message, req.description))
            .unwrap_or(err.message);
        return Err(SourceError::Authorization {
            code: err.code,
            scope,
            message,
        });
    }

    Err(SourceError::Api {
        code: err.code,
        message: err.message,
    })
}
