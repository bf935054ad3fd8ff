// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP implementation of [`RecordSource`].
//!
//! Builds one `reqwest` client up front with a bounded per-request
//! timeout, authenticates with an `Authorization: ApiKey <key>` header,
//! and tags every request with an identifying comment so the key owner
//! can see where their traffic comes from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use super::{check_envelope, PageQuery, RecordSource, SourceError};

#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// API root, e.g. `https://api.torn.com`.
    pub base_url: String,
    /// Bearer-style credential.
    pub api_key: String,
    /// Faction whose activity is mirrored.
    pub faction_id: String,
    /// Comment tag appended to every request.
    pub comment: String,
    /// Hard bound on each request.
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.torn.com".to_string(),
            api_key: String::new(),
            faction_id: String::new(),
            comment: "faction_sync".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpRecordSource {
    client: reqwest::Client,
    base_url: String,
    faction_id: String,
    comment: String,
}

impl HttpRecordSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("ApiKey {}", config.api_key))
            .map_err(|err| SourceError::Transport(err.to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            faction_id: config.faction_id,
            comment: config.comment,
        })
    }

    fn page_url(&self, query: &PageQuery<'_>) -> String {
        let mut url = format!(
            "{}/faction/{}?selections={}&striptags=true&comment={}",
            self.base_url, self.faction_id, query.selection, self.comment
        );
        if let Some(category) = query.category {
            url.push_str("&cat=");
            url.push_str(category);
        }
        if let Some(before) = query.before {
            url.push_str("&to=");
            url.push_str(&before.to_string());
        }
        url
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_page(&self, query: PageQuery<'_>) -> Result<Value, SourceError> {
        let url = self.page_url(&query);
        debug!(selection = query.selection, before = ?query.before, "fetching page");

        let response = self.client.get(&url).send().await.map_err(|err| {
            if err.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::Transport(err.to_string())
            }
        })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::Malformed(err.to_string())
            }
        })?;

        // The envelope carries the authoritative error; check it even on
        // non-2xx replies so scope failures surface as such.
        check_envelope(query.selection, &body)?;

        if !status.is_success() {
            return Err(SourceError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}"),
            });
        }

        // Exhausted history comes back as a missing or null selection key.
        Ok(body
            .get(query.selection)
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpRecordSource {
        HttpRecordSource::new(HttpSourceConfig {
            api_key: "test-key".to_string(),
            faction_id: "4242".to_string(),
            comment: "test_comment".to_string(),
            ..HttpSourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_live_page_url() {
        let url = source().page_url(&PageQuery::live("armorynews", None));
        assert_eq!(
            url,
            "https://api.torn.com/faction/4242?selections=armorynews&striptags=true&comment=test_comment"
        );
    }

    #[test]
    fn test_cursor_page_url_carries_to_param() {
        let url = source().page_url(&PageQuery::before("fundsnews", None, 1_700_000_000));
        assert!(url.ends_with("&to=1700000000"), "{url}");
    }

    #[test]
    fn test_category_param() {
        let url = source().page_url(&PageQuery::live("crimes", Some("completed")));
        assert!(url.contains("&cat=completed"), "{url}");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let src = HttpRecordSource::new(HttpSourceConfig {
            base_url: "https://api.torn.com/".to_string(),
            api_key: "k".to_string(),
            faction_id: "1".to_string(),
            ..HttpSourceConfig::default()
        })
        .unwrap();
        let url = src.page_url(&PageQuery::live("crimes", None));
        assert!(url.starts_with("https://api.torn.com/faction/1?"), "{url}");
    }
}
