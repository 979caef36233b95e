//! Serper web-search client.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::EnrichError;

/// Production Serper endpoint.
pub const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";

/// Maximum number of organic hits passed on to classification.
const MAX_HITS: usize = 5;

/// One organic search result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    /// Result title.
    #[serde(default)]
    pub title: String,
    /// Result URL.
    #[serde(default)]
    pub link: String,
    /// Result snippet text.
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

/// Thin wrapper over the Serper search API.
#[derive(Debug, Clone)]
pub struct SerperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerperClient {
    /// Creates a client against the production endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_SERPER_BASE_URL)
    }

    /// Creates a client against a custom endpoint (tests).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Searches for a company name, returning at most the first five organic
    /// hits.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] on transport failure or a non-success status.
    #[instrument(level = "debug", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, EnrichError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": MAX_HITS }))
            .send()
            .await
            .map_err(|source| EnrichError::Network {
                service: "serper",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::ApiStatus {
                service: "serper",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse =
            response
                .json()
                .await
                .map_err(|source| EnrichError::Network {
                    service: "serper",
                    source,
                })?;

        let mut hits = parsed.organic;
        hits.truncate(MAX_HITS);
        debug!(query, hits = hits.len(), "search complete");
        Ok(hits)
    }
}
