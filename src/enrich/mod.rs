//! Website enrichment.
//!
//! Enrichment composes two external calls: a web search for the company name
//! ([`search::SerperClient`]) and a classification step that picks the best
//! matching URL from the hits ([`classify::WebsiteClassifier`]). Both are
//! plain HTTP wrappers; the selection policy lives in the classifier prompt
//! and is swappable without touching the pipeline.
//!
//! Enrichment failures are never fatal to a run: the pipeline logs them and
//! writes the row with an empty `company_website`.

mod classify;
mod search;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub use classify::{DEFAULT_OPENAI_BASE_URL, WebsiteClassifier};
pub use search::{DEFAULT_SERPER_BASE_URL, SearchHit, SerperClient};

/// Errors from the search or classification calls.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Transport-level failure talking to an API.
    #[error("network error calling {service}: {source}")]
    Network {
        /// Which API failed (`serper` or `openai`).
        service: &'static str,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// An API answered with a non-success status.
    #[error("{service} API error {status}: {body}")]
    ApiStatus {
        /// Which API failed (`serper` or `openai`).
        service: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },

    /// An API answered 2xx but the body did not have the expected shape.
    #[error("malformed {service} response: {detail}")]
    MalformedResponse {
        /// Which API failed (`serper` or `openai`).
        service: &'static str,
        /// What was wrong with the body.
        detail: String,
    },
}

/// Produces a best-guess official website for one company name.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Returns a website URL, or an empty string when none was identified.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] on search or classification failure. The
    /// pipeline recovers from this per record.
    async fn enrich(&self, name: &str) -> Result<String, EnrichError>;
}

/// Search + classification enricher backed by the Serper and OpenAI APIs.
///
/// A fixed delay is slept before each external call to respect upstream rate
/// limits; calls are strictly sequential.
pub struct WebEnricher {
    search: SerperClient,
    classifier: WebsiteClassifier,
    delay: Duration,
}

impl WebEnricher {
    /// Creates an enricher from its two API clients and the inter-request
    /// delay.
    #[must_use]
    pub fn new(search: SerperClient, classifier: WebsiteClassifier, delay: Duration) -> Self {
        Self {
            search,
            classifier,
            delay,
        }
    }
}

#[async_trait]
impl Enricher for WebEnricher {
    async fn enrich(&self, name: &str) -> Result<String, EnrichError> {
        tokio::time::sleep(self.delay).await;
        let hits = self.search.search(name).await?;
        if hits.is_empty() {
            debug!(company = name, "no search hits; skipping classification");
            return Ok(String::new());
        }

        tokio::time::sleep(self.delay).await;
        self.classifier.pick_website(name, &hits).await
    }
}

/// Enricher that never finds a website.
///
/// Used when the API keys are not configured, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnricher;

#[async_trait]
impl Enricher for NoopEnricher {
    async fn enrich(&self, _name: &str) -> Result<String, EnrichError> {
        Ok(String::new())
    }
}
