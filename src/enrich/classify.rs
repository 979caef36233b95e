//! Website classification via an OpenAI chat model.
//!
//! Given a company name and a handful of search hits, the model answers with
//! a single URL or `NONE`. Selection policy (encoded in the system prompt):
//! prefer the company's own official website, Norwegian domains when clearly
//! owned by the company, fall back to the company's Facebook page, and reject
//! business-directory domains such as proff.no and 1881.no.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::search::SearchHit;
use super::EnrichError;

/// Production OpenAI endpoint.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Chat model used for classification.
const MODEL: &str = "gpt-4o-mini";

/// Token cap for the answer; a URL never needs more.
const MAX_TOKENS: u32 = 200;

const SYSTEM_PROMPT: &str = "\
You are a tool that identifies the best URL for a Norwegian company from search results.
All companies are located in Norway. Prefer Norwegian websites (e.g. .no domains) when they clearly belong to the company.
Priority:
1) First choose the company's own official website (owned by the company, not a directory or aggregator).
2) If there is no clear official website, choose the company's Facebook page URL.
Always exclude domains like proff.no and 1881.no. These are business directories, not the company's own site.
Given a company name and a list of search results (title, URL, snippet), respond with ONLY the single URL that best matches the above priority.
If none of the results clearly match any of the above, respond with exactly: NONE
Do not include any explanation, only the URL or NONE.";

/// Matches a bare domain name the model sometimes answers instead of a URL.
#[allow(clippy::expect_used)]
static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}").expect("static regex is valid")
});

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Thin wrapper over the OpenAI chat-completions API.
#[derive(Debug, Clone)]
pub struct WebsiteClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WebsiteClassifier {
    /// Creates a classifier against the production endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL)
    }

    /// Creates a classifier against a custom endpoint (tests).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Asks the model which hit is most likely the company's own website.
    ///
    /// Returns an empty string when the model answers `NONE` or with
    /// something that does not normalize to a valid URL.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] on transport failure, a non-success status, or
    /// a response without any choices.
    #[instrument(level = "debug", skip(self, hits), fields(hits = hits.len()))]
    pub async fn pick_website(
        &self,
        company_name: &str,
        hits: &[SearchHit],
    ) -> Result<String, EnrichError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(company_name, hits) },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| EnrichError::Network {
                service: "openai",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::ApiStatus {
                service: "openai",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|source| EnrichError::Network {
                    service: "openai",
                    source,
                })?;

        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim())
            .ok_or_else(|| EnrichError::MalformedResponse {
                service: "openai",
                detail: "no choices in chat completion".to_string(),
            })?;

        let website = normalize_website(content);
        debug!(company = company_name, answer = content, website, "classified");
        Ok(website)
    }
}

/// Formats the user message: company name plus the numbered hit list.
fn user_prompt(company_name: &str, hits: &[SearchHit]) -> String {
    let mut prompt = format!("Country: Norway\nCompany name: {company_name}\n\nSearch results:\n");
    for (i, hit) in hits.iter().enumerate() {
        let _ = write!(
            prompt,
            "{}. Title: {}\n   URL: {}\n   Snippet: {}\n\n",
            i + 1,
            hit.title,
            hit.link,
            hit.snippet
        );
    }
    prompt
}

/// Normalizes a model answer into a validated URL, or empty.
///
/// `NONE` and anything that does not parse as a URL map to empty. A bare
/// domain is given an `https://` scheme.
fn normalize_website(answer: &str) -> String {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("none") {
        return String::new();
    }

    let has_scheme = answer
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"));
    let candidate = if has_scheme {
        answer.to_string()
    } else if BARE_DOMAIN.is_match(answer) {
        format!("https://{answer}")
    } else {
        return String::new();
    };

    match Url::parse(&candidate) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => candidate,
        _ => String::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_full_urls() {
        assert_eq!(
            normalize_website("https://fjellheim.no/om-oss"),
            "https://fjellheim.no/om-oss"
        );
        assert_eq!(normalize_website("http://acme.no"), "http://acme.no");
    }

    #[test]
    fn test_normalize_prefixes_bare_domains() {
        assert_eq!(normalize_website("acme.no"), "https://acme.no");
        assert_eq!(
            normalize_website("www.facebook.com/acmeas"),
            "https://www.facebook.com/acmeas"
        );
    }

    #[test]
    fn test_normalize_rejects_none_and_garbage() {
        assert_eq!(normalize_website("NONE"), "");
        assert_eq!(normalize_website("none"), "");
        assert_eq!(normalize_website(""), "");
        assert_eq!(normalize_website("I could not find a website"), "");
    }

    #[test]
    fn test_user_prompt_numbers_hits() {
        let hits = vec![
            SearchHit {
                title: "Acme AS".to_string(),
                link: "https://acme.no".to_string(),
                snippet: "Official site".to_string(),
            },
            SearchHit {
                title: "Acme AS - Proff".to_string(),
                link: "https://proff.no/acme".to_string(),
                snippet: "Directory".to_string(),
            },
        ];
        let prompt = user_prompt("Acme AS", &hits);
        assert!(prompt.contains("Company name: Acme AS"));
        assert!(prompt.contains("1. Title: Acme AS"));
        assert!(prompt.contains("2. Title: Acme AS - Proff"));
    }
}
