//! Shared helpers for integration tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use brreg_enrich::enrich::{EnrichError, Enricher};
use brreg_enrich::{Config, Paths};
use flate2::Compression;
use flate2::write::GzEncoder;

/// Gzips a JSON array body the way the registry export is served.
pub fn gz_bytes(json: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Writes a gzipped JSON array artifact to disk, creating parent dirs.
pub fn write_gz_artifact(path: &Path, json: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create artifact dir");
    }
    std::fs::write(path, gz_bytes(json)).expect("write artifact");
}

/// Builds a config rooted in a temp directory, with enrichment keys unset
/// and no inter-request delay.
pub fn test_config(data_dir: &Path, artifact_url: &str) -> Config {
    Config {
        artifact_url: artifact_url.to_string(),
        serper_api_key: String::new(),
        openai_api_key: String::new(),
        request_delay: Duration::ZERO,
        paths: Paths::in_dir(data_dir),
    }
}

/// Enricher that answers from a fixed name -> website table.
pub struct StaticEnricher {
    websites: HashMap<String, String>,
    /// Names the enricher was asked about, in call order.
    pub calls: Mutex<Vec<String>>,
}

impl StaticEnricher {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            websites: entries
                .iter()
                .map(|(name, url)| ((*name).to_string(), (*url).to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Enricher for StaticEnricher {
    async fn enrich(&self, name: &str) -> Result<String, EnrichError> {
        self.calls.lock().expect("calls lock").push(name.to_string());
        Ok(self.websites.get(name).cloned().unwrap_or_default())
    }
}

/// Enricher that fails every call, for the non-fatal-failure path.
pub struct FailingEnricher;

#[async_trait]
impl Enricher for FailingEnricher {
    async fn enrich(&self, _name: &str) -> Result<String, EnrichError> {
        Err(EnrichError::ApiStatus {
            service: "serper",
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

/// Reads the CSV back as (header, rows-of-fields).
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let header = reader
        .headers()
        .expect("csv header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("csv record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (header, rows)
}
