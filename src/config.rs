//! Environment-backed configuration.
//!
//! All settings come from the process environment (a `.env` file in the
//! working directory is loaded by the binary before parsing). The values are
//! collected once into an owned [`Config`] that is passed by reference into
//! the pipeline and its collaborators - there is no ambient global state.
//!
//! Required: `DATA_GZ_URL` (the registry artifact URL). Everything else has a
//! default or degrades gracefully (enrichment is disabled when either API key
//! is missing).

use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default delay between external API requests, in milliseconds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Default directory for the artifact, CSV output, and progress marker.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Filename of the downloaded registry artifact inside the data directory.
const ARTIFACT_FILENAME: &str = "source.json.gz";

/// Filename of the enriched CSV output inside the data directory.
const OUTPUT_CSV_FILENAME: &str = "companies.csv";

/// Filename of the progress marker inside the data directory.
const PROGRESS_FILENAME: &str = "progress.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The registry artifact URL is not set.
    #[error(
        "DATA_GZ_URL is not set or empty; set it in the environment or a .env file in the working directory"
    )]
    MissingArtifactUrl,

    /// An environment variable could not be parsed as an integer.
    #[error("invalid value {value:?} for {name}: {source}")]
    InvalidInteger {
        /// The environment variable name.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
        /// The underlying parse error.
        #[source]
        source: ParseIntError,
    },
}

/// Filesystem locations derived from the data directory.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Directory holding all data files.
    pub data_dir: PathBuf,
    /// Downloaded gzip artifact.
    pub artifact: PathBuf,
    /// Enriched CSV output.
    pub output_csv: PathBuf,
    /// Progress marker file.
    pub progress_file: PathBuf,
}

impl Paths {
    /// Derives all file paths from a data directory.
    #[must_use]
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            artifact: data_dir.join(ARTIFACT_FILENAME),
            output_csv: data_dir.join(OUTPUT_CSV_FILENAME),
            progress_file: data_dir.join(PROGRESS_FILENAME),
            data_dir,
        }
    }
}

/// Resolved configuration for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the gzip-compressed registry export.
    pub artifact_url: String,
    /// Serper API key; empty disables the search step.
    pub serper_api_key: String,
    /// OpenAI API key; empty disables the classification step.
    pub openai_api_key: String,
    /// Delay inserted before each external API request.
    pub request_delay: Duration,
    /// Filesystem locations.
    pub paths: Paths,
}

impl Config {
    /// Builds a configuration from the process environment.
    ///
    /// # Arguments
    ///
    /// * `data_dir_override` - CLI override for `DATA_DIR`
    /// * `request_delay_override` - CLI override for `REQUEST_DELAY_MS`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingArtifactUrl`] if `DATA_GZ_URL` is unset
    /// or empty, and [`ConfigError::InvalidInteger`] if `REQUEST_DELAY_MS`
    /// does not parse.
    pub fn from_env(
        data_dir_override: Option<&Path>,
        request_delay_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let artifact_url = env_or_default("DATA_GZ_URL");
        if artifact_url.trim().is_empty() {
            return Err(ConfigError::MissingArtifactUrl);
        }

        let request_delay_ms = match request_delay_override {
            Some(ms) => ms,
            None => parse_env_u64("REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS)?,
        };

        let data_dir = data_dir_override.map_or_else(
            || PathBuf::from(env_with_default("DATA_DIR", DEFAULT_DATA_DIR)),
            Path::to_path_buf,
        );

        Ok(Self {
            artifact_url: artifact_url.trim().to_string(),
            serper_api_key: env_or_default("SERPER_API_KEY"),
            openai_api_key: env_or_default("OPENAI_API_KEY"),
            request_delay: Duration::from_millis(request_delay_ms),
            paths: Paths::in_dir(data_dir),
        })
    }

    /// Whether both enrichment API keys are present.
    #[must_use]
    pub fn enrichment_configured(&self) -> bool {
        !self.serper_api_key.is_empty() && !self.openai_api_key.is_empty()
    }
}

/// Reads an environment variable, treating absence as an empty string.
fn env_or_default(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

/// Reads an environment variable with a fallback for absence or empty value.
fn env_with_default(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Parses an integer environment variable with a default for absence.
fn parse_env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidInteger {
                    name,
                    value,
                    source,
                })
        }
        _ => Ok(default),
    }
}
