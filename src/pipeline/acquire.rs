//! Source artifact acquisition.
//!
//! Downloads the gzip-compressed registry export to its fixed local path,
//! streaming chunks to disk so the artifact never has to fit in memory. The
//! download goes to a `.part` sibling and is renamed into place only after
//! the byte count checks out, so a crashed or truncated download is never
//! mistaken for a complete artifact on the next run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, instrument};

/// Connect timeout for the artifact download.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Errors from artifact acquisition.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Network-level failure (DNS, connection, TLS, mid-stream transport).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The artifact URL.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The artifact URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Filesystem failure while writing the artifact.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Downloaded size does not match the server's Content-Length.
    #[error("truncated download of {url}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Truncated {
        /// The artifact URL.
        url: String,
        /// Bytes promised by Content-Length.
        expected_bytes: u64,
        /// Bytes actually received.
        actual_bytes: u64,
    },
}

/// Streams the source artifact from its URL to a fixed local path.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl Default for ArtifactFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactFetcher {
    /// Creates a fetcher with a progress bar on the download.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration, which does not happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            show_progress: true,
        }
    }

    /// Disables the terminal progress bar (tests, non-interactive runs).
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Downloads `url` to `dest`, overwriting any existing artifact.
    ///
    /// Blocks until the download is complete; stream processing must not
    /// start on a partial artifact.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError`] on HTTP failure, a non-success status,
    /// filesystem failure, or a byte count short of Content-Length.
    #[instrument(level = "debug", skip(self), fields(dest = %dest.display()))]
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquisitionError> {
        info!(url, dest = %dest.display(), "downloading source artifact");

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AcquisitionError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| AcquisitionError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        let progress = self.progress_bar(content_length, dest);

        // Write to a .part sibling; rename only once the stream is complete.
        let part_path = part_path(dest);
        let file = File::create(&part_path)
            .await
            .map_err(|source| AcquisitionError::Io {
                path: part_path.clone(),
                source,
            })?;
        let mut writer = BufWriter::new(file);

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| AcquisitionError::Network {
                url: url.to_string(),
                source,
            })?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|source| AcquisitionError::Io {
                    path: part_path.clone(),
                    source,
                })?;
            downloaded += chunk.len() as u64;
            if let Some(bar) = &progress {
                bar.set_position(downloaded);
            }
        }

        writer
            .flush()
            .await
            .map_err(|source| AcquisitionError::Io {
                path: part_path.clone(),
                source,
            })?;

        if let Some(expected_bytes) = content_length {
            if downloaded != expected_bytes {
                return Err(AcquisitionError::Truncated {
                    url: url.to_string(),
                    expected_bytes,
                    actual_bytes: downloaded,
                });
            }
        }

        tokio::fs::rename(&part_path, dest)
            .await
            .map_err(|source| AcquisitionError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
        info!(bytes = downloaded, "artifact download complete");
        Ok(())
    }

    fn progress_bar(&self, content_length: Option<u64>, dest: &Path) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let bar = ProgressBar::new(content_length.unwrap_or(0));
        let style = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .ok()?;
        bar.set_style(style.progress_chars("#>-"));
        bar.set_message(format!("Downloading {}", dest.display()));
        Some(bar)
    }
}

/// Sibling path used while the download is in flight.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map_or_else(
        || std::ffi::OsString::from("artifact"),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("data/source.json.gz")),
            PathBuf::from("data/source.json.gz.part")
        );
    }
}
