//! Progress marker persistence.
//!
//! The marker is the sole source of truth for the resume position. Exactly
//! one marker exists at a time; it is read and written wholesale. Writes go
//! to a temp file followed by a rename, so no partially written marker is
//! ever observable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from progress marker I/O.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Reading or writing the marker file failed.
    #[error("IO error on progress marker {path}: {source}")]
    Io {
        /// The marker file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The marker file exists but does not parse.
    #[error("malformed progress marker {path}: {source}")]
    Malformed {
        /// The marker file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted resume state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMarker {
    /// Last 0-based index whose row was durably appended to the CSV.
    /// `-1` means nothing has been processed.
    pub processed_index: i64,
    /// Total records in the artifact, recorded on stream exhaustion.
    /// A hint for display only; never validated against the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    /// When the marker was last written.
    pub updated_at: DateTime<Utc>,
}

impl ProgressMarker {
    /// The index the next run should start processing from.
    #[must_use]
    pub fn resume_index(&self) -> u64 {
        // processed_index >= -1 always holds, so the +1 cannot underflow.
        u64::try_from(self.processed_index + 1).unwrap_or(0)
    }
}

/// Loads, saves, and clears the singleton progress marker file.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    /// Creates a store for the given marker file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The marker file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the marker, or `None` if no marker exists.
    ///
    /// # Errors
    ///
    /// Any I/O failure other than "file not found" is surfaced, as is a
    /// marker that exists but does not parse.
    pub async fn load(&self) -> Result<Option<ProgressMarker>, ProgressError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProgressError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let marker =
            serde_json::from_slice(&raw).map_err(|source| ProgressError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(marker))
    }

    /// Overwrites the marker with a new resume position.
    ///
    /// The marker is written to a sibling temp file and renamed into place,
    /// so a crash mid-write leaves the previous marker intact.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Io`] on any filesystem failure.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn save(
        &self,
        processed_index: i64,
        total_count: Option<u64>,
    ) -> Result<(), ProgressError> {
        let marker = ProgressMarker {
            processed_index,
            total_count,
            updated_at: Utc::now(),
        };
        // to_vec_pretty only fails on non-string map keys, which this struct
        // cannot produce.
        let body = serde_json::to_vec_pretty(&marker).map_err(|source| ProgressError::Io {
            path: self.path.clone(),
            source: std::io::Error::other(source),
        })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        debug!(processed_index, ?total_count, "progress marker saved");
        Ok(())
    }

    /// Removes the marker. Not an error if no marker exists.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Io`] on any filesystem failure other than
    /// "file not found".
    pub async fn clear(&self) -> Result<(), ProgressError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ProgressError {
        ProgressError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
