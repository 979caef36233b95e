//! Pipeline error taxonomy.
//!
//! Fatal failure classes: configuration (before any I/O),
//! acquisition (artifact fetch), stream (decompress/parse mid-run), and
//! output-path I/O (CSV sink, progress marker). Enrichment failures are not
//! represented here because the pipeline recovers from them per record.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::csv_sink::SinkError;
use crate::progress::ProgressError;

use super::acquire::AcquisitionError;
use super::stream::StreamError;

/// Fatal errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required setting is missing; nothing was touched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The source artifact could not be fetched; no progress state changed.
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Decompression or parsing failed mid-stream; the last committed
    /// progress marker remains the valid resume point.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Appending to the CSV output failed; aborted immediately.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Reading or committing the progress marker failed; aborted immediately.
    #[error(transparent)]
    Progress(#[from] ProgressError),

    /// The run-decision provider failed (e.g. stdin closed mid-prompt).
    #[error("failed to obtain run decision: {0}")]
    Decision(#[source] io::Error),

    /// Checking for the local artifact failed.
    #[error("failed to check for local artifact: {0}")]
    ArtifactCheck(#[source] io::Error),
}
