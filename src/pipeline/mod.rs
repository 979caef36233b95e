//! Resumable streaming-ingestion pipeline.
//!
//! The pipeline acquires the registry artifact (or reuses the local copy),
//! walks it as an incremental stream of `(index, record)` pairs, and for each
//! record past the resume point extracts fields, enriches them with a website
//! guess, appends the row to the CSV sink, and only then commits the progress
//! marker. That ordering is the core correctness guarantee: a crash can at
//! worst leave one appended row whose index the marker does not yet cover,
//! which the next resume reprocesses as a single duplicate - never a gap.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use brreg_enrich::prompt::{ScriptedDecision, RunDecision};
//! use brreg_enrich::{Config, IngestionPipeline, NoopEnricher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env(None, None)?;
//! let pipeline = IngestionPipeline::new(
//!     config,
//!     Arc::new(NoopEnricher),
//!     Arc::new(ScriptedDecision(RunDecision::Resume)),
//! );
//! let summary = pipeline.run().await?;
//! println!("processed {} new rows", summary.processed_count);
//! # Ok(())
//! # }
//! ```

mod acquire;
mod error;
mod stream;

use std::sync::Arc;

use tracing::{info, warn};

pub use acquire::{AcquisitionError, ArtifactFetcher};
pub use error::PipelineError;
pub use stream::{IndexedRecord, RecordStream, StreamError};

use crate::config::{Config, ConfigError};
use crate::csv_sink::CsvSink;
use crate::enrich::Enricher;
use crate::extract::{CompanyRow, extract_row};
use crate::progress::ProgressStore;
use crate::prompt::{DecisionProvider, RunDecision};

/// Observer invoked after each record's checkpoint commit.
pub type ProgressObserver = Box<dyn Fn(u64, &CompanyRow) + Send + Sync>;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Last 0-based index whose row is durably in the CSV; `-1` for an
    /// empty artifact.
    pub last_processed_index: i64,
    /// Number of rows appended by this run (skipped records not counted).
    pub processed_count: u64,
}

/// Orchestrates acquisition, streaming, sequencing, enrichment, output, and
/// checkpointing.
pub struct IngestionPipeline {
    config: Config,
    fetcher: ArtifactFetcher,
    progress: ProgressStore,
    sink: CsvSink,
    enricher: Arc<dyn Enricher>,
    decisions: Arc<dyn DecisionProvider>,
    observer: Option<ProgressObserver>,
}

impl IngestionPipeline {
    /// Creates a pipeline over the configured paths.
    #[must_use]
    pub fn new(
        config: Config,
        enricher: Arc<dyn Enricher>,
        decisions: Arc<dyn DecisionProvider>,
    ) -> Self {
        let progress = ProgressStore::new(&config.paths.progress_file);
        let sink = CsvSink::new(&config.paths.output_csv);
        Self {
            config,
            fetcher: ArtifactFetcher::new(),
            progress,
            sink,
            enricher,
            decisions,
            observer: None,
        }
    }

    /// Replaces the artifact fetcher (e.g. a quiet one for tests).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: ArtifactFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Registers an observer called with `(index, row)` after each
    /// checkpoint commit.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Runs the pipeline once.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] on any fatal failure; see the error type for
    /// the taxonomy. Enrichment failures are recovered per record and do not
    /// fail the run.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        if self.config.artifact_url.trim().is_empty() {
            return Err(ConfigError::MissingArtifactUrl.into());
        }

        let resume_from = self.prepare_run().await?;

        let marker = self.progress.load().await?;
        let mut last_processed_index = marker.map_or(-1, |m| m.processed_index);
        let mut processed_count: u64 = 0;

        info!(
            artifact = %self.config.paths.artifact.display(),
            resume_from,
            "processing registry records"
        );

        let mut records = RecordStream::open(self.config.paths.artifact.clone());
        while let Some(item) = records.next().await {
            let (index, record) = item?;

            if index < resume_from {
                continue;
            }

            let row = self.process_record(index, &record).await;
            self.sink.append_row(&row)?;

            // The marker commit must follow the durable CSV append; a crash
            // between the two reprocesses at most this one record.
            last_processed_index = i64::try_from(index).unwrap_or(i64::MAX);
            self.progress.save(last_processed_index, None).await?;
            processed_count += 1;

            info!(
                index,
                navn = %row.navn,
                organisasjonsnummer = %row.organisasjonsnummer,
                website = %row.company_website,
                "record processed"
            );
            if let Some(observer) = &self.observer {
                observer(index, &row);
            }
        }

        // Final marker records the artifact length as a display hint; it is
        // written even when this run appended nothing new.
        let total_count = u64::try_from(last_processed_index + 1).unwrap_or(0);
        self.progress
            .save(last_processed_index, Some(total_count))
            .await?;

        info!(
            last_processed_index,
            processed_count, "pipeline run complete"
        );
        Ok(RunSummary {
            last_processed_index,
            processed_count,
        })
    }

    /// Decides between full refresh and resume, acquires the artifact if
    /// needed, and prepares the CSV sink. Returns the resume index.
    async fn prepare_run(&self) -> Result<u64, PipelineError> {
        let artifact = &self.config.paths.artifact;
        let artifact_exists = tokio::fs::try_exists(artifact)
            .await
            .map_err(PipelineError::ArtifactCheck)?;

        if !artifact_exists {
            // Nothing to ask about: fetch unconditionally and start fresh.
            info!("no local artifact; downloading");
            self.fetcher.fetch(&self.config.artifact_url, artifact).await?;
            self.sink.initialize(false)?;
            return Ok(0);
        }

        let decision = self
            .decisions
            .run_decision()
            .await
            .map_err(PipelineError::Decision)?;

        match decision {
            RunDecision::FullRefresh => {
                info!("full refresh: resetting progress and re-downloading");
                self.progress.clear().await?;
                self.sink.initialize(false)?;
                self.fetcher.fetch(&self.config.artifact_url, artifact).await?;
                Ok(0)
            }
            RunDecision::Resume => {
                info!("resume: keeping local artifact");
                let marker = self.progress.load().await?;
                let resume_from = marker.as_ref().map_or(0, crate::ProgressMarker::resume_index);
                // Header is written only if the CSV is absent; an interrupted
                // run's rows stay in place.
                self.sink.initialize(resume_from > 0)?;
                if resume_from > 0 {
                    info!(resume_from, "resuming past already-processed records");
                }
                Ok(resume_from)
            }
        }
    }

    /// Extracts and enriches one record. Enrichment failure is logged and
    /// leaves the website empty; it never fails the run.
    async fn process_record(&self, index: u64, record: &crate::RegistryRecord) -> CompanyRow {
        let mut row = extract_row(record);

        if !row.navn.is_empty() {
            match self.enricher.enrich(&row.navn).await {
                Ok(website) => row.company_website = website,
                Err(e) => {
                    warn!(
                        index,
                        navn = %row.navn,
                        error = %e,
                        "enrichment failed; leaving website empty"
                    );
                }
            }
        }

        row
    }
}
