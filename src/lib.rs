//! Registry Website Enrichment Library
//!
//! This library enriches the Norwegian business registry export
//! (Brønnøysund `enheter` JSON array) with a best-guess official website
//! per company, writing the result to a CSV file with crash-resumable,
//! index-based progress tracking.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`pipeline`] - Resumable streaming-ingestion pipeline (the core)
//! - [`progress`] - Progress marker persistence for resume support
//! - [`extract`] - Pure record-to-row field extraction
//! - [`enrich`] - Search + classification website lookup
//! - [`csv_sink`] - Append-only CSV output with header management
//! - [`prompt`] - Run-decision capability (terminal or scripted)
//! - [`config`] - Environment-backed configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod csv_sink;
pub mod enrich;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod prompt;

// Re-export commonly used types
pub use config::{Config, ConfigError, Paths};
pub use csv_sink::{CSV_HEADER, CsvSink, SinkError};
pub use enrich::{EnrichError, Enricher, NoopEnricher, WebEnricher};
pub use extract::{CompanyRow, RegistryRecord, extract_row};
pub use pipeline::{
    AcquisitionError, ArtifactFetcher, IngestionPipeline, PipelineError, RecordStream, RunSummary,
    StreamError,
};
pub use progress::{ProgressError, ProgressMarker, ProgressStore};
pub use prompt::{DecisionProvider, RunDecision, ScriptedDecision, TerminalPrompt};
