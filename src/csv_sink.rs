//! Append-only CSV output.
//!
//! The sink owns header management: a fresh run truncates the file and writes
//! the header row; a resumed run appends, writing the header only when the
//! file does not exist yet. Rows are never updated or deleted. Quoting
//! follows the `csv` crate's RFC rules (fields containing the delimiter, a
//! quote, or a newline are quoted, with embedded quotes doubled).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::extract::CompanyRow;

/// Ordered CSV column names; must match [`CompanyRow`] field order.
pub const CSV_HEADER: [&str; 8] = [
    "organisasjonsnummer",
    "navn",
    "adresse",
    "postnummer",
    "epostadresse",
    "telefon",
    "mobil",
    "company_website",
];

/// Errors from CSV output.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem failure on the output file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The output file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Row serialization failed.
    #[error("CSV serialization error for {path}: {source}")]
    Csv {
        /// The output file path.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

/// Append-only CSV writer with header management.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates a sink for the given output file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The output file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepares the output file for a run.
    ///
    /// When `append` is false the file is truncated and rewritten with the
    /// header row only, discarding any prior output. When `append` is true
    /// existing content is kept; the header is written only if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] on any filesystem or serialization failure.
    pub fn initialize(&self, append: bool) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        if append && self.path.exists() {
            debug!(path = %self.path.display(), "appending to existing CSV");
            return Ok(());
        }

        let file = std::fs::File::create(&self.path).map_err(|source| self.io_error(source))?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(CSV_HEADER)
            .map_err(|source| self.csv_error(source))?;
        writer
            .flush()
            .map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), "CSV initialized with header");
        Ok(())
    }

    /// Appends one serialized row and flushes it to disk.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] on any filesystem or serialization failure; the
    /// caller treats this as fatal.
    pub fn append_row(&self, row: &CompanyRow) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(row)
            .map_err(|source| self.csv_error(source))?;
        writer.flush().map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> SinkError {
        SinkError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_row() -> CompanyRow {
        CompanyRow {
            organisasjonsnummer: "918654062".to_string(),
            navn: "Fjellheim Bakeri AS".to_string(),
            adresse: "Storgata 1, 7013 TRONDHEIM".to_string(),
            postnummer: "7013".to_string(),
            epostadresse: "post@fjellheim.no".to_string(),
            telefon: "73520000".to_string(),
            mobil: String::new(),
            company_website: "https://fjellheim.no".to_string(),
        }
    }

    #[test]
    fn test_initialize_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        sink.initialize(false).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, format!("{}\n", CSV_HEADER.join(",")));
    }

    #[test]
    fn test_initialize_truncates_when_not_appending() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        sink.initialize(false).unwrap();
        sink.append_row(&sample_row()).unwrap();

        sink.initialize(false).unwrap();
        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_initialize_append_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        sink.initialize(false).unwrap();
        sink.append_row(&sample_row()).unwrap();

        sink.initialize(true).unwrap();
        sink.append_row(&sample_row()).unwrap();
        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_initialize_append_writes_header_when_file_absent() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        sink.initialize(true).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content, format!("{}\n", CSV_HEADER.join(",")));
    }

    #[test]
    fn test_quoting_round_trip() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        sink.initialize(false).unwrap();

        let mut row = sample_row();
        row.navn = "Comma, \"Quote\" and\nNewline AS".to_string();
        sink.append_row(&row).unwrap();

        let raw = std::fs::read_to_string(sink.path()).unwrap();
        assert!(raw.contains("\"Comma, \"\"Quote\"\" and\nNewline AS\""));

        let mut reader = csv::Reader::from_path(sink.path()).unwrap();
        let parsed: CompanyRow = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn test_append_without_initialize_fails() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));
        let err = sink.append_row(&sample_row()).unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
    }

    #[test]
    fn test_header_matches_row_field_order() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(sample_row()).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header_line = text.lines().next().unwrap();
        assert_eq!(header_line, CSV_HEADER.join(","));
    }
}
