//! Incremental decompress + parse stream over the source artifact.
//!
//! The decompressed artifact is a single top-level JSON array, far too large
//! to load whole. [`RecordStream`] walks it record by record: a blocking task
//! reads the gzip file through [`GzDecoder`] and deserializes one array
//! element at a time, handing `(index, record)` pairs over a bounded channel
//! of capacity one. The consumer therefore controls pacing: the producer
//! cannot run ahead until the previous record's append and checkpoint have
//! completed and the next pair is received. That backpressure is the
//! pause/resume contract the checkpoint ordering depends on.
//!
//! The array is always walked from index 0; the format gives no random
//! access, so resume skipping is a logical filter in the pipeline, not a
//! seek here.

use std::io::Read;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::extract::RegistryRecord;

/// One yielded element: 0-based array index plus the parsed record.
pub type IndexedRecord = (u64, RegistryRecord);

/// Errors from decompression or parsing, all fatal to the run.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading the artifact failed (includes gzip corruption and truncation,
    /// which surface as I/O errors from the decoder).
    #[error("IO error reading artifact {path}: {source}")]
    Io {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An array element failed to parse as JSON.
    #[error("malformed JSON at record {index} in {path}: {source}")]
    Json {
        /// The artifact path.
        path: PathBuf,
        /// Index of the element that failed.
        index: u64,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The decompressed content does not start with a JSON array.
    #[error("artifact {path} is not a JSON array (leading byte {byte:#04x})")]
    NotAnArray {
        /// The artifact path.
        path: PathBuf,
        /// The offending byte.
        byte: u8,
    },

    /// A byte other than `,` or `]` followed a complete element.
    #[error("unexpected byte {byte:#04x} after record {index} in {path}")]
    UnexpectedByte {
        /// The artifact path.
        path: PathBuf,
        /// Index of the last complete element.
        index: u64,
        /// The offending byte.
        byte: u8,
    },

    /// The stream ended before the closing `]`.
    #[error("artifact {path} ended unexpectedly (truncated stream)")]
    Truncated {
        /// The artifact path.
        path: PathBuf,
    },
}

/// Parser state between elements.
enum IterState {
    /// Nothing consumed yet; expect `[`.
    Start,
    /// Inside the array; expect `,` or `]`.
    InArray,
    /// Closing `]` seen (or a fatal error emitted).
    Done,
}

/// Pull-based iterator over the elements of a JSON array read from `R`.
///
/// Deserializes exactly one element per step; never buffers more than the
/// current element.
struct JsonArrayIter<R: Read> {
    reader: R,
    path: PathBuf,
    index: u64,
    state: IterState,
}

impl<R: Read> JsonArrayIter<R> {
    fn new(reader: R, path: PathBuf) -> Self {
        Self {
            reader,
            path,
            index: 0,
            state: IterState::Start,
        }
    }

    /// Reads the next non-whitespace byte, `None` at end of stream.
    fn next_byte(&mut self) -> Result<Option<u8>, StreamError> {
        let mut buf = [0u8; 1];
        loop {
            let n = self
                .reader
                .read(&mut buf)
                .map_err(|source| StreamError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            if n == 0 {
                return Ok(None);
            }
            if !buf[0].is_ascii_whitespace() {
                return Ok(Some(buf[0]));
            }
        }
    }

    /// Deserializes one element, optionally re-injecting a byte that was
    /// consumed while looking for the array delimiter.
    fn parse_element(&mut self, first: Option<u8>) -> Result<RegistryRecord, StreamError> {
        let index = self.index;
        let path = self.path.clone();
        let json_err = |source| StreamError::Json {
            path,
            index,
            source,
        };

        match first {
            Some(byte) => {
                let reader = std::io::Cursor::new([byte]).chain(&mut self.reader);
                let mut de = serde_json::Deserializer::from_reader(reader);
                RegistryRecord::deserialize(&mut de).map_err(json_err)
            }
            None => {
                let mut de = serde_json::Deserializer::from_reader(&mut self.reader);
                RegistryRecord::deserialize(&mut de).map_err(json_err)
            }
        }
    }

    fn step(&mut self) -> Result<Option<IndexedRecord>, StreamError> {
        match self.state {
            IterState::Done => Ok(None),
            IterState::Start => {
                match self.next_byte()? {
                    None => Err(StreamError::Truncated {
                        path: self.path.clone(),
                    }),
                    Some(b'[') => {
                        // Distinguish an empty array from the first element.
                        match self.next_byte()? {
                            None => Err(StreamError::Truncated {
                                path: self.path.clone(),
                            }),
                            Some(b']') => {
                                self.state = IterState::Done;
                                Ok(None)
                            }
                            Some(byte) => {
                                let record = self.parse_element(Some(byte))?;
                                self.state = IterState::InArray;
                                let index = self.index;
                                self.index += 1;
                                Ok(Some((index, record)))
                            }
                        }
                    }
                    Some(byte) => Err(StreamError::NotAnArray {
                        path: self.path.clone(),
                        byte,
                    }),
                }
            }
            IterState::InArray => match self.next_byte()? {
                None => Err(StreamError::Truncated {
                    path: self.path.clone(),
                }),
                Some(b',') => {
                    let record = self.parse_element(None)?;
                    let index = self.index;
                    self.index += 1;
                    Ok(Some((index, record)))
                }
                Some(b']') => {
                    self.state = IterState::Done;
                    Ok(None)
                }
                Some(byte) => Err(StreamError::UnexpectedByte {
                    path: self.path.clone(),
                    index: self.index.saturating_sub(1),
                    byte,
                }),
            },
        }
    }
}

impl<R: Read> Iterator for JsonArrayIter<R> {
    type Item = Result<IndexedRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                self.state = IterState::Done;
                Some(Err(e))
            }
        }
    }
}

/// Async handle over the blocking decompress+parse producer.
///
/// Yields `(index, record)` pairs in strictly ascending index order starting
/// at 0. After an `Err` the stream yields nothing further.
pub struct RecordStream {
    rx: mpsc::Receiver<Result<IndexedRecord, StreamError>>,
    // Held so the producer is tied to the stream's lifetime; dropping the
    // stream closes the channel and the task winds down on its next send.
    _producer: tokio::task::JoinHandle<()>,
}

impl RecordStream {
    /// Opens the artifact and starts the producer task.
    ///
    /// A missing or unreadable file is reported as the first yielded item,
    /// not here; opening happens on the blocking task.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        // Capacity 1: the producer parses at most one record ahead of the
        // consumer's checkpoint commit.
        let (tx, rx) = mpsc::channel(1);

        let producer = tokio::task::spawn_blocking(move || {
            let file = match std::fs::File::open(&path) {
                Ok(file) => file,
                Err(source) => {
                    let _ = tx.blocking_send(Err(StreamError::Io { path, source }));
                    return;
                }
            };

            let decoder = GzDecoder::new(std::io::BufReader::new(file));
            let iter = JsonArrayIter::new(std::io::BufReader::new(decoder), path.clone());

            for item in iter {
                let is_err = item.is_err();
                // A closed channel means the consumer gave up; stop parsing.
                if tx.blocking_send(item).is_err() {
                    debug!(path = %path.display(), "record stream consumer dropped");
                    return;
                }
                if is_err {
                    return;
                }
            }
        });

        Self {
            rx,
            _producer: producer,
        }
    }

    /// Receives the next pair, or `None` when the array is exhausted.
    pub async fn next(&mut self) -> Option<Result<IndexedRecord, StreamError>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str) -> Vec<Result<IndexedRecord, StreamError>> {
        JsonArrayIter::new(Cursor::new(input.as_bytes().to_vec()), PathBuf::from("test")).collect()
    }

    #[test]
    fn test_empty_array_yields_nothing() {
        assert!(collect("[]").is_empty());
        assert!(collect("  [ \n ]  ").is_empty());
    }

    #[test]
    fn test_elements_yield_ascending_indices() {
        let items = collect(r#"[{"navn":"A"}, {"navn":"B"},{"navn":"C"}]"#);
        let parsed: Vec<_> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].0, 0);
        assert_eq!(parsed[0].1.navn.as_deref(), Some("A"));
        assert_eq!(parsed[1].0, 1);
        assert_eq!(parsed[2].0, 2);
        assert_eq!(parsed[2].1.navn.as_deref(), Some("C"));
    }

    #[test]
    fn test_whitespace_between_elements_is_tolerated() {
        let items = collect("[\n  {\"navn\": \"A\"} ,\n\t{\"navn\": \"B\"}\n]");
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_ok));
    }

    #[test]
    fn test_non_array_input_is_rejected() {
        let mut items = collect(r#"{"navn":"A"}"#);
        assert!(matches!(
            items.remove(0),
            Err(StreamError::NotAnArray { byte: b'{', .. })
        ));
    }

    #[test]
    fn test_truncated_array_is_an_error() {
        let items = collect(r#"[{"navn":"A"}"#);
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(StreamError::Truncated { .. })));
    }

    #[test]
    fn test_malformed_element_reports_index() {
        let items = collect(r#"[{"navn":"A"}, {bogus}]"#);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(StreamError::Json { index, .. }) => assert_eq!(*index, 1),
            other => panic!("expected Json error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_separator_is_rejected() {
        let items = collect(r#"[{"navn":"A"} {"navn":"B"}]"#);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(StreamError::UnexpectedByte { byte: b'{', .. })
        ));
    }

    #[test]
    fn test_iteration_stops_after_error() {
        let items = collect(r#"[{bogus}, {"navn":"B"}]"#);
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn test_record_stream_over_gzip_file() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("source.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(br#"[{"navn":"Acme AS"},{"navn":"Fjell AS"}]"#)
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut stream = RecordStream::open(path);
        let (i0, r0) = stream.next().await.unwrap().unwrap();
        assert_eq!((i0, r0.navn.as_deref()), (0, Some("Acme AS")));
        let (i1, r1) = stream.next().await.unwrap().unwrap();
        assert_eq!((i1, r1.navn.as_deref()), (1, Some("Fjell AS")));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_record_stream_missing_file_yields_io_error() {
        let mut stream = RecordStream::open(PathBuf::from("/nonexistent/source.json.gz"));
        assert!(matches!(
            stream.next().await,
            Some(Err(StreamError::Io { .. }))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_record_stream_truncated_gzip_yields_error() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("source.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(br#"[{"navn":"Acme AS"},{"navn":"Fjell AS"}]"#)
            .unwrap();
        let full = encoder.finish().unwrap();
        // Drop the tail of the compressed stream, trailer included.
        std::fs::write(&path, &full[..full.len() / 2]).unwrap();

        let mut stream = RecordStream::open(path);
        let mut saw_error = false;
        while let Some(item) = stream.next().await {
            if item.is_err() {
                saw_error = true;
                break;
            }
        }
        assert!(saw_error, "truncated gzip must surface a stream error");
    }
}
