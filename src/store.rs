//! Tabular store access: input reading and checkpointed output appends.
//!
//! The store is CSV on disk. The input is read fully into memory exactly
//! once and drives the whole run. The output is strictly append-only: the
//! writer locates the true end of data by reading the store before every
//! append, so a pre-existing file from an earlier run is extended, never
//! rewritten.

use crate::error::PipelineResult;
use crate::models::{ArticleRecord, ProcessedRecord};
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Output store header, in column order.
pub const OUTPUT_COLUMNS: [&str; 5] = ["id", "title", "url", "processed_text", "description"];

/// Read the whole input store into memory.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn read_input(path: impl AsRef<Path>) -> PipelineResult<Vec<ArticleRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ArticleRecord = row?;
        records.push(record);
    }
    info!(count = records.len(), "Read input store");
    Ok(records)
}

/// Append-only writer for the output store.
///
/// Holds only the path; every append inspects the file on disk rather than
/// trusting in-process memory, since the store may pre-exist from a previous
/// run.
#[derive(Debug, Clone)]
pub struct CheckpointedWriter {
    path: PathBuf,
}

impl CheckpointedWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the store with a header row and no data rows if it does not
    /// exist yet. A non-empty store is left untouched.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub fn ensure_exists(&self) -> PipelineResult<()> {
        if self.data_rows()?.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(OUTPUT_COLUMNS)?;
        writer.flush()?;
        info!("Created empty output store");
        Ok(())
    }

    /// Append a batch of rows after the last populated row.
    ///
    /// The header is written only when the store is empty or missing. Prior
    /// rows are never rewritten. Returns the number of data rows in the
    /// store after the append.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub fn append(&self, records: &[ProcessedRecord]) -> PipelineResult<u64> {
        let existing = self.data_rows()?;
        if records.is_empty() {
            return Ok(existing.unwrap_or(0));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if existing.is_none() {
            writer.write_record(OUTPUT_COLUMNS)?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        let total = existing.unwrap_or(0) + records.len() as u64;
        info!(appended = records.len(), total_rows = total, "Saved processed rows");
        Ok(total)
    }

    /// Count of data rows currently in the store, or `None` when the file
    /// is missing or empty (i.e. the header still needs to be written).
    fn data_rows(&self) -> PipelineResult<Option<u64>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if metadata.len() == 0 {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut count = 0u64;
        for row in reader.records() {
            row?;
            count += 1;
        }
        Ok(Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> ProcessedRecord {
        ProcessedRecord {
            id: id.to_string(),
            title: format!("Title {id}"),
            url: format!("http://example.com/{id}"),
            processed_text: format!("<p>Body {id}</p>"),
            description: format!("Description {id}"),
        }
    }

    fn read_back(path: &Path) -> Vec<ProcessedRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().map(|row| row.unwrap()).collect()
    }

    #[test]
    fn test_ensure_exists_creates_header_only_store() {
        let dir = tempdir().unwrap();
        let writer = CheckpointedWriter::new(dir.path().join("out.csv"));
        writer.ensure_exists().unwrap();

        let contents = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents.trim(), "id,title,url,processed_text,description");
        assert!(read_back(writer.path()).is_empty());
    }

    #[test]
    fn test_ensure_exists_leaves_populated_store_untouched() {
        let dir = tempdir().unwrap();
        let writer = CheckpointedWriter::new(dir.path().join("out.csv"));
        writer.append(&[record("1")]).unwrap();

        writer.ensure_exists().unwrap();
        assert_eq!(read_back(writer.path()).len(), 1);
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempdir().unwrap();
        let writer = CheckpointedWriter::new(dir.path().join("out.csv"));

        assert_eq!(writer.append(&[record("1"), record("2")]).unwrap(), 2);
        assert_eq!(writer.append(&[record("3")]).unwrap(), 3);

        let contents = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents.matches("processed_text").count(), 1);

        let rows = read_back(writer.path());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], record("1"));
        assert_eq!(rows[2], record("3"));
    }

    #[test]
    fn test_append_extends_store_from_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        // First "run".
        CheckpointedWriter::new(&path)
            .append(&[record("1"), record("2")])
            .unwrap();

        // Second "run" with a fresh writer: must locate the true end of data.
        let writer = CheckpointedWriter::new(&path);
        assert_eq!(writer.append(&[record("3"), record("4")]).unwrap(), 4);

        let rows = read_back(&path);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[3].id, "4");
    }

    #[test]
    fn test_append_empty_batch_is_a_noop() {
        let dir = tempdir().unwrap();
        let writer = CheckpointedWriter::new(dir.path().join("out.csv"));
        writer.append(&[record("1")]).unwrap();

        assert_eq!(writer.append(&[]).unwrap(), 1);
        assert_eq!(read_back(writer.path()).len(), 1);
    }

    #[test]
    fn test_append_preserves_multiline_and_quoted_fields() {
        let dir = tempdir().unwrap();
        let writer = CheckpointedWriter::new(dir.path().join("out.csv"));
        let tricky = ProcessedRecord {
            id: "1".to_string(),
            title: "A title, with commas".to_string(),
            url: "http://example.com".to_string(),
            processed_text: "<p>line one</p>\n<p>\"quoted\"</p>".to_string(),
            description: "multi\nline".to_string(),
        };
        writer.append(std::slice::from_ref(&tricky)).unwrap();

        let rows = read_back(writer.path());
        assert_eq!(rows[0], tricky);
    }

    #[test]
    fn test_read_input_parses_rows_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(
            &path,
            "id,url,text\n1,http://a,<p>A</p>\n2,http://b,<p>B</p>\n",
        )
        .unwrap();

        let records = read_input(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[1].raw_text, "<p>B</p>");
    }

    #[test]
    fn test_read_input_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(read_input(dir.path().join("absent.csv")).is_err());
    }
}
