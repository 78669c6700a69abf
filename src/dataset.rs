// src/dataset.rs
// Per-run line-delimited JSON output. The file name carries the run id so
// separate runs can never accumulate into one another's output.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PipelineResult;
use crate::record::Record;

/// Appends records to `dataset-<run_id>.jsonl`, one JSON object per line.
///
/// The file is opened once per run in append mode and flushed after each
/// batch, so records from completed chunks survive a later chunk's failure.
/// No deduplication and no torn-write protection.
pub struct DatasetWriter {
    file: File,
    path: PathBuf,
}

impl DatasetWriter {
    pub fn create(dir: &Path, run_id: &str) -> PipelineResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("dataset-{}.jsonl", run_id));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Opened dataset file");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one batch of records and flushes. Returns the count written.
    pub fn append(&mut self, records: &[Record]) -> PipelineResult<usize> {
        for record in records {
            let line = serde_json::to_string(record)?;
            self.file.write_all(line.as_bytes())?;
            self.file.write_all(b"\n")?;
        }
        self.file.flush()?;
        debug!(count = records.len(), "Appended records");
        Ok(records.len())
    }
}
