// src/pipeline.rs
// Per-document orchestration: detect format, extract, chunk, and process
// chunks in document order. One bad chunk never loses earlier progress.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::chunks;
use crate::completion::PairGenerator;
use crate::dataset::DatasetWriter;
use crate::error::PipelineResult;
use crate::extract::{extract_text, DocumentFormat};
use crate::record::extract_records;

pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const MIN_CHUNK_SIZE: usize = 500;

/// An uploaded document: raw bytes plus the declared file name.
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Inputs for one run, alongside the document itself.
pub struct RunOptions {
    pub chunk_size: usize,
    pub api_key: String,
    pub dataset_dir: PathBuf,
}

/// A failure confined to one chunk; the run continued past it.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailure {
    /// 1-based chunk position within the document.
    pub chunk: usize,
    pub message: String,
}

/// Outcome of a completed run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub dataset_file: String,
    #[serde(skip)]
    pub dataset_path: PathBuf,
    pub chunks_total: usize,
    pub chunks_failed: usize,
    pub records_written: usize,
    pub failures: Vec<ChunkFailure>,
}

/// Runs the whole pipeline for one document.
///
/// Returns `Err` only for failures that precede any chunk work (unsupported
/// format, extraction failure); in that case no output file exists. Once
/// chunk processing begins, per-chunk failures land in the report and the
/// run always reaches a report.
pub async fn run_pipeline(
    document: &Document,
    options: &RunOptions,
    generator: &dyn PairGenerator,
) -> PipelineResult<RunReport> {
    let extension = Path::new(&document.file_name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    let format = DocumentFormat::from_extension(&extension)
        .ok_or(crate::error::PipelineError::UnsupportedFormat(extension))?;
    info!(file = %document.file_name, ?format, "Starting dataset run");

    let text = extract_text(&document.bytes, format)?;
    info!(chars = text.chars().count(), "Text extracted");

    let run_id = Uuid::new_v4().to_string();
    let mut writer = DatasetWriter::create(&options.dataset_dir, &run_id)?;

    let mut failures = Vec::new();
    let mut records_written = 0;
    let mut chunks_total = 0;
    for (index, chunk) in chunks(&text, options.chunk_size).enumerate() {
        chunks_total += 1;
        match process_chunk(chunk, &options.api_key, generator, &mut writer).await {
            Ok(written) => records_written += written,
            Err(e) => {
                warn!(chunk = index + 1, error = %e, "Chunk failed, resuming with the next chunk");
                failures.push(ChunkFailure {
                    chunk: index + 1,
                    message: format!("{}. Processing resumed with the next chunk.", e),
                });
            }
        }
    }

    let report = RunReport {
        dataset_file: writer
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string(),
        dataset_path: writer.path().to_path_buf(),
        chunks_total,
        chunks_failed: failures.len(),
        records_written,
        failures,
        run_id,
    };
    info!(
        run_id = %report.run_id,
        chunks_total = report.chunks_total,
        chunks_failed = report.chunks_failed,
        records_written = report.records_written,
        "Run complete"
    );
    Ok(report)
}

/// One chunk's worth of work: generate, parse, append.
async fn process_chunk(
    chunk: &str,
    api_key: &str,
    generator: &dyn PairGenerator,
    writer: &mut DatasetWriter,
) -> PipelineResult<usize> {
    let reply = generator.generate(api_key, chunk).await?;
    let records = extract_records(&reply)?;
    writer.append(&records)
}
