// src/error.rs
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error taxonomy for a dataset run.
///
/// `UnsupportedFormat` and `Extraction` abort the whole run before any
/// output file exists; everything else is recovered at chunk granularity.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("completion endpoint returned {status}: {body}")]
    Request { status: u16, body: String },

    #[error("no usable records in model reply: {0}")]
    Parse(String),

    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether this failure aborts the run instead of a single chunk.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_) | Self::Extraction(_))
    }
}
