pub mod api;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod record;

pub use error::{PipelineError, PipelineResult};
pub use record::Record;
