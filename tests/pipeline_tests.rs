// tests/pipeline_tests.rs
// Orchestrator behavior with a scripted generator in place of the network.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::tempdir;

use ftprep::completion::PairGenerator;
use ftprep::error::{PipelineError, PipelineResult};
use ftprep::pipeline::{run_pipeline, Document, RunOptions};

/// Returns one canned result per chunk, in chunk order.
struct ScriptedGenerator {
    replies: Mutex<Vec<PipelineResult<String>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(replies: Vec<PipelineResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PairGenerator for ScriptedGenerator {
    async fn generate(&self, _api_key: &str, _chunk: &str) -> PipelineResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        assert!(!replies.is_empty(), "generator called more times than scripted");
        replies.remove(0)
    }
}

fn reply_for(n: usize) -> String {
    format!(r#"Sure! {{"prompt":"Q{}","completion":"A{}"}}"#, n, n)
}

fn options(dir: &Path) -> RunOptions {
    RunOptions {
        chunk_size: 500,
        api_key: "sk-test".to_string(),
        dataset_dir: dir.to_path_buf(),
    }
}

fn txt_document(text: &str) -> Document {
    Document {
        file_name: "input.txt".to_string(),
        bytes: text.as_bytes().to_vec(),
    }
}

fn dataset_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[tokio::test]
async fn processes_every_chunk_in_document_order() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator = ScriptedGenerator::new(vec![
        Ok(reply_for(1)),
        Ok(reply_for(2)),
        Ok(reply_for(3)),
    ]);
    let document = txt_document(&"x".repeat(1200));

    let report = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap();

    assert_eq!(report.chunks_total, 3);
    assert_eq!(report.chunks_failed, 0);
    assert_eq!(report.records_written, 3);
    assert_eq!(generator.calls(), 3);

    let lines = dataset_lines(&report.dataset_path);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Q1"));
    assert!(lines[2].contains("Q3"));
}

#[tokio::test]
async fn failed_chunk_is_skipped_and_run_completes() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator = ScriptedGenerator::new(vec![
        Ok(reply_for(1)),
        Err(PipelineError::Request {
            status: 500,
            body: "upstream exploded".to_string(),
        }),
        Ok(reply_for(3)),
    ]);
    let document = txt_document(&"x".repeat(1200));

    let report = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap();

    assert_eq!(report.chunks_total, 3);
    assert_eq!(report.chunks_failed, 1);
    assert_eq!(report.records_written, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].chunk, 2);
    assert!(report.failures[0].message.contains("500"));
    assert!(report.failures[0]
        .message
        .contains("resumed with the next chunk"));

    // Records from chunks 1 and 3 only, in that order.
    let lines = dataset_lines(&report.dataset_path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Q1"));
    assert!(lines[1].contains("Q3"));
}

#[tokio::test]
async fn unparseable_reply_fails_only_its_chunk() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator = ScriptedGenerator::new(vec![
        Ok("{broken json} {also broken}".to_string()),
        Ok(reply_for(2)),
    ]);
    let document = txt_document(&"x".repeat(600));

    let report = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap();

    assert_eq!(report.chunks_failed, 1);
    assert_eq!(report.failures[0].chunk, 1);
    assert_eq!(report.records_written, 1);
    assert!(dataset_lines(&report.dataset_path)[0].contains("Q2"));
}

#[tokio::test]
async fn reply_without_objects_writes_nothing_and_is_not_a_failure() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator =
        ScriptedGenerator::new(vec![Ok("No pairs could be produced.".to_string())]);
    let document = txt_document("short text");

    let report = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap();

    assert_eq!(report.chunks_total, 1);
    assert_eq!(report.chunks_failed, 0);
    assert_eq!(report.records_written, 0);
    assert_eq!(fs::read(&report.dataset_path).unwrap().len(), 0);
}

#[tokio::test]
async fn unsupported_extension_aborts_before_any_generator_call() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator = ScriptedGenerator::new(vec![]);
    let document = Document {
        file_name: "notes.rtf".to_string(),
        bytes: b"{\\rtf1 hello}".to_vec(),
    };

    let err = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedFormat(ref ext) if ext == "rtf"));
    assert_eq!(generator.calls(), 0);
    // No output file was created or appended.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn extraction_failure_aborts_with_no_output() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator = ScriptedGenerator::new(vec![]);
    let document = Document {
        file_name: "broken.docx".to_string(),
        bytes: b"not a zip archive".to_vec(),
    };

    let err = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Extraction(_)));
    assert_eq!(generator.calls(), 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_document_completes_with_zero_chunks() {
    let dir = tempdir().expect("Failed to create temp directory");
    let generator = ScriptedGenerator::new(vec![]);
    let document = txt_document("");

    let report = run_pipeline(&document, &options(dir.path()), &generator)
        .await
        .unwrap();

    assert_eq!(report.chunks_total, 0);
    assert_eq!(report.records_written, 0);
    assert_eq!(generator.calls(), 0);
    assert_eq!(fs::read(&report.dataset_path).unwrap().len(), 0);
}

#[tokio::test]
async fn each_run_writes_its_own_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let document = txt_document("some text");

    let first = run_pipeline(
        &document,
        &options(dir.path()),
        &ScriptedGenerator::new(vec![Ok(reply_for(1))]),
    )
    .await
    .unwrap();
    let second = run_pipeline(
        &document,
        &options(dir.path()),
        &ScriptedGenerator::new(vec![Ok(reply_for(2))]),
    )
    .await
    .unwrap();

    assert_ne!(first.dataset_path, second.dataset_path);
    assert_eq!(dataset_lines(&first.dataset_path).len(), 1);
    assert_eq!(dataset_lines(&second.dataset_path).len(), 1);
}
