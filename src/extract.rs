// src/extract.rs
// Document text extraction: one declared format in, one text string out.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Declared format of an uploaded document, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Txt,
    Doc,
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Extracts the full text of a document as a single string.
///
/// Plain text is decoded as UTF-8. Word documents are read from the
/// `word/document.xml` entry of the zip container, paragraphs separated by
/// newlines. PDF pages are concatenated in page order; pages without
/// extractable text contribute nothing. Any failure here aborts the run.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> PipelineResult<String> {
    debug!(?format, size = bytes.len(), "Extracting document text");
    match format {
        DocumentFormat::Txt => String::from_utf8(bytes.to_vec())
            .map_err(|e| PipelineError::Extraction(format!("file is not valid UTF-8: {}", e))),
        DocumentFormat::Doc | DocumentFormat::Docx => extract_word_text(bytes),
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| PipelineError::Extraction(format!("PDF extraction failed: {}", e))),
    }
}

/// Pulls paragraph text out of a DOCX container.
///
/// A `.docx` is a zip archive; the body lives in `word/document.xml` as
/// `<w:p>` paragraphs holding `<w:t>` text runs. Legacy `.doc` files are not
/// zip archives and fail extraction here, same as any other unreadable body.
fn extract_word_text(bytes: &[u8]) -> PipelineResult<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| PipelineError::Extraction(format!("not a readable Word document: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| PipelineError::Extraction(format!("document body missing: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| PipelineError::Extraction(format!("document body unreadable: {}", e)))?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let run = t.unescape().map_err(|e| {
                    PipelineError::Extraction(format!("malformed document XML: {}", e))
                })?;
                current.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::Extraction(format!(
                    "malformed document XML: {}",
                    e
                )))
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}
