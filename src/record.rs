// src/record.rs
// Best-effort extraction of prompt/completion records from free-form model
// output. The model is asked for JSON objects but is not trusted to comply.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};

/// One prompt/completion pair destined for the fine-tuning dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub prompt: String,
    pub completion: String,
}

/// Locates every balanced `{...}` span in a reply.
///
/// The scan tracks brace depth plus JSON string/escape state, so nested
/// objects and braces inside string literals are handled. Prose outside a
/// span is ignored entirely; an unclosed span at end of input is dropped.
fn balanced_spans(reply: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in reply.char_indices() {
        if depth == 0 {
            if c == '{' {
                depth = 1;
                start = i;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&reply[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Parses a raw model reply into the records it contains.
///
/// Candidates that deserialize into a [`Record`] are kept in order; extra
/// keys in a candidate are ignored, malformed candidates are skipped with a
/// warning. A reply with no brace spans at all yields an empty list. A reply
/// whose candidates all fail to parse is treated as a chunk-level parse
/// failure, since nothing usable came back.
pub fn extract_records(reply: &str) -> PipelineResult<Vec<Record>> {
    let candidates = balanced_spans(reply);
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for candidate in &candidates {
        match serde_json::from_str::<Record>(candidate) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, "Skipping malformed candidate object"),
        }
    }

    if records.is_empty() {
        return Err(PipelineError::Parse(format!(
            "reply contained {} candidate object(s), none parsed as records",
            candidates.len()
        )));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_objects_embedded_in_prose() {
        let reply = r#"Here are some pairs: {"prompt":"Q1","completion":"A1"} and {"prompt":"Q2","completion":"A2"}"#;
        let records = extract_records(reply).unwrap();
        assert_eq!(
            records,
            vec![
                Record {
                    prompt: "Q1".into(),
                    completion: "A1".into()
                },
                Record {
                    prompt: "Q2".into(),
                    completion: "A2".into()
                },
            ]
        );
    }

    #[test]
    fn zero_brace_spans_is_empty_not_an_error() {
        let records = extract_records("I cannot produce questions for this text.").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn braces_inside_string_literals_do_not_split_spans() {
        let reply = r#"{"prompt":"What does { mean?","completion":"It opens a block: }"}"#;
        let records = extract_records(reply).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "What does { mean?");
        assert_eq!(records[0].completion, "It opens a block: }");
    }

    #[test]
    fn nested_objects_are_scanned_as_one_span() {
        // Extra keys are ignored by deserialization, nested or not.
        let reply = r#"{"prompt":"Q","completion":"A","meta":{"score":1}}"#;
        let records = extract_records(reply).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "Q");
    }

    #[test]
    fn malformed_siblings_are_skipped_valid_ones_kept() {
        let reply = r#"{"prompt":"Q1","completion":"A1"} {"prompt": 42} {"prompt":"Q2","completion":"A2"}"#;
        let records = extract_records(reply).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prompt, "Q1");
        assert_eq!(records[1].prompt, "Q2");
    }

    #[test]
    fn all_candidates_malformed_is_a_parse_error() {
        let reply = r#"{"not":"a record"} {"also": false}"#;
        let err = extract_records(reply).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn escaped_quotes_in_strings_are_handled() {
        let reply = r#"{"prompt":"Say \"hi\"","completion":"\"hi\""}"#;
        let records = extract_records(reply).unwrap();
        assert_eq!(records[0].prompt, r#"Say "hi""#);
    }

    #[test]
    fn unclosed_span_at_end_of_reply_is_dropped() {
        let reply = r#"{"prompt":"Q1","completion":"A1"} {"prompt":"Q2","comple"#;
        let records = extract_records(reply).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "Q1");
    }

    #[test]
    fn order_is_preserved() {
        let reply = (0..5)
            .map(|i| format!(r#"{{"prompt":"Q{}","completion":"A{}"}}"#, i, i))
            .collect::<Vec<_>>()
            .join(" filler ");
        let records = extract_records(&reply).unwrap();
        let prompts: Vec<&str> = records.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["Q0", "Q1", "Q2", "Q3", "Q4"]);
    }
}
