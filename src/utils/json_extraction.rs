//! JSON extraction from free-text LLM replies.
//!
//! Model output routinely wraps the requested object in prose, markdown fences
//! or reasoning text. [`extract_json`] scans for the first balanced `{...}`
//! span that parses as a JSON object and returns it; anything else is an
//! [`ExtractionError`]. A partially parsed object is never returned.
//!
//! # Example
//!
//! ```
//! use quiz_forge::utils::json_extraction::extract_json;
//!
//! let reply = "Sure! Here it is: {\"status\": \"ok\", \"items\": [1, 2]} Let me know.";
//! let value = extract_json(reply).unwrap();
//! assert_eq!(value["status"], "ok");
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters echoed back in error previews.
const PREVIEW_CHARS: usize = 80;

/// Error type for structured-data extraction failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("No JSON object found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },

    #[error("JSON appears truncated: {unclosed_braces} unclosed braces. Partial: {partial_preview}...")]
    Truncated {
        partial_preview: String,
        unclosed_braces: usize,
    },

    #[error("Balanced span found but it is not a valid JSON object: {reason}")]
    Malformed { reason: String },

    #[error("No learning objective marker found. Content starts with: '{content_preview}'")]
    NoObjectives { content_preview: String },

    #[error("Extracted object does not match the expected shape: {reason}")]
    Shape { reason: String },
}

/// Analysis result for the brace structure of a text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonStructureAnalysis {
    /// Number of unclosed braces ('{' without matching '}').
    pub unclosed_braces: usize,
    /// Whether the scan ended inside a string literal.
    pub in_string: bool,
    /// Byte offset of the first '{', if any.
    pub json_start: Option<usize>,
}

/// Scans `s` tracking brace depth and string literals.
pub fn analyze_json_structure(s: &str) -> JsonStructureAnalysis {
    let mut depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut json_start = None;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' if json_start.is_some() => in_string = !in_string,
            '{' if !in_string => {
                if json_start.is_none() {
                    json_start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && json_start.is_some() => depth -= 1,
            _ => {}
        }
    }

    JsonStructureAnalysis {
        unclosed_braces: depth.max(0) as usize,
        in_string,
        json_start,
    }
}

/// Finds the byte index of the brace closing the one at the start of `s`.
///
/// `s` must begin with '{'. Braces inside string literals are ignored.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extracts the first balanced `{...}` span of `text` that parses as a JSON object.
///
/// Candidate spans are tried in document order, so a stray `{like this}` in
/// leading prose is skipped in favour of the first span that actually parses.
pub fn extract_json(text: &str) -> Result<Value, ExtractionError> {
    let mut saw_unbalanced = false;
    let mut last_parse_error: Option<String> = None;

    for (start, c) in text.char_indices() {
        if c != '{' {
            continue;
        }

        let candidate = &text[start..];
        let Some(end) = find_matching_brace(candidate) else {
            saw_unbalanced = true;
            continue;
        };

        match serde_json::from_str::<Value>(&candidate[..=end]) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => {}
            Err(e) => last_parse_error = Some(e.to_string()),
        }
    }

    if let Some(reason) = last_parse_error {
        if !saw_unbalanced {
            return Err(ExtractionError::Malformed { reason });
        }
    }

    let analysis = analyze_json_structure(text);
    match analysis.json_start {
        Some(start) if saw_unbalanced => Err(ExtractionError::Truncated {
            partial_preview: preview(&text[start..]),
            unclosed_braces: analysis.unclosed_braces.max(1),
        }),
        Some(_) => Err(ExtractionError::Malformed {
            reason: "no balanced span parsed as an object".to_string(),
        }),
        None => Err(ExtractionError::NotFound {
            content_preview: preview(text),
        }),
    }
}

/// Extracts the first JSON object and deserializes it into `T`.
pub fn extract_json_as<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionError> {
    let value = extract_json(text)?;
    serde_json::from_value(value).map_err(|e| ExtractionError::Shape {
        reason: e.to_string(),
    })
}

/// Returns at most [`PREVIEW_CHARS`] characters of `s`, trimmed.
pub(crate) fn preview(s: &str) -> String {
    s.trim().chars().take(PREVIEW_CHARS).collect()
}
