//! Learning-objective extraction.
//!
//! Objectives are written as `Obj.1: description`, each marker at the start
//! of a line. Real inputs drift from that shape (`Obj 2 - text`,
//! `Objetivo 3) text`, missing colon, extra blank lines), so the marker is
//! matched loosely and the description runs until the next marker line.
//! A mention such as "objetivo 2" inside a description is plain text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::json_extraction::{preview, ExtractionError};

/// A labelled learning objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Normalised identifier, always `Obj.N`.
    pub id: String,
    /// Objective text with whitespace collapsed.
    pub description: String,
}

impl Objective {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.description)
    }
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*obj(?:etivo)?[ \t]*\.?[ \t]*(\d+)(?:[ \t]*[:.)\-–]|[ \t]+|$)")
            .expect("valid objective regex")
    })
}

/// Extracts labelled objectives in document order.
///
/// Fails with [`ExtractionError::NoObjectives`] when the text has no
/// recognisable `Obj.N` marker. Markers with an empty description are
/// skipped, and a repeated id keeps its first occurrence.
pub fn extract_objectives(text: &str) -> Result<Vec<Objective>, ExtractionError> {
    let markers: Vec<(usize, usize, String)> = marker_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps[1].to_string()))
        })
        .collect();

    if markers.is_empty() {
        return Err(ExtractionError::NoObjectives {
            content_preview: preview(text),
        });
    }

    let mut objectives = Vec::with_capacity(markers.len());
    for (i, (_, body_start, number)) in markers.iter().enumerate() {
        let body_end = markers
            .get(i + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(text.len());
        let description = collapse_whitespace(&text[*body_start..body_end]);
        if description.is_empty() {
            continue;
        }
        let number = number.trim_start_matches('0');
        let number = if number.is_empty() { "0" } else { number };
        let id = format!("Obj.{}", number);
        if objectives.iter().any(|o: &Objective| o.id == id) {
            warn!(objective_id = %id, "Skipping repeated objective marker");
            continue;
        }
        objectives.push(Objective::new(id, description));
    }

    if objectives.is_empty() {
        return Err(ExtractionError::NoObjectives {
            content_preview: preview(text),
        });
    }

    Ok(objectives)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
