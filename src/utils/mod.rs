//! Shared text utilities.
//!
//! Everything here is a pure function over `&str`: JSON and markdown
//! extraction from model replies, learning-objective parsing, and
//! restricted-word scanning.

pub mod json_extraction;
pub mod markdown;
pub mod objectives;
pub mod restricted_words;

pub use json_extraction::{
    analyze_json_structure, extract_json, extract_json_as, find_matching_brace, ExtractionError,
    JsonStructureAnalysis,
};
pub use markdown::{extract_markdown_sections, list_items, MarkdownSection};
pub use objectives::{extract_objectives, Objective};
pub use restricted_words::{
    default_restricted_words, distinct_words, find_restricted_words, RestrictedMatch,
    DEFAULT_RESTRICTED_WORDS,
};
