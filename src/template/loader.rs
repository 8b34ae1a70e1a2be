//! Directory-backed template source.
//!
//! Recognised files (all optional):
//!
//! | File                    | Content                                  |
//! |-------------------------|------------------------------------------|
//! | `single_answer.json`    | single-answer template                   |
//! | `multiple_answer.json`  | multiple-answer template                 |
//! | `assertion_reason.json` | assertion-reason template                |
//! | `validacao_rt.txt`      | technical rubric as a markdown table     |
//! | `validacao_de.txt`      | design rubric as a markdown table        |
//! | `stopwords.txt`         | restricted words, one per line           |
//!
//! Missing files fall back to the built-ins.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{check_rubric_size, QuestionTemplate, TemplateSet};
use crate::checklist::{Rubric, DE_RUBRIC_ITEMS, RT_RUBRIC_ITEMS};
use crate::error::TemplateError;
use crate::records::QuestionType;

/// Loads a [`TemplateSet`] from a directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    dir: PathBuf,
}

impl TemplateLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the directory over the built-in set and validates the result.
    ///
    /// A directory that does not exist yields the built-ins unchanged.
    pub fn load(&self) -> Result<TemplateSet, TemplateError> {
        let mut set = TemplateSet::builtin();

        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "Templates directory not found, using built-ins");
            return Ok(set);
        }

        for question_type in QuestionType::ALL {
            let path = self.dir.join(format!("{}.json", question_type.as_str()));
            if let Some(body) = read_optional(&path)? {
                let template = QuestionTemplate::from_body(&path.display().to_string(), body)?;
                set.templates.insert(question_type, template);
            }
        }

        if let Some(text) = read_optional(&self.dir.join("validacao_rt.txt"))? {
            set.rt_rubric = parse_rubric("rt", &text);
            check_rubric_size(&set.rt_rubric, RT_RUBRIC_ITEMS)?;
        }
        if let Some(text) = read_optional(&self.dir.join("validacao_de.txt"))? {
            set.de_rubric = parse_rubric("de", &text);
            check_rubric_size(&set.de_rubric, DE_RUBRIC_ITEMS)?;
        }
        if let Some(text) = read_optional(&self.dir.join("stopwords.txt"))? {
            set.restricted_words = parse_word_list(&text);
        }

        set.validate()?;
        info!(
            dir = %self.dir.display(),
            templates = set.templates.len(),
            restricted_words = set.restricted_words.len(),
            "Loaded templates"
        );
        Ok(set)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, TemplateError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TemplateError::Io(e)),
    }
}

/// Parses a rubric from its markdown checklist table.
///
/// Rows are `| N | criterion | ... |`; the title is the first non-table,
/// non-blank line. Header and separator rows are skipped because their first
/// cell is not a number.
pub fn parse_rubric(name: &str, text: &str) -> Rubric {
    let mut title = String::new();
    let mut items: Vec<(u32, String)> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('|') {
            if title.is_empty() {
                title = line.to_string();
            }
            continue;
        }

        let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
        if cells.len() < 2 {
            continue;
        }
        if let Ok(number) = cells[0].parse::<u32>() {
            if !cells[1].is_empty() {
                items.push((number, cells[1].to_string()));
            }
        }
    }

    items.sort_by_key(|(number, _)| *number);
    Rubric::new(name, title, items.into_iter().map(|(_, text)| text).collect())
}

/// One word or phrase per line; blank lines and `#` comments are skipped.
pub fn parse_word_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
