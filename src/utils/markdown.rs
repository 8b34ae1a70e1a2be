//! Markdown section splitting for free-text LLM replies.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One heading-delimited block of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownSection {
    /// Heading level (number of `#`), 0 for text before the first heading.
    pub level: usize,
    /// Heading text without the `#` markers; empty for the leading section.
    pub heading: String,
    /// Body text up to the next heading, trimmed.
    pub body: String,
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)(?:\s+#+)?\s*$").expect("valid heading regex"))
}

/// Splits `text` into sections at ATX heading lines, preserving document order.
///
/// Text before the first heading becomes a section with an empty heading when
/// it is not blank. A document without headings yields exactly one section
/// with an empty heading. Heading markers inside fenced code blocks are not
/// treated as headings.
pub fn extract_markdown_sections(text: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut current: Option<(usize, String)> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            body.push(line);
            continue;
        }

        let captures = if in_fence {
            None
        } else {
            heading_regex().captures(line)
        };

        match captures {
            Some(caps) => {
                flush(&mut sections, current.take(), &body);
                body.clear();
                current = Some((caps[1].len(), caps[2].trim().to_string()));
            }
            None => body.push(line),
        }
    }
    flush(&mut sections, current, &body);

    if sections.is_empty() {
        sections.push(MarkdownSection {
            level: 0,
            heading: String::new(),
            body: text.trim().to_string(),
        });
    }

    sections
}

fn flush(sections: &mut Vec<MarkdownSection>, heading: Option<(usize, String)>, body: &[&str]) {
    let text = body.join("\n").trim().to_string();
    match heading {
        Some((level, heading)) => sections.push(MarkdownSection {
            level,
            heading,
            body: text,
        }),
        None if !text.is_empty() => sections.push(MarkdownSection {
            level: 0,
            heading: String::new(),
            body: text,
        }),
        None => {}
    }
}

/// Returns the list items (`-`, `*` or `1.` prefixed lines) of a section body.
pub fn list_items(body: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.+?)\s*$").expect("valid list item regex")
    });

    body.lines()
        .filter_map(|line| re.captures(line).map(|caps| caps[1].to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_headings_yields_single_empty_heading_section() {
        let sections = extract_markdown_sections("just a paragraph\nand another line");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "");
        assert_eq!(sections[0].body, "just a paragraph\nand another line");
    }

    #[test]
    fn test_empty_text_yields_single_section() {
        let sections = extract_markdown_sections("");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].heading.is_empty());
        assert!(sections[0].body.is_empty());
    }

    #[test]
    fn test_sections_keep_document_order() {
        let text = "intro text\n# Relatório\nresumo\n## Etapas\npasso 1\n## Recomendações\n1. usar exemplos";
        let sections = extract_markdown_sections(text);
        let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["", "Relatório", "Etapas", "Recomendações"]);
        assert_eq!(sections[0].body, "intro text");
        assert_eq!(sections[1].level, 1);
        assert_eq!(sections[2].level, 2);
        assert_eq!(sections[3].body, "1. usar exemplos");
    }

    #[test]
    fn test_heading_without_body() {
        let sections = extract_markdown_sections("# A\n# B\ncontent");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].body, "");
        assert_eq!(sections[1].body, "content");
    }

    #[test]
    fn test_hash_without_space_is_not_heading() {
        let sections = extract_markdown_sections("#hashtag text");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "");
    }

    #[test]
    fn test_headings_inside_code_fence_ignored() {
        let text = "# Real\n```bash\n# comment\n```\n";
        let sections = extract_markdown_sections(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].body.contains("# comment"));
    }

    #[test]
    fn test_closing_hashes_are_stripped() {
        let sections = extract_markdown_sections("## Title ##\nbody");
        assert_eq!(sections[0].heading, "Title");
    }

    #[test]
    fn test_idempotent() {
        let text = "# One\na\n## Two\nb";
        assert_eq!(
            extract_markdown_sections(text),
            extract_markdown_sections(text)
        );
    }

    #[test]
    fn test_list_items() {
        let body = "intro\n- first\n* second\n1. third\n2) fourth\nnot an item";
        assert_eq!(
            list_items(body),
            vec!["first", "second", "third", "fourth"]
        );
    }
}
