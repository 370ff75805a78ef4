//! README discovery and Markdown section extraction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use deck_core::normalize::{normalize_snippet, truncate_with_ellipsis};
use deck_core::DocFacts;
use regex::Regex;

const README_NAMES: &[&str] = &["README.md", "README.txt", "README", "readme.md", "Readme.md"];

const MAX_SECTION_CHARS: usize = 500;
const MAX_FEATURES: usize = 8;
const MAX_POINTS: usize = 6;

/// Extra docs are appended while the description is shorter than this.
const APPEND_BELOW_CHARS: usize = 300;
const APPEND_CHARS: usize = 200;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[*+-]|\d+[.)])\s+(.+?)\s*$").unwrap());

const PROBLEM_HEADINGS: &[&str] = &["problem", "challenge", "issue", "motivation"];
const SOLUTION_HEADINGS: &[&str] = &["solution", "approach", "how it works"];
const FEATURE_HEADINGS: &[&str] = &["features", "functionality", "capabilities"];
const IMPACT_HEADINGS: &[&str] = &["impact", "results", "benefits"];
const FUTURE_HEADINGS: &[&str] = &["future", "roadmap", "next steps"];

/// Parsed documentation plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocs {
    pub facts: DocFacts,
    pub warnings: Vec<String>,
}

/// Extracts deck-relevant sections from project docs.
#[derive(Debug, Clone)]
pub struct DocParser {
    root: PathBuf,
    additional: Vec<PathBuf>,
}

#[derive(Debug)]
struct Section {
    heading: String,
    level: usize,
    body: String,
}

impl DocParser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            additional: Vec::new(),
        }
    }

    /// Extra documents whose leading text pads a short description.
    pub fn with_additional_docs(mut self, docs: Vec<PathBuf>) -> Self {
        self.additional = docs;
        self
    }

    pub fn parse(&self, fallback_title: &str) -> ParsedDocs {
        let mut parsed = ParsedDocs::default();
        parsed.facts.title = fallback_title.to_string();

        if let Some(path) = self.find_readme() {
            match fs::read(&path) {
                Ok(bytes) => {
                    let text = normalize_snippet(&String::from_utf8_lossy(&bytes));
                    parse_readme(&text, &mut parsed.facts);
                    parsed.facts.source_path = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned());
                    parsed.facts.source_text = text;
                }
                Err(e) => parsed
                    .warnings
                    .push(format!("Failed to read {}: {}", path.display(), e)),
            }
        } else {
            log::debug!("No README found in {}", self.root.display());
        }

        for doc in &self.additional {
            self.append_doc(doc, &mut parsed);
        }
        parsed
    }

    fn find_readme(&self) -> Option<PathBuf> {
        README_NAMES
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
    }

    fn append_doc(&self, doc: &Path, parsed: &mut ParsedDocs) {
        let path = if doc.is_absolute() {
            doc.to_path_buf()
        } else {
            self.root.join(doc)
        };
        let text = match fs::read(&path) {
            Ok(bytes) => normalize_snippet(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                parsed
                    .warnings
                    .push(format!("Failed to read {}: {}", path.display(), e));
                return;
            }
        };

        let description = &mut parsed.facts.description;
        if description.chars().count() < APPEND_BELOW_CHARS && !text.is_empty() {
            let extra: String = text.chars().take(APPEND_CHARS).collect();
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str(extra.trim());
        }
    }
}

fn parse_readme(text: &str, facts: &mut DocFacts) {
    let (preamble, sections) = split_sections(text);

    let title_section = sections.iter().position(|s| s.level == 1);
    if let Some(idx) = title_section {
        facts.title = sections[idx].heading.clone();
        facts.description = first_paragraph(&sections[idx].body);
    }
    if facts.description.is_empty() {
        facts.description = first_paragraph(&preamble);
    }

    if let Some(section) = find_section(&sections, PROBLEM_HEADINGS) {
        facts.problem = clip(&section.body);
    }
    if let Some(section) = find_section(&sections, SOLUTION_HEADINGS) {
        facts.solution = clip(&section.body);
    }
    if let Some(section) = find_section(&sections, FEATURE_HEADINGS) {
        facts.features = bullets(&section.body, MAX_FEATURES);
    }
    if let Some(section) = find_section(&sections, IMPACT_HEADINGS) {
        facts.impact_points = bullets(&section.body, MAX_POINTS);
    }
    if let Some(section) = find_section(&sections, FUTURE_HEADINGS) {
        facts.future_items = bullets(&section.body, MAX_POINTS);
    }
}

/// Split Markdown into text before the first heading and heading sections.
/// Lines inside fenced code blocks never start a section.
fn split_sections(text: &str) -> (String, Vec<Section>) {
    let mut preamble = String::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(caps) = HEADING.captures(line) {
                sections.push(Section {
                    heading: caps[2].trim().to_string(),
                    level: caps[1].len(),
                    body: String::new(),
                });
                continue;
            }
        }
        let target = match sections.last_mut() {
            Some(section) => &mut section.body,
            None => &mut preamble,
        };
        target.push_str(line);
        target.push('\n');
    }
    (preamble, sections)
}

fn find_section<'a>(sections: &'a [Section], names: &[&str]) -> Option<&'a Section> {
    sections.iter().find(|s| {
        let heading = s.heading.to_lowercase();
        names.iter().any(|name| heading.starts_with(name))
    })
}

fn first_paragraph(body: &str) -> String {
    let paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with("![") && !p.starts_with("[!["))
        .unwrap_or_default();
    clip(paragraph)
}

fn clip(text: &str) -> String {
    truncate_with_ellipsis(text.trim(), MAX_SECTION_CHARS)
}

fn bullets(body: &str, max: usize) -> Vec<String> {
    body.lines()
        .filter_map(|line| BULLET.captures(line))
        .map(|caps| caps[1].to_string())
        .filter(|item| !item.is_empty())
        .take(max)
        .collect()
}
