//! Domain types for evidence, claims, slides and visuals.

use serde::{Deserialize, Serialize};

use crate::quality::QualityReport;

/// Where an evidence excerpt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// README or other project documentation.
    Doc,
    /// Facts derived from scanning the repository.
    Repo,
    /// Version-control metadata.
    Git,
    /// A verbatim excerpt of a source file.
    SourceSnippet,
    /// A locally indexed image.
    Image,
}

/// An immutable, hashed excerpt of project material.
///
/// `snippet_hash` attests to the excerpt as shown (after normalization and
/// truncation), not to the full underlying file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Stable, human-readable slug such as `doc.description`.
    pub id: String,

    /// Short display title.
    pub title: String,

    /// Kind of source material.
    pub source_kind: SourceKind,

    /// Project-relative path of the source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,

    /// 1-based first line of the excerpt in the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,

    /// 1-based last line (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    /// Verbatim, length-bounded excerpt.
    pub snippet: String,

    /// Hex SHA-256 of the normalized snippet.
    pub snippet_hash: String,
}

/// An assertion plus the evidence ids supporting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,

    #[serde(default)]
    pub evidence_refs: Vec<String>,

    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.8
}

impl Claim {
    /// Create a claim, trimming its text and deduplicating refs in order.
    pub fn new(text: impl Into<String>, refs: &[String], confidence: f64) -> Self {
        Self {
            text: text.into().trim().to_string(),
            evidence_refs: dedup_refs(refs.iter().map(String::as_str)),
            confidence: (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0,
        }
    }
}

/// Deduplicate evidence ids while keeping first-seen order.
pub fn dedup_refs<'a>(refs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in refs {
        let r = r.trim();
        if !r.is_empty() && !out.iter().any(|o| o == r) {
            out.push(r.to_string());
        }
    }
    out
}

/// The kind of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideType {
    Title,
    Problem,
    Solution,
    Demo,
    Impact,
    Tech,
    Future,
    Delta,
    Closing,
}

impl SlideType {
    /// Canonical deck order.
    pub const ALL: [SlideType; 9] = [
        SlideType::Title,
        SlideType::Problem,
        SlideType::Solution,
        SlideType::Demo,
        SlideType::Impact,
        SlideType::Tech,
        SlideType::Future,
        SlideType::Delta,
        SlideType::Closing,
    ];

    /// Order in which types survive a `max_slides` cut.
    pub const PRIORITY: [SlideType; 9] = [
        SlideType::Title,
        SlideType::Problem,
        SlideType::Solution,
        SlideType::Demo,
        SlideType::Tech,
        SlideType::Impact,
        SlideType::Delta,
        SlideType::Future,
        SlideType::Closing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlideType::Title => "title",
            SlideType::Problem => "problem",
            SlideType::Solution => "solution",
            SlideType::Demo => "demo",
            SlideType::Impact => "impact",
            SlideType::Tech => "tech",
            SlideType::Future => "future",
            SlideType::Delta => "delta",
            SlideType::Closing => "closing",
        }
    }

    /// Parse a type name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// Capitalized type name, e.g. `Tech`.
    pub fn label(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Title and closing slides bracket the deck and need no evidence or visuals.
    pub fn is_bookend(&self) -> bool {
        matches!(self, SlideType::Title | SlideType::Closing)
    }
}

impl std::fmt::Display for SlideType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific slide fields, tagged by slide type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlideBody {
    Title {
        #[serde(default)]
        subtitle: String,
    },
    Problem {
        #[serde(default)]
        content: String,
    },
    Solution {
        #[serde(default)]
        content: String,
    },
    Demo {
        #[serde(default)]
        list_items: Vec<String>,
    },
    Impact {
        #[serde(default)]
        list_items: Vec<String>,
    },
    Tech {
        #[serde(default)]
        list_items: Vec<String>,
    },
    Future {
        #[serde(default)]
        list_items: Vec<String>,
    },
    Delta {
        #[serde(default)]
        list_items: Vec<String>,
    },
    Closing {
        #[serde(default)]
        subtitle: String,
    },
}

impl SlideBody {
    /// An empty body of the given type.
    pub fn empty(slide_type: SlideType) -> Self {
        match slide_type {
            SlideType::Title => SlideBody::Title { subtitle: String::new() },
            SlideType::Problem => SlideBody::Problem { content: String::new() },
            SlideType::Solution => SlideBody::Solution { content: String::new() },
            SlideType::Demo => SlideBody::Demo { list_items: Vec::new() },
            SlideType::Impact => SlideBody::Impact { list_items: Vec::new() },
            SlideType::Tech => SlideBody::Tech { list_items: Vec::new() },
            SlideType::Future => SlideBody::Future { list_items: Vec::new() },
            SlideType::Delta => SlideBody::Delta { list_items: Vec::new() },
            SlideType::Closing => SlideBody::Closing { subtitle: String::new() },
        }
    }

    pub fn slide_type(&self) -> SlideType {
        match self {
            SlideBody::Title { .. } => SlideType::Title,
            SlideBody::Problem { .. } => SlideType::Problem,
            SlideBody::Solution { .. } => SlideType::Solution,
            SlideBody::Demo { .. } => SlideType::Demo,
            SlideBody::Impact { .. } => SlideType::Impact,
            SlideBody::Tech { .. } => SlideType::Tech,
            SlideBody::Future { .. } => SlideType::Future,
            SlideBody::Delta { .. } => SlideType::Delta,
            SlideBody::Closing { .. } => SlideType::Closing,
        }
    }

    pub fn subtitle(&self) -> Option<&str> {
        match self {
            SlideBody::Title { subtitle } | SlideBody::Closing { subtitle } => Some(subtitle),
            _ => None,
        }
    }

    pub fn subtitle_mut(&mut self) -> Option<&mut String> {
        match self {
            SlideBody::Title { subtitle } | SlideBody::Closing { subtitle } => Some(subtitle),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            SlideBody::Problem { content } | SlideBody::Solution { content } => Some(content),
            _ => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut String> {
        match self {
            SlideBody::Problem { content } | SlideBody::Solution { content } => Some(content),
            _ => None,
        }
    }

    pub fn list_items(&self) -> Option<&[String]> {
        match self {
            SlideBody::Demo { list_items }
            | SlideBody::Impact { list_items }
            | SlideBody::Tech { list_items }
            | SlideBody::Future { list_items }
            | SlideBody::Delta { list_items } => Some(list_items),
            _ => None,
        }
    }

    pub fn list_items_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            SlideBody::Demo { list_items }
            | SlideBody::Impact { list_items }
            | SlideBody::Tech { list_items }
            | SlideBody::Future { list_items }
            | SlideBody::Delta { list_items } => Some(list_items),
            _ => None,
        }
    }
}

/// One ordered unit of deck content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Stable id, unchanged across edits and reorders.
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Type tag plus the fields that type carries.
    #[serde(flatten)]
    pub body: SlideBody,

    /// Presenter notes.
    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub claims: Vec<Claim>,

    /// Slide-level evidence for content not structured as claims.
    #[serde(default)]
    pub evidence_refs: Vec<String>,

    #[serde(default)]
    pub visuals: Vec<Visual>,
}

impl Slide {
    /// Create an empty slide of the given type.
    pub fn new(id: impl Into<String>, slide_type: SlideType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: SlideBody::empty(slide_type),
            notes: String::new(),
            claims: Vec::new(),
            evidence_refs: Vec::new(),
            visuals: Vec::new(),
        }
    }

    pub fn slide_type(&self) -> SlideType {
        self.body.slide_type()
    }

    /// Every evidence id the slide cites, slide-level first, then claims.
    pub fn cited_evidence(&self) -> Vec<String> {
        dedup_refs(
            self.evidence_refs
                .iter()
                .chain(self.claims.iter().flat_map(|c| c.evidence_refs.iter()))
                .map(String::as_str),
        )
    }

    /// True when at least one evidence path exists (slide-level or claim).
    pub fn has_evidence(&self) -> bool {
        !self.evidence_refs.is_empty() || self.claims.iter().any(|c| !c.evidence_refs.is_empty())
    }

    /// Visible text: title, subtitle/content, list items and claim texts.
    pub fn visible_text(&self) -> Vec<&str> {
        let mut parts = vec![self.title.as_str()];
        if let Some(subtitle) = self.body.subtitle() {
            parts.push(subtitle);
        }
        if let Some(content) = self.body.content() {
            parts.push(content);
        }
        if let Some(items) = self.body.list_items() {
            parts.extend(items.iter().map(String::as_str));
        }
        parts.extend(self.claims.iter().map(|c| c.text.as_str()));
        parts
    }
}

/// Kind of an attached visual. Only images are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    #[default]
    Image,
}

/// An evidence-linked image attached to a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    /// Id of the source media asset.
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: VisualKind,

    pub source_path: String,

    #[serde(default)]
    pub alt: String,

    #[serde(default)]
    pub caption: String,

    /// At most three ids, all cited by the owning slide or of kind `image`.
    #[serde(default)]
    pub evidence_refs: Vec<String>,

    #[serde(default)]
    pub confidence: f64,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,

    /// Content hash of the image bytes.
    #[serde(default)]
    pub sha256: String,
}

/// How an indexed image was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Any image file inside the project tree.
    RepoImage,
    /// An image referenced from Markdown documentation.
    DocImage,
}

/// A locally indexed image that can become a [`Visual`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// `media.<sha256 prefix>`.
    pub id: String,
    pub source_path: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    pub sha256: String,
    #[serde(default)]
    pub bytes: u64,
    /// Lowercase tokens from the path and alt texts.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub alt: String,
    /// Evidence the image is associated with.
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

/// Partial update of a slide's editable fields.
///
/// `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Vec<Claim>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_refs: Option<Vec<String>>,
}

impl FieldUpdates {
    pub fn is_empty(&self) -> bool {
        *self == FieldUpdates::default()
    }
}

/// Project-level facts shown alongside the deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckMetadata {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub languages: std::collections::BTreeMap<String, usize>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub file_count: usize,
    #[serde(default)]
    pub total_lines: usize,
}

/// Current version of the serialized deck payload.
pub const PAYLOAD_SCHEMA_VERSION: &str = "2.2";

/// The serialized deck: slides, evidence, media and the latest report.
///
/// Fields added after the first schema are optional so older payloads load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckPayload {
    pub schema_version: String,
    #[serde(default)]
    pub metadata: DeckMetadata,
    #[serde(default)]
    pub git_context: crate::facts::GitFacts,
    pub slides: Vec<Slide>,
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub media_catalog: Vec<MediaAsset>,
    #[serde(default)]
    pub quality_report: QualityReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_type_label_and_parse() {
        assert_eq!(SlideType::Tech.label(), "Tech");
        assert_eq!(SlideType::parse(" Delta "), Some(SlideType::Delta));
        assert_eq!(SlideType::parse("content"), None);
        assert!(SlideType::Closing.is_bookend());
        assert!(!SlideType::Demo.is_bookend());
    }

    #[test]
    fn test_slide_serializes_flat_with_type_tag() {
        let mut slide = Slide::new("tech", SlideType::Tech, "Technology Stack");
        if let Some(items) = slide.body.list_items_mut() {
            items.push("Primary language: Rust".to_string());
        }
        let value = serde_json::to_value(&slide).unwrap();
        assert_eq!(value["type"], "tech");
        assert_eq!(value["list_items"][0], "Primary language: Rust");
        assert!(value.get("body").is_none());

        let back: Slide = serde_json::from_value(value).unwrap();
        assert_eq!(back, slide);
    }

    #[test]
    fn test_slide_deserializes_without_optional_fields() {
        let json = r#"{"id":"problem","type":"problem","title":"The Problem","content":"Slow demos"}"#;
        let slide: Slide = serde_json::from_str(json).unwrap();
        assert_eq!(slide.slide_type(), SlideType::Problem);
        assert_eq!(slide.body.content(), Some("Slow demos"));
        assert!(slide.claims.is_empty());
        assert!(slide.visuals.is_empty());
    }

    #[test]
    fn test_cited_evidence_dedups_in_order() {
        let mut slide = Slide::new("demo", SlideType::Demo, "Key Features");
        slide.evidence_refs = vec!["doc.features".into()];
        slide.claims.push(Claim::new(
            "Fast",
            &["repo.features".into(), "doc.features".into()],
            0.9,
        ));
        assert_eq!(slide.cited_evidence(), vec!["doc.features", "repo.features"]);
        assert!(slide.has_evidence());
    }

    #[test]
    fn test_claim_new_trims_and_clamps() {
        let claim = Claim::new("  hello  ", &["a".into(), "a".into(), " ".into()], 1.7);
        assert_eq!(claim.text, "hello");
        assert_eq!(claim.evidence_refs, vec!["a"]);
        assert_eq!(claim.confidence, 1.0);
    }
}
