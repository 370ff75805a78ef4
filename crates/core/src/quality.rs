//! Deterministic quality validation.
//!
//! The validator produces structured [`Issue`]s; the human-readable
//! `errors`/`warnings` strings in a [`QualityReport`] are rendered from them.
//! [`Issue::parse`] recovers the structured form from a rendered string so
//! clients that only hold display text can still request fixes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::config::{DeckConfig, ImageMode};
use crate::error::{Error, Result};
use crate::evidence::EvidenceIndex;
use crate::normalize::PhraseScrubber;
use crate::types::Slide;

/// Titles that say nothing about the slide.
const WEAK_TITLES: &[&str] = &["overview", "summary", "details", "slide", "content", "misc"];

/// Image coverage required in strict image mode.
pub const MIN_IMAGE_COVERAGE: f64 = 0.5;

/// Validation rules in canonical order.
///
/// Slide-scoped rules come first in the order they are checked per slide,
/// then deck-wide rules. Fixes are applied in this order too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    DanglingReference,
    MissingEvidence,
    UnsupportedClaim,
    BannedPhrase,
    TooDense,
    ManyListItems,
    TooManyListItems,
    WeakTitle,
    VisualMissingAlt,
    LowConfidenceVisual,
    EmptyDeck,
    DuplicateSlideId,
    LowImageCoverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One structured validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub rule: Rule,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_id: Option<String>,
    /// Rule-specific values, e.g. `evidence_id`, `phrase`, `count`.
    #[serde(default)]
    pub detail: BTreeMap<String, String>,
}

static PARSERS: LazyLock<Vec<(Rule, Regex)>> = LazyLock::new(|| {
    [
        (Rule::DanglingReference, r"^Slide '(?P<slide>.*)' references unknown evidence '(?P<evidence_id>.*)'$"),
        (Rule::MissingEvidence, r"^Slide '(?P<slide>.*)' has no evidence references$"),
        (Rule::UnsupportedClaim, r"^Slide '(?P<slide>.*)' has an unsupported claim \(#(?P<claim>\d+)\) without evidence references$"),
        (Rule::BannedPhrase, r"^Slide '(?P<slide>.*)' uses banned phrase '(?P<phrase>.*)'$"),
        (Rule::TooDense, r"^Slide '(?P<slide>.*)' is too dense \((?P<chars>\d+) characters\)$"),
        (Rule::ManyListItems, r"^Slide '(?P<slide>.*)' has many list items \((?P<count>\d+)\)$"),
        (Rule::TooManyListItems, r"^Slide '(?P<slide>.*)' has too many list items \((?P<count>\d+) > (?P<max>\d+)\)$"),
        (Rule::WeakTitle, r"^Slide '(?P<slide>.*)' has a weak title '(?P<title>.*)'$"),
        (Rule::VisualMissingAlt, r"^Slide '(?P<slide>.*)' has a visual '(?P<visual_id>.*)' missing alt text$"),
        (Rule::LowConfidenceVisual, r"^Slide '(?P<slide>.*)' has a low-confidence visual '(?P<visual_id>.*)' \((?P<confidence>[\d.]+) < (?P<min>[\d.]+)\)$"),
        (Rule::EmptyDeck, r"^Deck has no slides$"),
        (Rule::DuplicateSlideId, r"^Duplicate slide id '(?P<slide>.*)' in deck$"),
        (Rule::LowImageCoverage, r"^Image coverage (?P<percent>\d+)% is below the required (?P<required>\d+)%$"),
    ]
    .into_iter()
    .map(|(rule, pattern)| (rule, Regex::new(&format!("(?s){}", pattern)).unwrap()))
    .collect()
});

impl Issue {
    fn new(rule: Rule, severity: Severity, slide_id: Option<&str>) -> Self {
        Self {
            rule,
            severity,
            slide_id: slide_id.map(str::to_string),
            detail: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.detail.insert(key.to_string(), value.to_string());
        self
    }

    /// A detail value, or an empty string if absent.
    pub fn get(&self, key: &str) -> &str {
        self.detail.get(key).map(String::as_str).unwrap_or("")
    }

    /// Render the fixed display string for this issue.
    pub fn message(&self) -> String {
        let slide = self.slide_id.as_deref().unwrap_or("");
        match self.rule {
            Rule::DanglingReference => format!(
                "Slide '{}' references unknown evidence '{}'",
                slide,
                self.get("evidence_id")
            ),
            Rule::MissingEvidence => format!("Slide '{}' has no evidence references", slide),
            Rule::UnsupportedClaim => format!(
                "Slide '{}' has an unsupported claim (#{}) without evidence references",
                slide,
                self.get("claim")
            ),
            Rule::BannedPhrase => {
                format!("Slide '{}' uses banned phrase '{}'", slide, self.get("phrase"))
            }
            Rule::TooDense => {
                format!("Slide '{}' is too dense ({} characters)", slide, self.get("chars"))
            }
            Rule::ManyListItems => {
                format!("Slide '{}' has many list items ({})", slide, self.get("count"))
            }
            Rule::TooManyListItems => format!(
                "Slide '{}' has too many list items ({} > {})",
                slide,
                self.get("count"),
                self.get("max")
            ),
            Rule::WeakTitle => format!("Slide '{}' has a weak title '{}'", slide, self.get("title")),
            Rule::VisualMissingAlt => format!(
                "Slide '{}' has a visual '{}' missing alt text",
                slide,
                self.get("visual_id")
            ),
            Rule::LowConfidenceVisual => format!(
                "Slide '{}' has a low-confidence visual '{}' ({} < {})",
                slide,
                self.get("visual_id"),
                self.get("confidence"),
                self.get("min")
            ),
            Rule::EmptyDeck => "Deck has no slides".to_string(),
            Rule::DuplicateSlideId => format!("Duplicate slide id '{}' in deck", slide),
            Rule::LowImageCoverage => format!(
                "Image coverage {}% is below the required {}%",
                self.get("percent"),
                self.get("required")
            ),
        }
    }

    /// Recover a structured issue from its display string.
    ///
    /// Unrecognized text yields `None`. Severity is not part of the string,
    /// so parsed issues are reported with `default_severity`.
    pub fn parse(text: &str, default_severity: Severity) -> Option<Self> {
        let text = text.trim();
        for (rule, re) in PARSERS.iter() {
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let slide = caps.name("slide").map(|m| m.as_str());
            let mut issue = Issue::new(*rule, default_severity, slide);
            for name in re.capture_names().flatten() {
                if name == "slide" {
                    continue;
                }
                if let Some(m) = caps.name(name) {
                    issue.detail.insert(name.to_string(), m.as_str().to_string());
                }
            }
            return Some(issue);
        }
        None
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    #[default]
    Pass,
    Warn,
    Fail,
}

/// Deck-level numbers reported with every validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub slide_count: usize,
    pub claim_count: usize,
    pub supported_claims: usize,
    /// Supported claims over all claims; 1.0 when there are no claims.
    pub supported_claim_ratio: f64,
    /// Eligible slides with a visual over eligible slides.
    pub image_coverage: f64,
    pub slides_without_visual: Vec<String>,
    pub visual_count: usize,
    pub visual_confidence_mean: f64,
}

/// Result of one validation pass. Always recomputed, never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub status: QualityStatus,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub metrics: QualityMetrics,
}

impl QualityReport {
    fn from_issues(issues: Vec<Issue>, metrics: QualityMetrics) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for issue in &issues {
            match issue.severity {
                Severity::Error => errors.push(issue.message()),
                Severity::Warning => warnings.push(issue.message()),
            }
        }
        let status = if !errors.is_empty() {
            QualityStatus::Fail
        } else if !warnings.is_empty() {
            QualityStatus::Warn
        } else {
            QualityStatus::Pass
        };
        Self {
            status,
            errors,
            warnings,
            issues,
            metrics,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.status == QualityStatus::Fail
    }

    /// Abort with every error listed when the gate is strict and errors exist.
    pub fn enforce(&self, strict: bool) -> Result<()> {
        if strict && self.has_errors() {
            return Err(Error::QualityGateFailed(self.errors.clone()));
        }
        Ok(())
    }
}

/// Pure deck validator built from a resolved configuration.
#[derive(Debug, Clone)]
pub struct Validator {
    strict_evidence: bool,
    image_mode: ImageMode,
    min_visual_confidence: f64,
    max_list_items: usize,
    dense_content_chars: usize,
    dense_list_items: usize,
    scrubber: PhraseScrubber,
}

impl Validator {
    pub fn new(config: &DeckConfig) -> Self {
        Self {
            strict_evidence: config.general.strict_quality,
            image_mode: config.images.effective_mode(),
            min_visual_confidence: config.images.min_confidence,
            max_list_items: config.quality.max_list_items,
            dense_content_chars: config.quality.dense_content_chars,
            dense_list_items: config.quality.dense_list_items,
            scrubber: PhraseScrubber::new(&config.quality.banned_phrases),
        }
    }

    /// Whether the generation gate should abort on errors.
    pub fn is_strict(&self) -> bool {
        self.strict_evidence || self.image_mode == ImageMode::Strict
    }

    /// Matcher for the configured banned phrases.
    pub fn scrubber(&self) -> &PhraseScrubber {
        &self.scrubber
    }

    /// Validate slides against the evidence index.
    pub fn validate(&self, slides: &[Slide], index: &EvidenceIndex) -> QualityReport {
        let mut issues = Vec::new();
        for slide in slides {
            self.check_slide(slide, index, &mut issues);
        }
        self.check_deck(slides, &mut issues);
        QualityReport::from_issues(issues, compute_metrics(slides))
    }

    fn check_slide(&self, slide: &Slide, index: &EvidenceIndex, issues: &mut Vec<Issue>) {
        let id = Some(slide.id.as_str());

        let mut unknown: Vec<&str> = Vec::new();
        let all_refs = slide
            .evidence_refs
            .iter()
            .chain(slide.claims.iter().flat_map(|c| c.evidence_refs.iter()))
            .chain(slide.visuals.iter().flat_map(|v| v.evidence_refs.iter()));
        for r in all_refs {
            if !index.contains(r) && !unknown.contains(&r.as_str()) {
                unknown.push(r);
            }
        }
        for evidence_id in unknown {
            issues.push(
                Issue::new(Rule::DanglingReference, Severity::Error, id)
                    .with("evidence_id", evidence_id),
            );
        }

        if !slide.slide_type().is_bookend() && !slide.has_evidence() {
            let severity = if self.strict_evidence {
                Severity::Error
            } else {
                Severity::Warning
            };
            issues.push(Issue::new(Rule::MissingEvidence, severity, id));
        }

        for (n, claim) in slide.claims.iter().enumerate() {
            if claim.evidence_refs.is_empty() {
                issues.push(
                    Issue::new(Rule::UnsupportedClaim, Severity::Error, id).with("claim", n + 1),
                );
            }
        }

        let visible = slide.visible_text().join("\n");
        for phrase in self.scrubber.find(&visible) {
            issues.push(Issue::new(Rule::BannedPhrase, Severity::Warning, id).with("phrase", phrase));
        }

        let content_chars = content_char_count(slide);
        if content_chars > self.dense_content_chars {
            issues.push(Issue::new(Rule::TooDense, Severity::Warning, id).with("chars", content_chars));
        }

        let items = slide.body.list_items().map(|i| i.len()).unwrap_or(0);
        if items > self.dense_list_items {
            issues.push(Issue::new(Rule::ManyListItems, Severity::Warning, id).with("count", items));
        }
        if items > self.max_list_items {
            issues.push(
                Issue::new(Rule::TooManyListItems, Severity::Warning, id)
                    .with("count", items)
                    .with("max", self.max_list_items),
            );
        }

        if is_weak_title(&slide.title) {
            issues.push(
                Issue::new(Rule::WeakTitle, Severity::Warning, id).with("title", slide.title.trim()),
            );
        }

        for visual in &slide.visuals {
            if visual.alt.trim().is_empty() {
                let severity = if self.image_mode == ImageMode::Strict {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                issues.push(
                    Issue::new(Rule::VisualMissingAlt, severity, id).with("visual_id", &visual.id),
                );
            }
            if visual.confidence < self.min_visual_confidence {
                issues.push(
                    Issue::new(Rule::LowConfidenceVisual, Severity::Warning, id)
                        .with("visual_id", &visual.id)
                        .with("confidence", format!("{:.2}", visual.confidence))
                        .with("min", format!("{:.2}", self.min_visual_confidence)),
                );
            }
        }
    }

    fn check_deck(&self, slides: &[Slide], issues: &mut Vec<Issue>) {
        if slides.is_empty() {
            issues.push(Issue::new(Rule::EmptyDeck, Severity::Error, None));
            return;
        }

        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        for slide in slides {
            if !seen.insert(slide.id.as_str()) && reported.insert(slide.id.as_str()) {
                issues.push(Issue::new(
                    Rule::DuplicateSlideId,
                    Severity::Error,
                    Some(slide.id.as_str()),
                ));
            }
        }

        if self.image_mode == ImageMode::Strict {
            let eligible = slides.iter().filter(|s| !s.slide_type().is_bookend()).count();
            let coverage = image_coverage(slides);
            if eligible > 0 && coverage < MIN_IMAGE_COVERAGE {
                issues.push(
                    Issue::new(Rule::LowImageCoverage, Severity::Error, None)
                        .with("percent", (coverage * 100.0).round() as u32)
                        .with("required", (MIN_IMAGE_COVERAGE * 100.0).round() as u32),
                );
            }
        }
    }
}

/// True for empty, very short, or generic titles.
pub fn is_weak_title(title: &str) -> bool {
    let title = title.trim();
    title.chars().count() <= 3 || WEAK_TITLES.contains(&title.to_lowercase().as_str())
}

/// Characters in the slide's content field. List slides are measured by
/// item count instead.
pub fn content_char_count(slide: &Slide) -> usize {
    slide.body.content().map_or(0, |c| c.chars().count())
}

fn image_coverage(slides: &[Slide]) -> f64 {
    let eligible: Vec<&Slide> = slides.iter().filter(|s| !s.slide_type().is_bookend()).collect();
    if eligible.is_empty() {
        return 0.0;
    }
    let covered = eligible.iter().filter(|s| !s.visuals.is_empty()).count();
    round3(covered as f64 / eligible.len() as f64)
}

fn compute_metrics(slides: &[Slide]) -> QualityMetrics {
    let claim_count: usize = slides.iter().map(|s| s.claims.len()).sum();
    let supported_claims: usize = slides
        .iter()
        .flat_map(|s| s.claims.iter())
        .filter(|c| !c.evidence_refs.is_empty())
        .count();
    let confidences: Vec<f64> = slides
        .iter()
        .flat_map(|s| s.visuals.iter().map(|v| v.confidence))
        .collect();

    QualityMetrics {
        slide_count: slides.len(),
        claim_count,
        supported_claims,
        supported_claim_ratio: if claim_count == 0 {
            1.0
        } else {
            round3(supported_claims as f64 / claim_count as f64)
        },
        image_coverage: image_coverage(slides),
        slides_without_visual: slides
            .iter()
            .filter(|s| !s.slide_type().is_bookend() && s.visuals.is_empty())
            .map(|s| s.id.clone())
            .collect(),
        visual_count: confidences.len(),
        visual_confidence_mean: if confidences.is_empty() {
            0.0
        } else {
            round3(confidences.iter().sum::<f64>() / confidences.len() as f64)
        },
    }
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
