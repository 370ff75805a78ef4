//! Deterministic remediation of validator issues.
//!
//! Fixes run in canonical [`Rule`] order whatever order the issues arrive
//! in, and a second pass over the same issues changes nothing. Evidence ids
//! are only ever taken from the current index.

use crate::config::DeckConfig;
use crate::evidence::EvidenceIndex;
use crate::normalize::{truncate_with_ellipsis, PhraseScrubber};
use crate::quality::{is_weak_title, Issue, QualityReport, Rule, Severity, Validator};
use crate::types::Slide;

/// Evidence ids used when a slide or claim has no support, in priority order.
pub const FALLBACK_REFS: &[&str] = &["doc.description", "repo.project", "doc.title", "repo.languages"];

/// At most this many fallback ids are attached.
const MAX_FALLBACK_REFS: usize = 2;

/// Default pass limit for [`fix_all`].
pub const DEFAULT_MAX_PASSES: usize = 4;

/// Patched slides plus whether anything changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FixOutcome {
    pub slides: Vec<Slide>,
    pub changed: bool,
}

/// Result of repeated validate-and-fix passes.
#[derive(Debug, Clone)]
pub struct FixAllOutcome {
    pub slides: Vec<Slide>,
    pub changed: bool,
    pub passes: usize,
    /// Report for the final slides.
    pub report: QualityReport,
}

/// Fallback evidence ids present in the index, capped at two.
pub fn fallback_refs(index: &EvidenceIndex) -> Vec<String> {
    let mut refs = index.filter_present(FALLBACK_REFS);
    refs.truncate(MAX_FALLBACK_REFS);
    refs
}

/// Parse display strings into issues, skipping unrecognized text.
pub fn parse_issues<S: AsRef<str>>(messages: &[S]) -> Vec<Issue> {
    messages
        .iter()
        .filter_map(|m| {
            let parsed = Issue::parse(m.as_ref(), Severity::Warning);
            if parsed.is_none() {
                log::debug!("Ignoring unrecognized issue text: {:?}", m.as_ref());
            }
            parsed
        })
        .collect()
}

/// Apply remediations for `issues` to a copy of `slides`.
pub fn apply_fixes(
    slides: &[Slide],
    index: &EvidenceIndex,
    issues: &[Issue],
    config: &DeckConfig,
) -> FixOutcome {
    let mut ordered: Vec<&Issue> = issues.iter().collect();
    ordered.sort_by_key(|i| i.rule);

    let mut fixer = Fixer {
        index,
        config,
        fallback: fallback_refs(index),
    };
    let mut patched = slides.to_vec();
    for issue in ordered {
        let Some(slide_id) = issue.slide_id.as_deref() else {
            continue;
        };
        if let Some(slide) = patched.iter_mut().find(|s| s.id == slide_id) {
            fixer.apply(slide, issue);
        }
    }

    let changed = patched.as_slice() != slides;
    FixOutcome {
        slides: patched,
        changed,
    }
}

/// Validate and fix until nothing changes or `max_passes` is reached.
pub fn fix_all(
    slides: &[Slide],
    index: &EvidenceIndex,
    validator: &Validator,
    config: &DeckConfig,
    max_passes: usize,
) -> FixAllOutcome {
    let mut current = slides.to_vec();
    let mut passes = 0;
    let mut report = validator.validate(&current, index);

    while passes < max_passes.max(1) {
        let outcome = apply_fixes(&current, index, &report.issues, config);
        passes += 1;
        if !outcome.changed {
            break;
        }
        current = outcome.slides;
        report = validator.validate(&current, index);
    }

    log::debug!(
        "Fix all finished after {} pass(es) with status {:?}",
        passes,
        report.status
    );
    let changed = current.as_slice() != slides;
    FixAllOutcome {
        slides: current,
        changed,
        passes,
        report,
    }
}

struct Fixer<'a> {
    index: &'a EvidenceIndex,
    config: &'a DeckConfig,
    fallback: Vec<String>,
}

impl Fixer<'_> {
    fn apply(&mut self, slide: &mut Slide, issue: &Issue) {
        match issue.rule {
            Rule::DanglingReference => self.drop_unknown_ref(slide, issue.get("evidence_id")),
            Rule::MissingEvidence => {
                if !slide.has_evidence() {
                    slide.evidence_refs = self.fallback.clone();
                }
            }
            Rule::UnsupportedClaim => {
                for claim in slide.claims.iter_mut().filter(|c| c.evidence_refs.is_empty()) {
                    claim.evidence_refs = self.fallback.clone();
                }
            }
            Rule::BannedPhrase => self.scrub_phrases(slide, issue.get("phrase")),
            Rule::TooDense => {
                let max_chars = self.config.quality.fix_content_chars;
                if let Some(content) = slide.body.content_mut() {
                    if content.chars().count() > max_chars {
                        *content = truncate_with_ellipsis(content, max_chars);
                    }
                }
                if let Some(items) = slide.body.list_items_mut() {
                    items.truncate(self.config.quality.fix_dense_list_items);
                }
            }
            Rule::ManyListItems | Rule::TooManyListItems => {
                if let Some(items) = slide.body.list_items_mut() {
                    items.truncate(self.config.quality.max_list_items);
                }
            }
            Rule::WeakTitle => {
                if is_weak_title(&slide.title) {
                    slide.title = format!("{} Snapshot", slide.slide_type().label());
                }
            }
            Rule::VisualMissingAlt => {
                let alt = format!("Visual for {}", slide.title.trim());
                let visual_id = issue.get("visual_id");
                for visual in slide.visuals.iter_mut().filter(|v| v.id == visual_id) {
                    if visual.alt.trim().is_empty() {
                        visual.alt = alt.clone();
                        if visual.caption.trim().is_empty() {
                            visual.caption = alt.clone();
                        }
                    }
                }
            }
            Rule::LowConfidenceVisual => {
                let visual_id = issue.get("visual_id");
                let floor = self.config.images.min_confidence;
                slide
                    .visuals
                    .retain(|v| !(v.id == visual_id && v.confidence < floor));
            }
            Rule::EmptyDeck | Rule::DuplicateSlideId | Rule::LowImageCoverage => {}
        }
    }

    fn drop_unknown_ref(&self, slide: &mut Slide, evidence_id: &str) {
        if evidence_id.is_empty() || self.index.contains(evidence_id) {
            return;
        }
        slide.evidence_refs.retain(|r| r != evidence_id);
        for claim in &mut slide.claims {
            claim.evidence_refs.retain(|r| r != evidence_id);
        }
        for visual in &mut slide.visuals {
            visual.evidence_refs.retain(|r| r != evidence_id);
        }
    }

    fn scrub_phrases(&self, slide: &mut Slide, reported: &str) {
        let mut phrases = self.config.quality.banned_phrases.clone();
        if !reported.is_empty() {
            phrases.push(reported.to_string());
        }
        let scrubber = PhraseScrubber::new(&phrases);

        slide.title = scrubber.scrub(&slide.title);
        if let Some(subtitle) = slide.body.subtitle_mut() {
            *subtitle = scrubber.scrub(subtitle);
        }
        if let Some(content) = slide.body.content_mut() {
            *content = scrubber.scrub(content);
        }
        if let Some(items) = slide.body.list_items_mut() {
            *items = items
                .iter()
                .map(|i| scrubber.scrub(i))
                .filter(|i| !i.trim().is_empty())
                .collect();
        }
        for claim in &mut slide.claims {
            claim.text = scrubber.scrub(&claim.text);
        }
        slide.claims.retain(|c| !c.text.trim().is_empty());
        slide.notes = scrubber.scrub(&slide.notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::snippet_hash;
    use crate::types::{Claim, Evidence, SlideType, SourceKind, Visual, VisualKind};

    fn index_with(ids: &[&str]) -> EvidenceIndex {
        let mut index = EvidenceIndex::new();
        for id in ids {
            index
                .insert(Evidence {
                    id: id.to_string(),
                    title: id.to_string(),
                    source_kind: SourceKind::Repo,
                    source_path: None,
                    start_line: None,
                    end_line: None,
                    snippet: id.to_string(),
                    snippet_hash: snippet_hash(id),
                })
                .unwrap();
        }
        index
    }

    fn overview_slide() -> Slide {
        let mut slide = Slide::new("problem", SlideType::Problem, "Overview");
        if let Some(c) = slide.body.content_mut() {
            *c = "This is a cutting-edge revolutionary tool.".into();
        }
        slide
    }

    #[test]
    fn test_overview_scenario_fix() {
        let index = index_with(&["doc.description", "repo.project", "doc.title"]);
        let config = DeckConfig::default();
        let validator = Validator::new(&config);
        let slides = vec![overview_slide()];
        let report = validator.validate(&slides, &index);

        let outcome = apply_fixes(&slides, &index, &report.issues, &config);
        assert!(outcome.changed);
        let fixed = &outcome.slides[0];
        assert_eq!(fixed.title, "Problem Snapshot");
        assert_eq!(fixed.evidence_refs, vec!["doc.description", "repo.project"]);
        assert_eq!(fixed.body.content(), Some("This is a tool."));

        let again = validator.validate(&outcome.slides, &index);
        assert!(again.errors.is_empty());
        assert!(again.warnings.is_empty());
    }

    #[test]
    fn test_fixes_are_idempotent() {
        let index = index_with(&["doc.description"]);
        let config = DeckConfig::default();
        let slides = vec![overview_slide()];
        let issues = Validator::new(&config).validate(&slides, &index).issues;

        let first = apply_fixes(&slides, &index, &issues, &config);
        let second = apply_fixes(&first.slides, &index, &issues, &config);
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.slides, second.slides);
    }

    #[test]
    fn test_fix_order_independence() {
        let index = index_with(&["doc.description", "repo.features"]);
        let config = DeckConfig::default();
        let mut slide = Slide::new("demo", SlideType::Demo, "Misc");
        if let Some(items) = slide.body.list_items_mut() {
            *items = (1..=10)
                .map(|i| {
                    if i == 2 {
                        "cutting-edge".to_string()
                    } else {
                        format!("Item {} is useful", i)
                    }
                })
                .collect();
        }
        slide.claims.push(Claim::new("A game-changing claim", &[], 0.8));
        let slides = vec![slide];
        let issues = Validator::new(&config).validate(&slides, &index).issues;
        assert!(issues.len() >= 5);

        let forward = apply_fixes(&slides, &index, &issues, &config);
        let mut reversed = issues.clone();
        reversed.reverse();
        let backward = apply_fixes(&slides, &index, &reversed, &config);
        assert_eq!(forward, backward);

        let items = forward.slides[0].body.list_items().unwrap();
        assert_eq!(items.len(), 7);
        assert_eq!(items[1], "Item 3 is useful");
        assert_eq!(forward.slides[0].claims[0].text, "A claim");
        assert_eq!(forward.slides[0].claims[0].evidence_refs, vec!["doc.description"]);
        assert_eq!(forward.slides[0].title, "Demo Snapshot");
    }

    #[test]
    fn test_fix_from_display_strings() {
        let index = index_with(&["doc.description"]);
        let config = DeckConfig::default();
        let slides = vec![overview_slide()];
        let issues = parse_issues(&[
            "Slide 'problem' has a weak title 'Overview'",
            "not an issue at all",
        ]);
        assert_eq!(issues.len(), 1);
        let outcome = apply_fixes(&slides, &index, &issues, &config);
        assert_eq!(outcome.slides[0].title, "Problem Snapshot");
        assert!(outcome.slides[0].evidence_refs.is_empty());
    }

    #[test]
    fn test_dense_content_fix() {
        let index = index_with(&["doc.description"]);
        let config = DeckConfig::default();
        let mut slide = Slide::new("solution", SlideType::Solution, "Our Solution");
        slide.evidence_refs = vec!["doc.description".into()];
        if let Some(c) = slide.body.content_mut() {
            *c = "word ".repeat(300);
        }
        let slides = vec![slide];
        let issues = Validator::new(&config).validate(&slides, &index).issues;
        let outcome = apply_fixes(&slides, &index, &issues, &config);
        let content = outcome.slides[0].body.content().unwrap();
        assert!(content.chars().count() <= 700);
        assert!(content.ends_with('…'));
    }

    #[test]
    fn test_fix_all_clears_long_list_slide() {
        let index = index_with(&["doc.description"]);
        let config = DeckConfig::default();
        let validator = Validator::new(&config);
        let mut slide = Slide::new("demo", SlideType::Demo, "Key Features");
        slide.evidence_refs = vec!["doc.description".into()];
        if let Some(items) = slide.body.list_items_mut() {
            *items = (1..=9).map(|i| format!("{} {}", i, "detail ".repeat(60))).collect();
        }

        let outcome = fix_all(&[slide], &index, &validator, &config, DEFAULT_MAX_PASSES);
        assert!(outcome.changed);
        assert_eq!(outcome.slides[0].body.list_items().map(<[String]>::len), Some(7));
        assert!(outcome.report.warnings.is_empty(), "{:?}", outcome.report.warnings);
    }

    #[test]
    fn test_dangling_and_visual_fixes() {
        let index = index_with(&["doc.description"]);
        let config = DeckConfig::default();
        let mut slide = Slide::new("demo", SlideType::Demo, "Key Features");
        slide.evidence_refs = vec!["doc.description".into(), "doc.gone".into()];
        for (id, alt, confidence) in [("media.a", "", 0.9), ("media.b", "b", 0.3)] {
            slide.visuals.push(Visual {
                id: id.into(),
                kind: VisualKind::Image,
                source_path: format!("{}.png", id),
                alt: alt.into(),
                caption: String::new(),
                evidence_refs: vec!["doc.description".into()],
                confidence,
                width: None,
                height: None,
                sha256: String::new(),
            });
        }
        let slides = vec![slide];
        let issues = Validator::new(&config).validate(&slides, &index).issues;
        let outcome = apply_fixes(&slides, &index, &issues, &config);
        let fixed = &outcome.slides[0];
        assert_eq!(fixed.evidence_refs, vec!["doc.description"]);
        assert_eq!(fixed.visuals.len(), 1);
        assert_eq!(fixed.visuals[0].alt, "Visual for Key Features");
    }

    #[test]
    fn test_fix_all_converges() {
        let index = index_with(&["doc.description"]);
        let config = DeckConfig::default();
        let validator = Validator::new(&config);
        let slides = vec![overview_slide()];
        let outcome = fix_all(&slides, &index, &validator, &config, DEFAULT_MAX_PASSES);
        assert!(outcome.changed);
        assert!(outcome.passes >= 2);
        assert!(outcome.report.errors.is_empty());

        let rerun = fix_all(&outcome.slides, &index, &validator, &config, DEFAULT_MAX_PASSES);
        assert!(!rerun.changed);
        assert_eq!(rerun.passes, 1);
    }
}
