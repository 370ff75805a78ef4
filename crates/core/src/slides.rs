//! Slide construction and reference-safe deck mutations.
//!
//! Every mutation on [`Deck`] either succeeds completely or leaves the deck
//! untouched; evidence ids are checked against the current index first.

use crate::config::MAX_VISUALS_PER_SLIDE;
use crate::error::{Error, Result};
use crate::evidence::EvidenceIndex;
use crate::facts::{DocFacts, GitFacts, ProjectFacts};
use crate::normalize::truncate_with_ellipsis;
use crate::types::{dedup_refs, Claim, FieldUpdates, Slide, SlideType, SourceKind, Visual};

/// Maximum presenter-notes length accepted from edits.
pub const MAX_NOTES_CHARS: usize = 800;

/// Maximum evidence ids copied onto a visual.
pub const MAX_VISUAL_REFS: usize = 3;

/// Resolve which slide types to build.
///
/// Requested names are filtered to known types and emitted in canonical
/// order. `delta` needs git context. When `max_slides` cuts the set, the
/// highest-priority types survive.
pub fn resolve_slide_types(
    requested: Option<&[String]>,
    max_slides: Option<usize>,
    has_git_context: bool,
) -> Vec<SlideType> {
    let wanted: Vec<SlideType> = match requested {
        Some(names) if names.iter().any(|n| !n.trim().is_empty()) => {
            names.iter().filter_map(|n| SlideType::parse(n)).collect()
        }
        _ => SlideType::ALL.to_vec(),
    };

    let mut selected: Vec<SlideType> = SlideType::ALL
        .iter()
        .copied()
        .filter(|t| wanted.contains(t))
        .filter(|t| has_git_context || *t != SlideType::Delta)
        .collect();

    if let Some(max) = max_slides.filter(|&m| m > 0 && m < selected.len()) {
        let keep: Vec<SlideType> = SlideType::PRIORITY
            .iter()
            .copied()
            .filter(|t| selected.contains(t))
            .take(max)
            .collect();
        selected.retain(|t| keep.contains(t));
    }

    selected
}

/// An ordered slide sequence with reference-checked mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deck {
    slides: Vec<Slide>,
}

impl Deck {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn into_slides(self) -> Vec<Slide> {
        self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, slide_id: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == slide_id)
    }

    pub fn position(&self, slide_id: &str) -> Option<usize> {
        self.slides.iter().position(|s| s.id == slide_id)
    }

    /// Slide ids in deck order.
    pub fn order(&self) -> Vec<String> {
        self.slides.iter().map(|s| s.id.clone()).collect()
    }

    fn require(&self, slide_id: &str) -> Result<usize> {
        self.position(slide_id)
            .ok_or_else(|| Error::UnknownSlide(slide_id.to_string()))
    }

    /// Fail on the first evidence id anywhere in the deck that does not resolve.
    pub fn check_references(&self, index: &EvidenceIndex) -> Result<()> {
        for slide in &self.slides {
            check_slide_references(slide, index)?;
        }
        Ok(())
    }

    /// Apply a partial field update to one slide.
    ///
    /// Claims without refs inherit the slide-level refs. Empty claims and
    /// list items are dropped and notes are capped at [`MAX_NOTES_CHARS`].
    /// Visual refs no longer cited by the slide are pruned.
    pub fn replace_fields(
        &mut self,
        slide_id: &str,
        updates: &FieldUpdates,
        index: &EvidenceIndex,
    ) -> Result<()> {
        let pos = self.require(slide_id)?;
        let mut slide = self.slides[pos].clone();

        if let Some(title) = &updates.title {
            slide.title = title.trim().to_string();
        }
        if let Some(subtitle) = &updates.subtitle {
            let slot = slide
                .body
                .subtitle_mut()
                .ok_or_else(|| invalid_field(slide_id, "subtitle"))?;
            *slot = subtitle.trim().to_string();
        }
        if let Some(content) = &updates.content {
            let slot = slide
                .body
                .content_mut()
                .ok_or_else(|| invalid_field(slide_id, "content"))?;
            *slot = content.trim().to_string();
        }
        if let Some(items) = &updates.list_items {
            let slot = slide
                .body
                .list_items_mut()
                .ok_or_else(|| invalid_field(slide_id, "list_items"))?;
            *slot = items
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect();
        }
        if let Some(notes) = &updates.notes {
            slide.notes = notes.trim().chars().take(MAX_NOTES_CHARS).collect();
        }
        if let Some(refs) = &updates.evidence_refs {
            slide.evidence_refs = dedup_refs(refs.iter().map(String::as_str));
        }
        if let Some(claims) = &updates.claims {
            slide.claims = sanitize_claims(claims, &slide.evidence_refs);
        }

        check_slide_references(&slide, index)?;
        prune_visual_refs(&mut slide, index);

        log::debug!("Updated fields of slide '{}'", slide_id);
        self.slides[pos] = slide;
        Ok(())
    }

    /// Move a slide to `new_index` (remove, then insert).
    pub fn reorder(&mut self, slide_id: &str, new_index: usize) -> Result<()> {
        let pos = self.require(slide_id)?;
        if new_index >= self.slides.len() {
            return Err(Error::SlideIndexOutOfRange {
                slide_id: slide_id.to_string(),
                index: new_index,
                len: self.slides.len(),
            });
        }
        let slide = self.slides.remove(pos);
        self.slides.insert(new_index, slide);
        Ok(())
    }

    /// Reorder to match `ids`; unknown ids are ignored and slides missing
    /// from `ids` keep their relative order at the end.
    pub fn apply_order(&mut self, ids: &[String]) {
        let mut remaining = std::mem::take(&mut self.slides);
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            if let Some(pos) = remaining.iter().position(|s| &s.id == id) {
                ordered.push(remaining.remove(pos));
            }
        }
        ordered.extend(remaining);
        self.slides = ordered;
    }

    /// Attach a visual to a slide.
    ///
    /// With `replace`, the slide's visuals become exactly `[visual]`.
    /// Otherwise a visual with the same id is replaced in place, or the
    /// visual is appended if the slide holds fewer than `max`. Claims are
    /// never touched.
    pub fn attach_visual(
        &mut self,
        slide_id: &str,
        mut visual: Visual,
        replace: bool,
        max: usize,
        index: &EvidenceIndex,
    ) -> Result<()> {
        let pos = self.require(slide_id)?;
        let slide = &self.slides[pos];

        visual.evidence_refs = dedup_refs(visual.evidence_refs.iter().map(String::as_str));
        visual.evidence_refs.truncate(MAX_VISUAL_REFS);
        let cited = slide.cited_evidence();
        for r in &visual.evidence_refs {
            let allowed = match index.get(r) {
                Some(e) => cited.contains(r) || e.source_kind == SourceKind::Image,
                None => false,
            };
            if !allowed {
                return Err(Error::DanglingReference {
                    slide_id: slide_id.to_string(),
                    evidence_id: r.clone(),
                });
            }
        }

        let max = max.min(MAX_VISUALS_PER_SLIDE);
        let slide = &mut self.slides[pos];
        if replace {
            slide.visuals = vec![visual];
        } else if let Some(existing) = slide.visuals.iter_mut().find(|v| v.id == visual.id) {
            *existing = visual;
        } else if slide.visuals.len() >= max {
            return Err(Error::VisualLimit {
                slide_id: slide_id.to_string(),
                max,
            });
        } else {
            slide.visuals.push(visual);
        }
        Ok(())
    }

    /// Remove every visual from a slide.
    pub fn clear_visuals(&mut self, slide_id: &str) -> Result<()> {
        let pos = self.require(slide_id)?;
        self.slides[pos].visuals.clear();
        Ok(())
    }

    /// Slides for in-crate passes that cannot change evidence refs.
    pub(crate) fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    /// Remove a visual by id. Returns whether one was removed.
    pub fn detach_visual(&mut self, slide_id: &str, visual_id: &str) -> Result<bool> {
        let pos = self.require(slide_id)?;
        let visuals = &mut self.slides[pos].visuals;
        let before = visuals.len();
        visuals.retain(|v| v.id != visual_id);
        Ok(visuals.len() != before)
    }
}

fn invalid_field(slide_id: &str, field: &str) -> Error {
    Error::InvalidField {
        slide_id: slide_id.to_string(),
        field: field.to_string(),
    }
}

fn check_slide_references(slide: &Slide, index: &EvidenceIndex) -> Result<()> {
    let refs = slide
        .evidence_refs
        .iter()
        .chain(slide.claims.iter().flat_map(|c| c.evidence_refs.iter()));
    if let Some(missing) = index.first_missing(refs) {
        return Err(Error::DanglingReference {
            slide_id: slide.id.clone(),
            evidence_id: missing.clone(),
        });
    }
    Ok(())
}

fn prune_visual_refs(slide: &mut Slide, index: &EvidenceIndex) {
    let cited = slide.cited_evidence();
    for visual in &mut slide.visuals {
        visual.evidence_refs.retain(|r| {
            cited.contains(r)
                || index
                    .get(r)
                    .is_some_and(|e| e.source_kind == SourceKind::Image)
        });
    }
}

fn sanitize_claims(claims: &[Claim], fallback_refs: &[String]) -> Vec<Claim> {
    claims
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| {
            let refs = if c.evidence_refs.is_empty() {
                fallback_refs
            } else {
                &c.evidence_refs
            };
            Claim::new(c.text.as_str(), refs, c.confidence)
        })
        .collect()
}

/// Build the initial deck from gathered facts.
///
/// Claim and slide refs are limited to ids present in `index`.
pub fn build_deck(
    project: &ProjectFacts,
    docs: &DocFacts,
    git: &GitFacts,
    index: &EvidenceIndex,
    types: &[SlideType],
) -> Deck {
    let builder = SlideBuilder {
        project,
        docs,
        git,
        index,
    };
    Deck::new(types.iter().map(|t| builder.build(*t)).collect())
}

struct SlideBuilder<'a> {
    project: &'a ProjectFacts,
    docs: &'a DocFacts,
    git: &'a GitFacts,
    index: &'a EvidenceIndex,
}

impl SlideBuilder<'_> {
    fn build(&self, slide_type: SlideType) -> Slide {
        match slide_type {
            SlideType::Title => self.title(),
            SlideType::Problem => self.problem(),
            SlideType::Solution => self.solution(),
            SlideType::Demo => self.demo(),
            SlideType::Impact => self.impact(),
            SlideType::Tech => self.tech(),
            SlideType::Future => self.future(),
            SlideType::Delta => self.delta(),
            SlideType::Closing => self.closing(),
        }
    }

    fn refs(&self, candidates: &[&str]) -> Vec<String> {
        self.index.filter_present(candidates)
    }

    fn project_title(&self) -> String {
        [self.docs.title.trim(), self.project.project_name.trim()]
            .into_iter()
            .find(|t| !t.is_empty())
            .unwrap_or("Project")
            .to_string()
    }

    fn primary_language(&self) -> Option<&str> {
        self.project
            .primary_language
            .as_deref()
            .filter(|l| !l.is_empty() && *l != "Unknown")
    }

    fn text_slide(
        &self,
        slide_type: SlideType,
        title: &str,
        text: String,
        refs: Vec<String>,
        confidence: f64,
    ) -> Slide {
        let mut slide = Slide::new(slide_type.as_str(), slide_type, title);
        if let Some(slot) = slide.body.subtitle_mut() {
            *slot = text.clone();
        } else if let Some(slot) = slide.body.content_mut() {
            *slot = text.clone();
        }
        if !text.trim().is_empty() {
            slide.claims.push(Claim::new(text, &refs, confidence));
        }
        slide.evidence_refs = refs;
        slide
    }

    fn list_slide(
        &self,
        slide_type: SlideType,
        title: &str,
        items: Vec<String>,
        refs: Vec<String>,
        confidence: f64,
    ) -> Slide {
        let mut slide = Slide::new(slide_type.as_str(), slide_type, title);
        slide.claims = items
            .iter()
            .map(|item| Claim::new(item.as_str(), &refs, confidence))
            .collect();
        if let Some(slot) = slide.body.list_items_mut() {
            *slot = items;
        }
        slide.evidence_refs = refs;
        slide
    }

    fn title(&self) -> Slide {
        let description = self.docs.description.trim();
        let mut subtitle = if description.is_empty() {
            "Presentation generated from local project evidence.".to_string()
        } else {
            truncate_with_ellipsis(description, 220)
        };
        if self.git.has_context() {
            if let Some(branch) = &self.git.branch {
                subtitle = format!("{} Current branch: {}.", subtitle, branch);
            }
        }
        let refs = self.refs(&["doc.title", "doc.description", "git.branch"]);
        self.text_slide(SlideType::Title, &self.project_title(), subtitle, refs, 0.93)
    }

    fn problem(&self) -> Slide {
        let content = non_empty_or(
            &self.docs.problem,
            "Teams lose demo time because project context is scattered across code, docs, and commits. \
             The goal is to turn repository evidence into a concise story quickly.",
        );
        let refs = self.refs(&["doc.problem", "doc.description", "repo.project"]);
        self.text_slide(SlideType::Problem, "The Problem", content, refs, 0.9)
    }

    fn solution(&self) -> Slide {
        let language = self.primary_language().unwrap_or("modern tooling");
        let fallback = format!(
            "This workflow produces deterministic slides from repository facts, \
             keeping outputs reproducible and traceable for {} projects.",
            language
        );
        let content = non_empty_or(&self.docs.solution, &fallback);
        let refs = self.refs(&["doc.solution", "repo.languages", "repo.frameworks", "repo.project"]);
        self.text_slide(SlideType::Solution, "Our Solution", content, refs, 0.9)
    }

    fn demo(&self) -> Slide {
        let mut features = clean_items(&self.docs.features);
        for detected in &self.project.features {
            if !features.contains(detected) {
                features.push(detected.clone());
            }
        }
        if features.is_empty() {
            features = to_strings(&[
                "Deterministic parsing of project source and documentation",
                "Branch-aware context from local git history",
                "Offline rendering with no runtime network dependencies",
                "JSON output suitable for automation",
            ]);
        }
        features.truncate(7);
        let refs = self.refs(&["doc.features", "repo.features", "repo.dependencies", "repo.project"]);
        self.list_slide(SlideType::Demo, "Key Features", features, refs, 0.88)
    }

    fn impact(&self) -> Slide {
        let mut points = clean_items(&self.docs.impact_points);
        if points.is_empty() {
            points = to_strings(&[
                "Cuts presentation prep time from hours to minutes",
                "Improves narrative consistency across team members",
                "Keeps technical claims traceable to repository evidence",
                "Works reliably in low-connectivity environments",
            ]);
        }
        points.truncate(6);
        let refs = self.refs(&["doc.description", "repo.files", "repo.lines"]);
        self.list_slide(SlideType::Impact, "Impact & Benefits", points, refs, 0.86)
    }

    fn tech(&self) -> Slide {
        let mut items = Vec::new();
        if let Some(primary) = self.primary_language() {
            items.push(format!("Primary language: {}", primary));
        }
        let langs = self.project.languages_by_count();
        if !langs.is_empty() {
            let summary = langs
                .iter()
                .take(5)
                .map(|(name, count)| format!("{} ({})", name, count))
                .collect::<Vec<_>>()
                .join(", ");
            items.push(format!("Language distribution: {}", summary));
        }
        if !self.project.frameworks.is_empty() {
            items.push(format!("Frameworks: {}", first_n(&self.project.frameworks, 6)));
        }
        if !self.project.dependencies.is_empty() {
            items.push(format!("Dependencies: {}", first_n(&self.project.dependencies, 8)));
        }
        items.push(format!(
            "Scale: {} source files, {} lines",
            self.project.file_count,
            group_thousands(self.project.total_lines)
        ));
        let refs = self.refs(&[
            "repo.languages",
            "repo.frameworks",
            "repo.dependencies",
            "repo.files",
            "repo.lines",
        ]);
        self.list_slide(SlideType::Tech, "Technology Stack", items, refs, 0.92)
    }

    fn future(&self) -> Slide {
        let mut items = clean_items(&self.docs.future_items);
        if items.is_empty() {
            items = to_strings(&[
                "Add richer repository analysis for architecture-level insights",
                "Improve quality gates with domain-specific heuristics",
                "Ship stronger templates for common judging tracks",
            ]);
        }
        if !self.project.frameworks.is_empty() {
            items.push("Harden framework-specific storytelling templates".to_string());
        }
        items.truncate(6);
        let refs = self.refs(&["repo.frameworks", "repo.features", "doc.solution", "repo.files"]);
        self.list_slide(SlideType::Future, "Future Plans", items, refs, 0.8)
    }

    fn delta(&self) -> Slide {
        let git = self.git;
        let summary = non_empty_or(&git.change_summary, "No change summary available.");
        let mut items = vec![
            format!("Branch: {}", git.branch.as_deref().unwrap_or("unknown")),
            format!("Base branch: {}", git.base_branch.as_deref().unwrap_or("unknown")),
            summary,
        ];
        if !git.top_changed_paths.is_empty() {
            items.push(format!("Top changed paths: {}", first_n(&git.top_changed_paths, 5)));
        } else if git.changed_files_count == 0 {
            items.push("No changed files detected relative to base branch.".to_string());
        }
        let refs = self.refs(&[
            "git.branch",
            "git.base_branch",
            "git.changed_files",
            "git.change_summary",
        ]);
        self.list_slide(SlideType::Delta, "Branch Delta", items, refs, 0.95)
    }

    fn closing(&self) -> Slide {
        let language = self.primary_language().unwrap_or("software");
        let mut subtitle = format!("{} · Built with {}", self.project_title(), language);
        if let Some(branch) = self.git.branch.as_deref().filter(|_| self.git.available) {
            subtitle.push_str(&format!(" · Branch {}", branch));
        }
        let refs = self.refs(&["repo.languages", "git.branch", "doc.title"]);
        self.text_slide(SlideType::Closing, "Thank You", subtitle, refs, 0.85)
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn clean_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn first_n(items: &[String], n: usize) -> String {
    items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}

/// Format a count with comma thousands separators.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{snippet_hash, EvidenceBuilder};
    use crate::types::{Evidence, VisualKind};

    fn sample() -> (ProjectFacts, DocFacts, GitFacts) {
        let mut project = ProjectFacts {
            project_name: "deckgen".into(),
            primary_language: Some("Rust".into()),
            file_count: 42,
            total_lines: 12345,
            dependencies: vec!["serde".into()],
            features: vec!["Command-line interface".into()],
            ..Default::default()
        };
        project.languages.insert("Rust".into(), 40);
        project.languages.insert("Shell".into(), 2);
        let docs = DocFacts {
            title: "Deckgen".into(),
            description: "Evidence-grounded slide decks.".into(),
            problem: "Demo prep is slow.".into(),
            features: vec!["Validated claims".into()],
            ..Default::default()
        };
        let git = GitFacts {
            available: true,
            branch: Some("feature/x".into()),
            base_branch: Some("main".into()),
            changed_files_count: 2,
            top_changed_paths: vec!["src/lib.rs".into()],
            change_summary: "Updated 2 files".into(),
            ..Default::default()
        };
        (project, docs, git)
    }

    fn sample_deck() -> (Deck, EvidenceIndex) {
        let (project, docs, git) = sample();
        let index = EvidenceBuilder::new()
            .build(&project, &docs, &git, &[])
            .unwrap()
            .index;
        let types = resolve_slide_types(None, None, git.has_context());
        (build_deck(&project, &docs, &git, &index, &types), index)
    }

    fn image_visual(id: &str, refs: &[&str]) -> Visual {
        Visual {
            id: id.into(),
            kind: VisualKind::Image,
            source_path: format!("docs/{}.png", id),
            alt: "A screenshot".into(),
            caption: "A screenshot".into(),
            evidence_refs: refs.iter().map(|r| r.to_string()).collect(),
            confidence: 0.9,
            width: None,
            height: None,
            sha256: String::new(),
        }
    }

    #[test]
    fn test_resolve_slide_types() {
        let all = resolve_slide_types(None, None, false);
        assert!(!all.contains(&SlideType::Delta));
        assert_eq!(all.len(), 8);

        let requested: Vec<String> = vec!["closing".into(), "Tech".into(), "bogus".into(), "delta".into()];
        assert_eq!(
            resolve_slide_types(Some(&requested), None, true),
            vec![SlideType::Tech, SlideType::Delta, SlideType::Closing]
        );

        assert_eq!(
            resolve_slide_types(None, Some(5), true),
            vec![
                SlideType::Title,
                SlideType::Problem,
                SlideType::Solution,
                SlideType::Demo,
                SlideType::Tech,
            ]
        );
    }

    #[test]
    fn test_build_deck_refs_resolve() {
        let (deck, index) = sample_deck();
        assert_eq!(deck.len(), 9);
        deck.check_references(&index).unwrap();
        let tech = deck.get("tech").unwrap();
        let items = tech.body.list_items().unwrap();
        assert_eq!(items[0], "Primary language: Rust");
        assert_eq!(items.last().unwrap(), "Scale: 42 source files, 12,345 lines");
        assert!(tech.evidence_refs.contains(&"repo.languages".to_string()));
        assert_eq!(tech.claims.len(), items.len());
        let title = deck.get("title").unwrap();
        assert_eq!(title.title, "Deckgen");
        assert!(title.body.subtitle().unwrap().ends_with("Current branch: feature/x."));
    }

    #[test]
    fn test_replace_fields_rejects_dangling_without_mutation() {
        let (mut deck, index) = sample_deck();
        let before = deck.clone();
        let updates = FieldUpdates {
            title: Some("A New Title".into()),
            evidence_refs: Some(vec!["doc.nope".into()]),
            ..Default::default()
        };
        let err = deck.replace_fields("problem", &updates, &index).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));
        assert_eq!(deck, before);
    }

    #[test]
    fn test_replace_fields_checks_variant() {
        let (mut deck, index) = sample_deck();
        let updates = FieldUpdates {
            list_items: Some(vec!["x".into()]),
            ..Default::default()
        };
        let err = deck.replace_fields("problem", &updates, &index).unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
        assert!(matches!(
            deck.replace_fields("nope", &FieldUpdates::default(), &index),
            Err(Error::UnknownSlide(_))
        ));
    }

    #[test]
    fn test_replace_fields_sanitizes() {
        let (mut deck, index) = sample_deck();
        let updates = FieldUpdates {
            list_items: Some(vec![" one ".into(), "".into(), "two".into()]),
            notes: Some("n".repeat(900)),
            claims: Some(vec![
                Claim::new("kept", &[], 0.7),
                Claim::new("   ", &["doc.title".into()], 0.7),
            ]),
            ..Default::default()
        };
        deck.replace_fields("demo", &updates, &index).unwrap();
        let demo = deck.get("demo").unwrap();
        assert_eq!(demo.body.list_items().unwrap(), ["one", "two"]);
        assert_eq!(demo.notes.chars().count(), MAX_NOTES_CHARS);
        assert_eq!(demo.claims.len(), 1);
        assert_eq!(demo.claims[0].evidence_refs, demo.evidence_refs);
    }

    #[test]
    fn test_reorder_roundtrip() {
        let (mut deck, _) = sample_deck();
        let original = deck.order();
        deck.reorder("tech", 1).unwrap();
        assert_eq!(deck.order()[1], "tech");
        let back = original.iter().position(|id| id == "tech").unwrap();
        deck.reorder("tech", back).unwrap();
        assert_eq!(deck.order(), original);
        assert!(matches!(
            deck.reorder("tech", 99),
            Err(Error::SlideIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_apply_order() {
        let (mut deck, _) = sample_deck();
        deck.apply_order(&["closing".into(), "ghost".into(), "title".into()]);
        let order = deck.order();
        assert_eq!(&order[..3], ["closing", "title", "problem"]);
        assert_eq!(order.len(), 9);
    }

    #[test]
    fn test_attach_visual_bounds() {
        let (mut deck, index) = sample_deck();
        let claims_before = deck.get("demo").unwrap().claims.clone();

        deck.attach_visual("demo", image_visual("media.a", &["doc.features"]), false, 1, &index)
            .unwrap();
        let err = deck
            .attach_visual("demo", image_visual("media.b", &[]), false, 1, &index)
            .unwrap_err();
        assert!(matches!(err, Error::VisualLimit { max: 1, .. }));

        deck.attach_visual("demo", image_visual("media.b", &[]), true, 1, &index)
            .unwrap();
        deck.attach_visual("demo", image_visual("media.c", &[]), false, 5, &index)
            .unwrap();
        let err = deck
            .attach_visual("demo", image_visual("media.d", &[]), false, 5, &index)
            .unwrap_err();
        assert!(matches!(err, Error::VisualLimit { max: 2, .. }));

        let demo = deck.get("demo").unwrap();
        assert_eq!(demo.visuals.len(), 2);
        assert_eq!(demo.claims, claims_before);
    }

    #[test]
    fn test_attach_visual_rejects_uncited_refs() {
        let (mut deck, mut index) = sample_deck();
        let err = deck
            .attach_visual("demo", image_visual("media.a", &["git.branch"]), false, 1, &index)
            .unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));

        index
            .insert(Evidence {
                id: "media.0123".into(),
                title: "Image Asset: a.png".into(),
                source_kind: SourceKind::Image,
                source_path: Some("a.png".into()),
                start_line: None,
                end_line: None,
                snippet: "{}".into(),
                snippet_hash: snippet_hash("{}"),
            })
            .unwrap();
        deck.attach_visual("demo", image_visual("media.a", &["media.0123"]), false, 1, &index)
            .unwrap();
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
