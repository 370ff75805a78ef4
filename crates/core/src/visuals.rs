//! Conservative, deterministic visual selection.
//!
//! A slide gets zero visuals rather than a low-confidence guess. Scores
//! depend only on slide text, slide evidence and media metadata, and ties
//! are broken by media id then source path.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::config::{ImageMode, ImagesConfig, VisualStyle, MAX_VISUALS_PER_SLIDE};
use crate::error::Result;
use crate::evidence::EvidenceIndex;
use crate::normalize::tokenize;
use crate::quality::round3;
use crate::slides::{Deck, MAX_VISUAL_REFS};
use crate::types::{MediaAsset, MediaKind, Slide, SlideType, Visual, VisualKind};

const DEMO_MARKERS: &[&str] = &["demo", "screenshot", "screen", "ui", "interface", "app"];
const ARCHITECTURE_MARKERS: &[&str] = &["arch", "architecture", "diagram", "flow", "system", "design"];
const CHART_MARKERS: &[&str] = &["chart", "graph", "metrics", "impact", "results", "stats"];

/// Maximum caption length.
const MAX_CAPTION_CHARS: usize = 160;

/// Counts from one attachment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct VisualSummary {
    pub attached: usize,
    pub eligible_slides: usize,
}

/// Scores media against slides and attaches the best candidates.
#[derive(Debug, Clone)]
pub struct VisualSelector {
    mode: ImageMode,
    max_per_slide: usize,
    min_confidence: f64,
    style: VisualStyle,
}

impl VisualSelector {
    pub fn new(config: &ImagesConfig) -> Self {
        Self {
            mode: config.effective_mode(),
            max_per_slide: config.max_images_per_slide.min(MAX_VISUALS_PER_SLIDE),
            min_confidence: config.min_confidence,
            style: config.visual_style,
        }
    }

    /// Override the per-slide maximum, clamped to the hard ceiling.
    pub fn with_max_per_slide(mut self, max: usize) -> Self {
        self.max_per_slide = max.min(MAX_VISUALS_PER_SLIDE);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != ImageMode::Off && self.max_per_slide > 0
    }

    /// Relevance of `media` to `slide` in `[0, 1]`, rounded to 3 decimals.
    pub fn score(&self, slide: &Slide, media: &MediaAsset) -> f64 {
        let slide_tokens = slide_tokens(slide);
        let media_tokens: BTreeSet<String> = media
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut score = if slide_tokens.is_empty() || media_tokens.is_empty() {
            0.0
        } else {
            let overlap = slide_tokens.intersection(&media_tokens).count() as f64;
            let norm = ((slide_tokens.len() * media_tokens.len()) as f64).sqrt().max(1.0);
            overlap / norm
        };

        let refs = slide.cited_evidence();
        if media.evidence_refs.iter().any(|r| refs.contains(r)) {
            score += 0.45;
        }

        score += match (self.style, media.kind) {
            (VisualStyle::Evidence, MediaKind::DocImage) => 0.2,
            (VisualStyle::Screenshot, MediaKind::RepoImage) => 0.2,
            (VisualStyle::Mixed, _) => 0.08,
            _ => 0.0,
        };

        if media.kind == MediaKind::DocImage && refs.iter().any(|r| r.starts_with("doc.")) {
            score += 0.22;
        }

        let markers: &[&str] = match slide.slide_type() {
            SlideType::Demo => DEMO_MARKERS,
            SlideType::Tech => ARCHITECTURE_MARKERS,
            SlideType::Impact => CHART_MARKERS,
            _ => &[],
        };
        if media_tokens.iter().any(|t| markers.contains(&t.as_str())) {
            score += 0.2;
        }

        round3(score.clamp(0.0, 1.0))
    }

    /// Pick up to the per-slide maximum of visuals at or above the floor.
    pub fn select(&self, slide: &Slide, catalog: &[MediaAsset]) -> Vec<Visual> {
        if !self.is_enabled() || slide.slide_type().is_bookend() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &MediaAsset)> = catalog
            .iter()
            .map(|m| (self.score(slide, m), m))
            .filter(|(score, _)| *score >= self.min_confidence)
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
                .then_with(|| a.1.source_path.cmp(&b.1.source_path))
        });

        scored
            .into_iter()
            .take(self.max_per_slide)
            .map(|(score, media)| to_visual(slide, media, score))
            .collect()
    }

    /// Re-select visuals for the given slides (all slides when `None`).
    ///
    /// Bookend slides end up without visuals.
    pub fn attach_all(
        &self,
        deck: &mut Deck,
        catalog: &[MediaAsset],
        index: &EvidenceIndex,
        only: Option<&[String]>,
    ) -> Result<VisualSummary> {
        let mut summary = VisualSummary {
            attached: 0,
            eligible_slides: deck
                .slides()
                .iter()
                .filter(|s| !s.slide_type().is_bookend())
                .count(),
        };
        if !self.is_enabled() {
            return Ok(summary);
        }

        for slide_id in deck.order() {
            if only.is_some_and(|ids| !ids.contains(&slide_id)) {
                continue;
            }
            let chosen = match deck.get(&slide_id) {
                Some(slide) => self.select(slide, catalog),
                None => continue,
            };
            deck.clear_visuals(&slide_id)?;
            for visual in chosen {
                deck.attach_visual(&slide_id, visual, false, self.max_per_slide, index)?;
                summary.attached += 1;
            }
        }

        log::debug!(
            "Attached {} visual(s) across {} eligible slide(s)",
            summary.attached,
            summary.eligible_slides
        );
        Ok(summary)
    }

    /// Refresh confidences of attached visuals after slide text changed.
    ///
    /// Visuals whose media is no longer in the catalog keep their score.
    pub fn rescore(&self, slide: &mut Slide, catalog: &[MediaAsset]) {
        let scores: Vec<Option<f64>> = slide
            .visuals
            .iter()
            .map(|v| {
                catalog
                    .iter()
                    .find(|m| m.id == v.id)
                    .map(|m| self.score(slide, m))
            })
            .collect();
        for (visual, score) in slide.visuals.iter_mut().zip(scores) {
            if let Some(score) = score {
                visual.confidence = score;
            }
        }
    }

    /// [`rescore`](Self::rescore) every slide in the deck.
    pub fn rescore_deck(&self, deck: &mut Deck, catalog: &[MediaAsset]) {
        for slide in deck.slides_mut() {
            self.rescore(slide, catalog);
        }
    }
}

fn slide_tokens(slide: &Slide) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for part in slide.visible_text() {
        tokens.extend(tokenize(part, 3));
    }
    for r in &slide.evidence_refs {
        tokens.extend(tokenize(r, 3));
    }
    tokens
}

fn to_visual(slide: &Slide, media: &MediaAsset, confidence: f64) -> Visual {
    let alt = match media.alt.trim() {
        "" => {
            let title = slide.title.trim();
            format!("Visual for {}", if title.is_empty() { "slide" } else { title })
        }
        alt => alt.to_string(),
    };

    let stem = media
        .source_path
        .rsplit('/')
        .next()
        .unwrap_or("")
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or("")
        .replace(['-', '_'], " ");
    let caption = if !stem.is_empty() && stem.to_lowercase() != alt.to_lowercase() {
        format!("{} ({})", alt, stem)
    } else {
        alt.clone()
    };

    let mut refs = slide.cited_evidence();
    refs.truncate(MAX_VISUAL_REFS);

    Visual {
        id: media.id.clone(),
        kind: VisualKind::Image,
        source_path: media.source_path.clone(),
        alt,
        caption: caption.chars().take(MAX_CAPTION_CHARS).collect(),
        evidence_refs: refs,
        confidence,
        width: media.width,
        height: media.height,
        sha256: media.sha256.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeckConfig;
    use crate::evidence::snippet_hash;
    use crate::types::{Evidence, SourceKind};

    fn media(id: &str, path: &str, kind: MediaKind, tags: &[&str], refs: &[&str]) -> MediaAsset {
        MediaAsset {
            id: id.into(),
            source_path: path.into(),
            kind,
            width: Some(640),
            height: Some(480),
            sha256: format!("{}-sha", id),
            bytes: 1024,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            alt: String::new(),
            evidence_refs: refs.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn demo_slide() -> Slide {
        let mut slide = Slide::new("demo", SlideType::Demo, "Key Features");
        slide.evidence_refs = vec!["doc.features".into(), "repo.features".into()];
        if let Some(items) = slide.body.list_items_mut() {
            items.push("Live dashboard screenshot export".into());
        }
        slide
    }

    fn index() -> EvidenceIndex {
        let mut index = EvidenceIndex::new();
        for id in ["doc.features", "repo.features"] {
            index
                .insert(Evidence {
                    id: id.into(),
                    title: id.into(),
                    source_kind: SourceKind::Doc,
                    source_path: None,
                    start_line: None,
                    end_line: None,
                    snippet: id.into(),
                    snippet_hash: snippet_hash(id),
                })
                .unwrap();
        }
        index
    }

    fn selector() -> VisualSelector {
        VisualSelector::new(&DeckConfig::default().images)
    }

    #[test]
    fn test_score_formula() {
        let slide = demo_slide();
        let doc_img = media(
            "media.aaa",
            "docs/dashboard.png",
            MediaKind::DocImage,
            &["dashboard", "screenshot"],
            &["doc.features"],
        );
        // overlap 2/sqrt(|S|*2) + 0.45 link + 0.08 mixed + 0.22 doc + 0.2 demo, clamped
        assert_eq!(selector().score(&slide, &doc_img), 1.0);

        let unrelated = media("media.bbb", "x/logo.png", MediaKind::RepoImage, &["logo"], &[]);
        assert_eq!(selector().score(&slide, &unrelated), 0.08);
    }

    #[test]
    fn test_score_is_deterministic() {
        let slide = demo_slide();
        let m = media("media.a", "a/b.png", MediaKind::RepoImage, &["demo", "live"], &["repo.features"]);
        let s = selector();
        assert_eq!(s.score(&slide, &m), s.score(&slide, &m));
    }

    #[test]
    fn test_select_tie_break_and_floor() {
        let slide = demo_slide();
        let tags = &["screenshot"];
        let refs = &["repo.features"];
        let catalog = vec![
            media("media.b", "b.png", MediaKind::RepoImage, tags, refs),
            media("media.a", "z.png", MediaKind::RepoImage, tags, refs),
            media("media.c", "c.png", MediaKind::RepoImage, &["logo"], &[]),
        ];
        let chosen = selector().select(&slide, &catalog);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id, "media.a");

        let two = selector().with_max_per_slide(5).select(&slide, &catalog);
        let ids: Vec<&str> = two.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["media.a", "media.b"]);
    }

    #[test]
    fn test_higher_score_wins() {
        let slide = demo_slide();
        let catalog = vec![
            media("media.a", "a.png", MediaKind::RepoImage, &["export"], &["repo.features"]),
            media(
                "media.z",
                "docs/z.png",
                MediaKind::DocImage,
                &["screenshot", "dashboard"],
                &["doc.features"],
            ),
        ];
        assert_eq!(selector().score(&slide, &catalog[0]), 0.884);
        let chosen = selector().select(&slide, &catalog);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id, "media.z");
    }

    #[test]
    fn test_visual_fields() {
        let slide = demo_slide();
        let m = media(
            "media.a",
            "docs/live-demo_flow.png",
            MediaKind::DocImage,
            &["demo"],
            &["doc.features"],
        );
        let visual = to_visual(&slide, &m, 0.9);
        assert_eq!(visual.alt, "Visual for Key Features");
        assert_eq!(visual.caption, "Visual for Key Features (live demo flow)");
        assert_eq!(visual.evidence_refs, vec!["doc.features", "repo.features"]);
        assert_eq!(visual.width, Some(640));
    }

    #[test]
    fn test_bookends_and_off_mode_get_nothing() {
        let m = media("media.a", "a.png", MediaKind::DocImage, &["thank"], &["doc.title"]);
        let title = Slide::new("title", SlideType::Title, "Deckgen");
        assert!(selector().select(&title, &[m.clone()]).is_empty());

        let mut config = DeckConfig::default().images;
        config.mode = ImageMode::Off;
        let off = VisualSelector::new(&config);
        assert!(off.select(&demo_slide(), &[m]).is_empty());
    }

    #[test]
    fn test_attach_all_respects_bound() {
        let index = index();
        let mut deck = Deck::new(vec![
            Slide::new("title", SlideType::Title, "Deckgen"),
            demo_slide(),
        ]);
        let catalog = vec![
            media("media.a", "a.png", MediaKind::RepoImage, &["screenshot"], &["repo.features"]),
            media("media.b", "b.png", MediaKind::RepoImage, &["screenshot"], &["repo.features"]),
            media("media.c", "c.png", MediaKind::RepoImage, &["demo"], &["repo.features"]),
        ];
        let selector = selector().with_max_per_slide(2);
        let summary = selector.attach_all(&mut deck, &catalog, &index, None).unwrap();
        assert_eq!(summary, VisualSummary { attached: 2, eligible_slides: 1 });
        assert_eq!(deck.get("demo").unwrap().visuals.len(), 2);
        assert!(deck.get("title").unwrap().visuals.is_empty());

        let again = selector.attach_all(&mut deck, &catalog, &index, None).unwrap();
        assert_eq!(again.attached, 2);
        assert_eq!(deck.get("demo").unwrap().visuals.len(), 2);
    }

    #[test]
    fn test_rescore_updates_confidence() {
        let m = media("media.a", "a.png", MediaKind::RepoImage, &["screenshot"], &["repo.features"]);
        let mut slide = demo_slide();
        let s = selector();
        slide.visuals = s.select(&slide, &[m.clone()]);
        let before = slide.visuals[0].confidence;

        slide.evidence_refs = vec!["doc.features".into()];
        s.rescore(&mut slide, &[m]);
        assert!(slide.visuals[0].confidence < before);
    }
}
